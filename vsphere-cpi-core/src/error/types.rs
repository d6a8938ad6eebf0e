//! Core error types for the vSphere cloud provider
//!
//! This module contains the main CpiError enum with all error variants
//! and the associated Result type aliases.

use thiserror::Error;

/// Error type for node discovery, addressing and topology operations
///
/// # Error Categories
///
/// - **Not found**: the identifier does not resolve to any VM or cached node.
///   Always distinguishable so callers can apply fallback search strategies.
/// - **Malformed input**: invalid UUIDs, empty guest hostname or network data.
/// - **Configuration mismatch**: a requested network name or tag category is
///   absent from the VM. Hard failure for that node.
/// - **Collaborator failure**: VM locator or tag lookup errors other than
///   not-found, propagated unchanged.
#[derive(Error, Debug)]
pub enum CpiError {
    // Lookup
    #[error("Resource not found: {resource}")]
    NotFound { resource: String },

    #[error("VM not found in tenant {tenant}: {identifier}")]
    VmNotFound { tenant: String, identifier: String },

    // Malformed input
    #[error("Validation error for {field}: {message}")]
    Validation { field: String, message: String },

    #[error("Guest info for VM {vm} is unavailable: {reason}")]
    GuestInfoUnavailable { vm: String, reason: String },

    // Configuration mismatch
    #[error("Configuration error in {component}: {message}")]
    ConfigurationError { component: String, message: String },

    #[error("VM {vm} is not attached to network {internal:?} or {external:?}")]
    NetworkNameMismatch {
        vm: String,
        internal: String,
        external: String,
    },

    #[error("Unable to find suitable {family} address for VM {vm}")]
    NoAddressForFamily { vm: String, family: String },

    #[error("{kind} tag category {category:?} not found in the ancestors of VM {vm}")]
    TopologyCategoryMissing {
        vm: String,
        kind: String,
        category: String,
    },

    // Collaborator failures
    #[error("{operation} failed against tenant {tenant}")]
    Collaborator {
        tenant: String,
        operation: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    // Operational
    #[error("Operation timed out: {operation} after {duration:?}")]
    Timeout {
        operation: String,
        duration: std::time::Duration,
    },

    #[error("Serialization operation '{operation}' failed")]
    Serialization {
        operation: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("IO error: {0}")]
    IoError(#[from] Box<std::io::Error>),

    #[error("Internal error: {message}")]
    Internal { message: String },
}

pub type Result<T> = std::result::Result<T, CpiError>;
pub type CpiResult<T> = std::result::Result<T, CpiError>;
