//! Capabilities the core consumes from the vSphere connection layer
//!
//! The core never talks to vCenter itself. Each configured tenant supplies a
//! [`VmLocator`] that finds VMs and fetches their properties, and a
//! [`TagLookup`] that walks inventory ancestors and lists attached tags.
//! Connection pooling, authentication and retries belong to the
//! implementations.
//!
//! Locators signal "no such VM" with [`CpiError::VmNotFound`] (see
//! [`CpiError::is_not_found`]); any other error aborts the search.

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

use crate::error::CpiResult;
#[cfg(doc)]
use crate::error::CpiError;
use crate::types::{Ancestor, LocatedVm, Tag, VmProperties, VmRef};

/// Finds VMs within one tenant, across all of its datacenters
#[async_trait]
pub trait VmLocator: Send + Sync {
    /// First VM whose inventory name or guest DNS name matches `name`
    async fn find_by_name(&self, name: &str) -> CpiResult<LocatedVm>;

    /// First VM reporting `ip` on any guest interface
    async fn find_by_ip(&self, ip: &str) -> CpiResult<LocatedVm>;

    /// VM whose BIOS UUID equals `uuid`
    async fn find_by_uuid(&self, uuid: &str) -> CpiResult<LocatedVm>;

    /// Guest network report, hardware summary and extra-config of a VM
    async fn vm_properties(&self, vm: &VmRef) -> CpiResult<VmProperties>;
}

/// Inventory ancestry and tagging within one tenant
#[async_trait]
pub trait TagLookup: Send + Sync {
    /// Ancestors of the host running `vm`, starting with the host itself and
    /// proceeding upward (compute resource, datacenter, folders).
    async fn host_ancestors(&self, vm: &VmRef) -> CpiResult<Vec<Ancestor>>;

    /// Tags attached to an inventory object, with their category names
    async fn attached_tags(&self, object: &Ancestor) -> CpiResult<Vec<Tag>>;
}

/// A configured vCenter together with its capabilities
#[derive(Clone)]
pub struct Tenant {
    pub name: String,
    pub locator: Arc<dyn VmLocator>,
    pub tags: Arc<dyn TagLookup>,
}

impl Tenant {
    pub fn new(
        name: impl Into<String>,
        locator: Arc<dyn VmLocator>,
        tags: Arc<dyn TagLookup>,
    ) -> Self {
        Self {
            name: name.into(),
            locator,
            tags,
        }
    }
}

impl fmt::Debug for Tenant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tenant").field("name", &self.name).finish()
    }
}
