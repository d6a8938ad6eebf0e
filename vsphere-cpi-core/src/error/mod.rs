//! Error handling for the vSphere cloud provider core
//!
//! ## Error Categories
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    CPI Error Taxonomy                        │
//! ├──────────────────────────────────────────────────────────────┤
//! │  Not found        │  Malformed input    │  Config mismatch   │
//! │  • NotFound       │  • Validation       │  • NetworkName     │
//! │  • VmNotFound     │  • GuestInfo        │  • NoAddress       │
//! │                   │                     │  • TopologyCategory│
//! ├──────────────────────────────────────────────────────────────┤
//! │  Collaborator     │  Operational                             │
//! │  • Collaborator   │  • Timeout  • IO  • Serialization        │
//! │                   │  • Internal • ConfigurationError         │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Only the not-found category lets a search strategy fall through to the
//! next one; everything else aborts discovery and is surfaced unchanged.

pub mod types;
pub mod constructors;
pub mod conversions;

pub use types::{CpiError, CpiResult, Result};
