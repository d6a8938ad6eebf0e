//! Node identity, address and topology resolution for the vSphere cloud
//! provider.
//!
//! [`NodeRegistry`] maps orchestrator nodes onto vSphere VMs across any
//! number of vCenters, publishes their node addresses and resolves their
//! zone and region from vSphere tags. The vCenter connection itself is
//! injected through the [`VmLocator`] and [`TagLookup`] traits.

pub mod address_selector;
pub mod config;
pub mod discovery;
pub mod error;
pub mod inventory;
pub mod locator;
pub mod network_plan;
pub mod node_registry;
pub mod observability;
pub mod types;
pub mod uuid_codec;
pub mod zone;

pub use config::{CpiConfig, CpiConfigBuilder, IpFamily};
pub use error::{CpiError, CpiResult};
pub use locator::{TagLookup, Tenant, VmLocator};
pub use node_registry::NodeRegistry;
pub use types::{AddressKind, NodeAddress, NodeInfo, SearchBy, Zone};
