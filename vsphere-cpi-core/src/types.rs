//! Core types for node identity resolution

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Opaque handle to a virtual machine, as understood by the owning tenant's
/// locator (a managed object reference such as `vm-1042`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VmRef(pub String);

impl fmt::Display for VmRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Search strategy used to locate a VM
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchBy {
    /// VM name or guest DNS name, falling back to IP address
    Name,
    /// Platform BIOS UUID, falling back to the byte-swapped form
    Uuid,
}

impl fmt::Display for SearchBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchBy::Name => write!(f, "name"),
            SearchBy::Uuid => write!(f, "uuid"),
        }
    }
}

/// A VM as returned by a locator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatedVm {
    pub vm: VmRef,
    /// Inventory name of the VM
    pub name: String,
    pub datacenter: String,
    pub tenant: String,
    /// BIOS UUID in platform byte order
    pub uuid: String,
}

/// One guest network interface as reported by in-guest tooling
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuestNic {
    /// Name of the virtual network (port group) the NIC is attached to
    #[serde(default)]
    pub network: String,
    #[serde(default)]
    pub ip_addresses: Vec<String>,
    /// Key of the backing virtual device; negative when the NIC has no
    /// real device (virtual or pass-through interfaces inside the guest)
    #[serde(default)]
    pub device_config_id: i32,
}

impl GuestNic {
    pub fn is_virtual(&self) -> bool {
        self.device_config_id < 0
    }
}

/// Guest network report
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuestInfo {
    #[serde(default)]
    pub host_name: String,
    #[serde(default)]
    pub nets: Vec<GuestNic>,
}

/// Hardware summary used to derive the instance type
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HardwareSummary {
    #[serde(default)]
    pub num_cpu: u32,
    #[serde(default)]
    pub memory_mb: u64,
    /// Guest OS identifier, e.g. `ubuntu64Guest`
    #[serde(default)]
    pub guest_id: String,
}

/// Properties fetched for a located VM
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VmProperties {
    /// `None` when VMware Tools has not reported yet
    pub guest: Option<GuestInfo>,
    pub hardware: HardwareSummary,
    pub extra_config: HashMap<String, String>,
}

/// Type of a published node address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AddressKind {
    Hostname,
    InternalIP,
    ExternalIP,
}

impl fmt::Display for AddressKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddressKind::Hostname => write!(f, "Hostname"),
            AddressKind::InternalIP => write!(f, "InternalIP"),
            AddressKind::ExternalIP => write!(f, "ExternalIP"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeAddress {
    pub kind: AddressKind,
    pub address: String,
}

impl NodeAddress {
    pub fn new(kind: AddressKind, address: impl Into<String>) -> Self {
        Self {
            kind,
            address: address.into(),
        }
    }
}

/// Resolved identity of one orchestrator node.
///
/// Never mutated after construction; re-discovery replaces it wholesale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeInfo {
    pub tenant: String,
    pub datacenter: String,
    pub vm: VmRef,
    /// BIOS UUID in platform byte order, lower case
    pub uuid: String,
    pub node_name: String,
    pub instance_type: String,
    pub addresses: Vec<NodeAddress>,
}

impl NodeInfo {
    pub fn addresses_of(&self, kind: AddressKind) -> impl Iterator<Item = &str> {
        self.addresses
            .iter()
            .filter(move |a| a.kind == kind)
            .map(|a| a.address.as_str())
    }
}

/// Failure-domain placement of a VM
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Zone {
    pub failure_domain: String,
    pub region: String,
}

/// Kind of an inventory object in a VM host's ancestor chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AncestorKind {
    Host,
    ComputeResource,
    Datacenter,
    Folder,
}

/// One object in the ancestor chain of a VM's host
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Ancestor {
    pub kind: AncestorKind,
    /// Managed object reference, e.g. `host-12` or `domain-c7`
    pub reference: String,
    #[serde(default)]
    pub name: String,
}

/// A tag attached to an inventory object
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
    pub category: String,
}
