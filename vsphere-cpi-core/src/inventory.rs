//! In-memory vSphere inventory
//!
//! A static snapshot of tenants, datacenters and VMs that implements
//! [`VmLocator`] and [`TagLookup`]. Used by the CLI to resolve nodes against
//! an exported inventory and by tests in place of a live vCenter.
//!
//! ```yaml
//! tenants:
//!   - name: vc1.example.com
//!     datacenters:
//!       - name: dc1
//!         vms:
//!           - reference: vm-101
//!             name: worker-1
//!             uuid: 422e4956-ad22-1139-6d72-59cc8f26bc90
//!             guest:
//!               host_name: worker-1
//!               nets:
//!                 - network: VM Network
//!                   ip_addresses: ["10.0.0.5"]
//!                   device_config_id: 4000
//!             ancestors:
//!               - kind: host
//!                 reference: host-12
//!                 tags: [{ name: zone-a, category: k8s-zone }]
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use crate::error::{CpiError, CpiResult};
use crate::locator::{TagLookup, Tenant, VmLocator};
use crate::types::{
    Ancestor, AncestorKind, GuestInfo, HardwareSummary, LocatedVm, Tag, VmProperties, VmRef,
};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    #[serde(default)]
    pub tenants: Vec<InventoryTenant>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryTenant {
    pub name: String,
    #[serde(default)]
    pub datacenters: Vec<InventoryDatacenter>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryDatacenter {
    pub name: String,
    #[serde(default)]
    pub vms: Vec<InventoryVm>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryVm {
    pub reference: String,
    pub name: String,
    pub uuid: String,
    #[serde(default)]
    pub dns_name: Option<String>,
    #[serde(default)]
    pub guest: Option<GuestInfo>,
    #[serde(default)]
    pub hardware: HardwareSummary,
    #[serde(default)]
    pub extra_config: HashMap<String, String>,
    /// Host first, then its cluster, datacenter and folders
    #[serde(default)]
    pub ancestors: Vec<InventoryAncestor>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryAncestor {
    pub kind: AncestorKind,
    pub reference: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub tags: Vec<Tag>,
}

impl Inventory {
    pub fn from_yaml_str(contents: &str) -> CpiResult<Self> {
        Ok(serde_yaml::from_str(contents)?)
    }

    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> CpiResult<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml_str(&contents)
    }

    /// One [`Tenant`] per inventory tenant, in inventory order
    pub fn into_tenants(self) -> Vec<Tenant> {
        self.tenants
            .into_iter()
            .map(|tenant| {
                let name = tenant.name.clone();
                let shared = Arc::new(tenant);
                Tenant::new(name, shared.clone(), shared)
            })
            .collect()
    }
}

impl InventoryTenant {
    fn find<F>(&self, identifier: &str, matches: F) -> CpiResult<LocatedVm>
    where
        F: Fn(&InventoryVm) -> bool,
    {
        self.datacenters
            .iter()
            .find_map(|dc| {
                dc.vms.iter().find(|&vm| matches(vm)).map(|vm| LocatedVm {
                    vm: VmRef(vm.reference.clone()),
                    name: vm.name.clone(),
                    datacenter: dc.name.clone(),
                    tenant: self.name.clone(),
                    uuid: vm.uuid.to_lowercase(),
                })
            })
            .ok_or_else(|| CpiError::vm_not_found(&self.name, identifier))
    }

    fn vm(&self, vm: &VmRef) -> CpiResult<&InventoryVm> {
        self.datacenters
            .iter()
            .flat_map(|dc| dc.vms.iter())
            .find(|candidate| candidate.reference == vm.0)
            .ok_or_else(|| CpiError::vm_not_found(&self.name, vm.0.clone()))
    }
}

#[async_trait]
impl VmLocator for InventoryTenant {
    async fn find_by_name(&self, name: &str) -> CpiResult<LocatedVm> {
        self.find(name, |vm| {
            vm.name == name
                || vm
                    .dns_name
                    .as_deref()
                    .is_some_and(|dns| dns.eq_ignore_ascii_case(name))
        })
    }

    async fn find_by_ip(&self, ip: &str) -> CpiResult<LocatedVm> {
        self.find(ip, |vm| {
            vm.guest.as_ref().is_some_and(|guest| {
                guest
                    .nets
                    .iter()
                    .any(|nic| nic.ip_addresses.iter().any(|a| a == ip))
            })
        })
    }

    async fn find_by_uuid(&self, uuid: &str) -> CpiResult<LocatedVm> {
        self.find(uuid, |vm| vm.uuid.eq_ignore_ascii_case(uuid))
    }

    async fn vm_properties(&self, vm: &VmRef) -> CpiResult<VmProperties> {
        let vm = self.vm(vm)?;
        Ok(VmProperties {
            guest: vm.guest.clone(),
            hardware: vm.hardware.clone(),
            extra_config: vm.extra_config.clone(),
        })
    }
}

#[async_trait]
impl TagLookup for InventoryTenant {
    async fn host_ancestors(&self, vm: &VmRef) -> CpiResult<Vec<Ancestor>> {
        Ok(self
            .vm(vm)?
            .ancestors
            .iter()
            .map(|a| Ancestor {
                kind: a.kind,
                reference: a.reference.clone(),
                name: a.name.clone(),
            })
            .collect())
    }

    async fn attached_tags(&self, object: &Ancestor) -> CpiResult<Vec<Tag>> {
        Ok(self
            .datacenters
            .iter()
            .flat_map(|dc| dc.vms.iter())
            .flat_map(|vm| vm.ancestors.iter())
            .find(|a| a.reference == object.reference)
            .map(|a| a.tags.clone())
            .unwrap_or_default())
    }
}
