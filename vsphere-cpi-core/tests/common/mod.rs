// Common test utilities and helpers for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

use vsphere_cpi_core::{
    config::CpiConfig,
    error::{CpiError, CpiResult},
    inventory::{InventoryAncestor, InventoryDatacenter, InventoryTenant, InventoryVm},
    types::{
        Ancestor, AncestorKind, GuestInfo, GuestNic, HardwareSummary, LocatedVm, Tag,
        VmProperties, VmRef,
    },
    NodeRegistry, TagLookup, Tenant, VmLocator,
};

/// BIOS UUID of the first test VM, as vSphere stores it
pub const VM_UUID_1: &str = "422e4956-ad22-1139-6d72-59cc8f26bc90";
/// The same UUID as Kubernetes reports it
pub const K8S_UUID_1: &str = "56492e42-22ad-3911-6d72-59cc8f26bc90";

pub const VM_UUID_2: &str = "4237a1b2-c3d4-e5f6-0718-293a4b5c6d7e";
pub const VM_UUID_3: &str = "42010203-0405-0607-0809-0a0b0c0d0e0f";

pub fn nic(network: &str, ips: &[&str]) -> GuestNic {
    GuestNic {
        network: network.to_string(),
        ip_addresses: ips.iter().map(|s| s.to_string()).collect(),
        device_config_id: 4000,
    }
}

/// A powered-on VM whose guest hostname equals its inventory name
pub fn vm(reference: &str, name: &str, uuid: &str, nets: Vec<GuestNic>) -> InventoryVm {
    InventoryVm {
        reference: reference.to_string(),
        name: name.to_string(),
        uuid: uuid.to_string(),
        dns_name: None,
        guest: Some(GuestInfo {
            host_name: name.to_string(),
            nets,
        }),
        hardware: HardwareSummary {
            num_cpu: 2,
            memory_mb: 4096,
            guest_id: "ubuntu64Guest".to_string(),
        },
        extra_config: Default::default(),
        ancestors: Vec::new(),
    }
}

pub fn ancestor(kind: AncestorKind, reference: &str, tags: &[(&str, &str)]) -> InventoryAncestor {
    InventoryAncestor {
        kind,
        reference: reference.to_string(),
        name: reference.to_string(),
        tags: tags
            .iter()
            .map(|(name, category)| Tag {
                name: name.to_string(),
                category: category.to_string(),
            })
            .collect(),
    }
}

pub fn inventory_tenant(name: &str, datacenters: Vec<(&str, Vec<InventoryVm>)>) -> InventoryTenant {
    InventoryTenant {
        name: name.to_string(),
        datacenters: datacenters
            .into_iter()
            .map(|(dc, vms)| InventoryDatacenter {
                name: dc.to_string(),
                vms,
            })
            .collect(),
    }
}

/// Inventory-backed tenant that records calls and can inject failures
pub struct ScriptedTenant {
    inventory: InventoryTenant,
    calls: Mutex<Vec<String>>,
    lookup_failure: Mutex<Option<String>>,
    tag_failure: Mutex<Option<String>>,
    delay: Mutex<Option<Duration>>,
}

impl ScriptedTenant {
    pub fn new(inventory: InventoryTenant) -> Arc<Self> {
        Arc::new(Self {
            inventory,
            calls: Mutex::new(Vec::new()),
            lookup_failure: Mutex::new(None),
            tag_failure: Mutex::new(None),
            delay: Mutex::new(None),
        })
    }

    pub fn tenant(self: &Arc<Self>) -> Tenant {
        Tenant::new(self.inventory.name.clone(), self.clone(), self.clone())
    }

    /// Make every find call fail with a collaborator error
    pub fn fail_lookups(&self, message: &str) {
        *self.lookup_failure.lock() = Some(message.to_string());
    }

    pub fn fail_tags(&self, message: &str) {
        *self.tag_failure.lock() = Some(message.to_string());
    }

    /// Delay every find call
    pub fn delay_lookups(&self, delay: Duration) {
        *self.delay.lock() = Some(delay);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn calls_with_prefix(&self, prefix: &str) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| c.starts_with(prefix))
            .collect()
    }

    async fn before_lookup(&self, call: String) -> CpiResult<()> {
        self.calls.lock().push(call.clone());

        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let failure = self.lookup_failure.lock().clone();
        match failure {
            Some(message) => Err(CpiError::collaborator(
                &self.inventory.name,
                call,
                std::io::Error::new(std::io::ErrorKind::Other, message),
            )),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl VmLocator for ScriptedTenant {
    async fn find_by_name(&self, name: &str) -> CpiResult<LocatedVm> {
        self.before_lookup(format!("name:{}", name)).await?;
        self.inventory.find_by_name(name).await
    }

    async fn find_by_ip(&self, ip: &str) -> CpiResult<LocatedVm> {
        self.before_lookup(format!("ip:{}", ip)).await?;
        self.inventory.find_by_ip(ip).await
    }

    async fn find_by_uuid(&self, uuid: &str) -> CpiResult<LocatedVm> {
        self.before_lookup(format!("uuid:{}", uuid)).await?;
        self.inventory.find_by_uuid(uuid).await
    }

    async fn vm_properties(&self, vm: &VmRef) -> CpiResult<VmProperties> {
        self.calls.lock().push(format!("props:{}", vm));
        self.inventory.vm_properties(vm).await
    }
}

#[async_trait]
impl TagLookup for ScriptedTenant {
    async fn host_ancestors(&self, vm: &VmRef) -> CpiResult<Vec<Ancestor>> {
        self.calls.lock().push(format!("ancestors:{}", vm));
        self.inventory.host_ancestors(vm).await
    }

    async fn attached_tags(&self, object: &Ancestor) -> CpiResult<Vec<Tag>> {
        self.calls.lock().push(format!("tags:{}", object.reference));
        let failure = self.tag_failure.lock().clone();
        if let Some(message) = failure {
            return Err(CpiError::collaborator(
                &self.inventory.name,
                "list attached tags",
                std::io::Error::new(std::io::ErrorKind::Other, message),
            ));
        }
        self.inventory.attached_tags(object).await
    }
}

pub fn registry(tenants: &[&Arc<ScriptedTenant>], config: CpiConfig) -> Arc<NodeRegistry> {
    Arc::new(NodeRegistry::new(
        tenants.iter().map(|t| t.tenant()).collect(),
        &config,
    ))
}

/// Single tenant `vc1` with one datacenter `dc1`
pub fn single_tenant(vms: Vec<InventoryVm>) -> Arc<ScriptedTenant> {
    ScriptedTenant::new(inventory_tenant("vc1", vec![("dc1", vms)]))
}
