//! VM discovery across tenants
//!
//! A search is an ordered chain of [`SearchStep`]s. Each step is tried
//! against every tenant in configuration order before the next step runs:
//!
//! ```text
//! SearchBy::Name  ->  Name  ->  Ip
//! SearchBy::Uuid  ->  Uuid  ->  SwappedUuid
//! ```
//!
//! Only a not-found result moves the search on. Any other error aborts it,
//! since the core cannot tell transient collaborator failures from permanent
//! ones.

use std::future::Future;
use tracing::{debug, instrument};

use crate::address_selector::select_addresses;
use crate::config::NodesConfig;
use crate::error::{CpiError, CpiResult};
use crate::locator::Tenant;
use crate::network_plan::NetworkPlan;
use crate::types::{HardwareSummary, LocatedVm, NodeInfo, SearchBy};
use crate::uuid_codec::to_canonical;

/// One locator call in a search chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchStep {
    /// VM inventory name or guest DNS name
    Name,
    /// Guest IP address, using the identifier as given
    Ip,
    /// BIOS UUID as given
    Uuid,
    /// BIOS UUID after byte-order conversion, for guests that report the
    /// non-standard order
    SwappedUuid,
}

impl SearchStep {
    pub fn chain(search: SearchBy) -> &'static [SearchStep] {
        match search {
            SearchBy::Name => &[SearchStep::Name, SearchStep::Ip],
            SearchBy::Uuid => &[SearchStep::Uuid, SearchStep::SwappedUuid],
        }
    }

    async fn run(self, tenant: &Tenant, identifier: &str) -> CpiResult<LocatedVm> {
        match self {
            SearchStep::Name => tenant.locator.find_by_name(identifier).await,
            SearchStep::Ip => tenant.locator.find_by_ip(identifier).await,
            SearchStep::Uuid => tenant.locator.find_by_uuid(&identifier.to_lowercase()).await,
            SearchStep::SwappedUuid => tenant.locator.find_by_uuid(&to_canonical(identifier)).await,
        }
    }
}

/// Try `attempt` on each item in order until one succeeds.
///
/// Not-found results move on to the next item; any other error is returned
/// immediately. When every item reports not-found the last not-found error is
/// returned.
pub async fn first_found<I, T, F, Fut>(items: I, mut attempt: F) -> CpiResult<T>
where
    I: IntoIterator,
    F: FnMut(I::Item) -> Fut,
    Fut: Future<Output = CpiResult<T>>,
{
    let mut not_found = None;
    for item in items {
        match attempt(item).await {
            Ok(found) => return Ok(found),
            Err(e) if e.is_not_found() => not_found = Some(e),
            Err(e) => return Err(e),
        }
    }
    Err(not_found.unwrap_or_else(|| CpiError::not_found("no tenants configured")))
}

/// Locates VMs and turns them into [`NodeInfo`]s
pub struct Discoverer {
    tenants: Vec<Tenant>,
    nodes: NodesConfig,
}

impl Discoverer {
    pub fn new(tenants: Vec<Tenant>, nodes: NodesConfig) -> Self {
        Self { tenants, nodes }
    }

    pub fn tenant(&self, name: &str) -> Option<&Tenant> {
        self.tenants.iter().find(|t| t.name == name)
    }

    pub fn tenants(&self) -> &[Tenant] {
        &self.tenants
    }

    /// Find the VM for `identifier` and the tenant that owns it
    #[instrument(skip(self), fields(search = %search))]
    pub async fn locate(&self, identifier: &str, search: SearchBy) -> CpiResult<(LocatedVm, &Tenant)> {
        let result = first_found(SearchStep::chain(search).iter().copied(), |step| async move {
            first_found(self.tenants.iter(), |tenant| async move {
                step.run(tenant, identifier).await.map(|vm| {
                    debug!(step = ?step, tenant = %tenant.name, vm = %vm.vm, "Located VM");
                    (vm, tenant)
                })
            })
            .await
        })
        .await;

        result.map_err(|e| {
            if e.is_not_found() {
                CpiError::not_found(format!("VM for {} {}", search, identifier))
            } else {
                e
            }
        })
    }

    /// Locate the VM for `identifier` and build its node identity.
    ///
    /// `node_name` names the orchestrator node when the caller knows it;
    /// otherwise a name search uses the identifier and a UUID search uses the
    /// guest hostname.
    #[instrument(skip(self), fields(search = %search))]
    pub async fn discover(
        &self,
        identifier: &str,
        search: SearchBy,
        node_name: Option<&str>,
    ) -> CpiResult<NodeInfo> {
        let (located, tenant) = self.locate(identifier, search).await?;
        let props = tenant.locator.vm_properties(&located.vm).await?;

        let guest = props.guest.ok_or_else(|| CpiError::GuestInfoUnavailable {
            vm: located.name.clone(),
            reason: "guest info not reported".to_string(),
        })?;
        if guest.host_name.trim().is_empty() {
            return Err(CpiError::validation(
                "guest.host_name",
                format!("VM {} reports an empty hostname", located.name),
            ));
        }
        if guest.nets.is_empty() {
            return Err(CpiError::validation(
                "guest.nets",
                format!("VM {} reports no network interfaces", located.name),
            ));
        }
        if located.uuid.trim().is_empty() {
            return Err(CpiError::validation(
                "uuid",
                format!("VM {} has no BIOS UUID", located.name),
            ));
        }

        let plan = NetworkPlan::from_extra_config(&props.extra_config);
        let addresses = select_addresses(&located.name, &guest, &self.nodes, plan.as_ref())?;

        let node_name = match (node_name, search) {
            (Some(name), _) => name.to_string(),
            (None, SearchBy::Name) => identifier.to_string(),
            (None, SearchBy::Uuid) => guest.host_name.trim().to_lowercase(),
        };

        debug!(
            node = %node_name,
            tenant = %tenant.name,
            datacenter = %located.datacenter,
            addresses = addresses.len(),
            "Discovered node"
        );

        Ok(NodeInfo {
            tenant: tenant.name.clone(),
            datacenter: located.datacenter,
            vm: located.vm,
            uuid: located.uuid.trim().to_lowercase(),
            node_name,
            instance_type: instance_type(&props.hardware),
            addresses,
        })
    }
}

/// `vsphere-vm.cpu-<n>.mem-<g>gb.os-<os>`
pub fn instance_type(hardware: &HardwareSummary) -> String {
    let os = hardware
        .guest_id
        .strip_suffix("Guest")
        .unwrap_or(&hardware.guest_id)
        .trim_end_matches(|c: char| c.is_ascii_digit())
        .to_lowercase();
    let os = if os.is_empty() { "unknown".to_string() } else { os };

    format!(
        "vsphere-vm.cpu-{}.mem-{}gb.os-{}",
        hardware.num_cpu,
        hardware.memory_mb / 1024,
        os
    )
}
