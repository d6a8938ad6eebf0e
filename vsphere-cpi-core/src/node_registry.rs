//! Registry of orchestrator nodes and the VMs backing them
//!
//! The registry owns two independently locked resources:
//!
//! - the identity index: by-name, by-UUID and tenant → datacenter → UUID
//!   views over the same [`NodeInfo`]s, always updated together in one
//!   critical section;
//! - the registration set: nodes the orchestrator currently considers cluster
//!   members. "Does this node exist" queries consult it rather than the
//!   identity index, which may hold entries for nodes that have left.
//!
//! Discovery runs outside both locks and only touches the index once it has
//! fully succeeded, so a failed, timed out or dropped discovery leaves the
//! caches as they were.

use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::config::{CpiConfig, LabelsConfig};
use crate::discovery::Discoverer;
use crate::error::{CpiError, CpiResult};
use crate::locator::Tenant;
use crate::types::{AddressKind, NodeAddress, NodeInfo, SearchBy, Zone};
use crate::uuid_codec::{to_canonical, uuid_from_provider_id};
use crate::zone::ZoneResolver;

type TenantTree = BTreeMap<String, BTreeMap<String, BTreeMap<String, Arc<NodeInfo>>>>;

/// The three views over the known node identities
#[derive(Default)]
struct NodeIndex {
    by_name: HashMap<String, Arc<NodeInfo>>,
    by_uuid: HashMap<String, Arc<NodeInfo>>,
    /// Every name currently mapped to each UUID, including lookup aliases
    names: HashMap<String, BTreeSet<String>>,
    by_tenant: TenantTree,
}

impl NodeIndex {
    /// Insert or replace a node under its own name.
    ///
    /// Names previously held by the same UUID are dropped, and a different
    /// node currently holding the name is evicted from every view.
    fn insert(&mut self, info: NodeInfo) {
        self.remove_uuid(&info.uuid);
        let names = BTreeSet::from([info.node_name.clone()]);
        self.store(info, names);
    }

    /// Cache a node found by a lookup under `alias`.
    ///
    /// A VM that is already cached keeps its node name and every name it is
    /// known by; `alias` is added to them.
    fn insert_alias(&mut self, mut info: NodeInfo, alias: &str) {
        let mut names = BTreeSet::from([alias.to_string()]);
        match self.remove_uuid(&info.uuid) {
            Some((previous, known)) => {
                info.node_name = previous.node_name.clone();
                names.extend(known);
            }
            None => {
                names.insert(info.node_name.clone());
            }
        }
        self.store(info, names);
    }

    fn store(&mut self, info: NodeInfo, names: BTreeSet<String>) {
        let info = Arc::new(info);

        for name in &names {
            if let Some(holder) = self.by_name.get(name).cloned() {
                if holder.uuid != info.uuid {
                    debug!(
                        node = %name,
                        old_uuid = %holder.uuid,
                        new_uuid = %info.uuid,
                        "Node name moved to a different VM"
                    );
                    self.remove_uuid(&holder.uuid);
                }
            }
        }

        self.by_tenant
            .entry(info.tenant.clone())
            .or_default()
            .entry(info.datacenter.clone())
            .or_default()
            .insert(info.uuid.clone(), info.clone());
        for name in &names {
            self.by_name.insert(name.clone(), info.clone());
        }
        self.names.insert(info.uuid.clone(), names);
        self.by_uuid.insert(info.uuid.clone(), info);
    }

    /// Remove the node with `uuid` from every view, returning it with the
    /// names it was known by.
    ///
    /// A name is only removed while it still maps to this UUID, so a newer
    /// node reusing the name survives.
    fn remove_uuid(&mut self, uuid: &str) -> Option<(Arc<NodeInfo>, BTreeSet<String>)> {
        let info = self.by_uuid.remove(uuid)?;
        self.detach_tree(&info);
        let names = self.names.remove(uuid).unwrap_or_default();
        for name in &names {
            if self
                .by_name
                .get(name)
                .is_some_and(|current| current.uuid == info.uuid)
            {
                self.by_name.remove(name);
            }
        }
        Some((info, names))
    }

    fn detach_tree(&mut self, info: &NodeInfo) {
        let Some(datacenters) = self.by_tenant.get_mut(&info.tenant) else {
            return;
        };
        if let Some(nodes) = datacenters.get_mut(&info.datacenter) {
            nodes.remove(&info.uuid);
            if nodes.is_empty() {
                datacenters.remove(&info.datacenter);
            }
        }
        if datacenters.is_empty() {
            self.by_tenant.remove(&info.tenant);
        }
    }

    fn enumerate(&self, tenant: Option<&str>, datacenter: Option<&str>) -> Vec<NodeInfo> {
        self.by_tenant
            .iter()
            .filter(|(name, _)| tenant.map_or(true, |t| t == name.as_str()))
            .flat_map(|(_, datacenters)| datacenters.iter())
            .filter(|(name, _)| datacenter.map_or(true, |d| d == name.as_str()))
            .flat_map(|(_, nodes)| nodes.values())
            .map(|info| info.as_ref().clone())
            .collect()
    }
}

/// Concurrent registry of node identities.
///
/// All operations take `&self` and are safe to call from any number of
/// tasks or threads.
pub struct NodeRegistry {
    discoverer: Discoverer,
    index: RwLock<NodeIndex>,
    /// Canonical orchestrator UUID -> BIOS UUID of the VM it resolved to
    registered: RwLock<HashMap<String, String>>,
    discovery_timeout: Duration,
    provider_id_scheme: String,
    labels: LabelsConfig,
}

impl NodeRegistry {
    pub fn new(tenants: Vec<Tenant>, config: &CpiConfig) -> Self {
        Self {
            discoverer: Discoverer::new(tenants, config.nodes.clone()),
            index: RwLock::new(NodeIndex::default()),
            registered: RwLock::new(HashMap::new()),
            discovery_timeout: config.discovery.timeout,
            provider_id_scheme: config.discovery.provider_id_scheme.clone(),
            labels: config.labels.clone(),
        }
    }

    /// Record a node the orchestrator added.
    ///
    /// Discovers the node's VM by UUID and caches its identity. When
    /// discovery fails nothing is cached and the error is returned.
    #[instrument(skip(self))]
    pub async fn register_node(&self, node_name: &str, reported_uuid: &str) -> CpiResult<()> {
        let canonical = to_canonical(reported_uuid);

        let info = match self
            .discover(&canonical, SearchBy::Uuid, Some(node_name))
            .await
        {
            Ok(info) => info,
            Err(e) => {
                warn!(node = %node_name, uuid = %canonical, error = %e, "Failed to register node");
                return Err(e);
            }
        };

        let vm_uuid = info.uuid.clone();
        self.index.write().insert(info);
        self.registered.write().insert(canonical, vm_uuid.clone());

        info!(node = %node_name, uuid = %vm_uuid, "Registered node");
        Ok(())
    }

    /// Forget a node the orchestrator deleted.
    ///
    /// `node_name` is only used for logging: the names removed from the index
    /// are those that still map to the UUID, so a stale delete cannot remove a
    /// newer node that reused the name.
    #[instrument(skip(self))]
    pub fn unregister_node(&self, node_name: &str, reported_uuid: &str) {
        let canonical = to_canonical(reported_uuid);

        let vm_uuid = self
            .registered
            .write()
            .remove(&canonical)
            .unwrap_or_else(|| canonical.clone());

        match self.index.write().remove_uuid(&vm_uuid) {
            Some((removed, _)) => info!(
                node = %node_name,
                cached_name = %removed.node_name,
                uuid = %vm_uuid,
                "Unregistered node"
            ),
            None => debug!(node = %node_name, uuid = %vm_uuid, "Unregistered node was not cached"),
        }
    }

    /// Resolve a node by orchestrator name, discovering it on a cache miss
    pub async fn resolve_by_name(&self, name: &str) -> CpiResult<NodeInfo> {
        if let Some(info) = self.cached_by_name(name) {
            return Ok(info);
        }

        let info = self.discover(name, SearchBy::Name, None).await?;
        self.index.write().insert_alias(info, name);

        self.cached_by_name(name)
            .ok_or_else(|| CpiError::not_found(format!("node {}", name)))
    }

    /// Resolve a node by BIOS UUID, discovering it on a cache miss
    pub async fn resolve_by_uuid(&self, uuid: &str) -> CpiResult<NodeInfo> {
        let uuid = uuid.trim().to_lowercase();
        if let Some(info) = self.cached_by_uuid(&uuid) {
            return Ok(info);
        }

        let info = self.discover(&uuid, SearchBy::Uuid, None).await?;
        let resolved = info.uuid.clone();
        let name = info.node_name.clone();
        self.index.write().insert_alias(info, &name);

        self.cached_by_uuid(&resolved)
            .ok_or_else(|| CpiError::not_found(format!("node with UUID {}", uuid)))
    }

    /// Resolve a node by provider ID (`vsphere://<uuid>`)
    pub async fn resolve_by_provider_id(&self, provider_id: &str) -> CpiResult<NodeInfo> {
        self.resolve_by_uuid(&self.uuid_from_provider_id(provider_id))
            .await
    }

    /// Resolve a node by UUID only while it is a registered cluster member
    pub async fn resolve_registered(&self, uuid: &str) -> CpiResult<NodeInfo> {
        let uuid = uuid.trim().to_lowercase();
        if !self.is_registered(&uuid) {
            return Err(CpiError::not_found(format!("registered node with UUID {}", uuid)));
        }
        self.resolve_by_uuid(&uuid).await
    }

    /// Whether the node with this BIOS UUID is a registered cluster member
    pub fn is_registered(&self, uuid: &str) -> bool {
        let uuid = uuid.trim().to_lowercase();
        let registered = self.registered.read();
        registered.contains_key(&uuid) || registered.values().any(|v| *v == uuid)
    }

    pub fn instance_exists_by_provider_id(&self, provider_id: &str) -> bool {
        self.is_registered(&self.uuid_from_provider_id(provider_id))
    }

    /// BIOS UUID of the VM backing a node
    pub async fn instance_id(&self, node_name: &str) -> CpiResult<String> {
        Ok(self.resolve_by_name(node_name).await?.uuid)
    }

    pub async fn instance_type_by_provider_id(&self, provider_id: &str) -> CpiResult<String> {
        Ok(self.resolve_by_provider_id(provider_id).await?.instance_type)
    }

    pub async fn node_addresses_by_name(&self, node_name: &str) -> CpiResult<Vec<NodeAddress>> {
        Ok(self.resolve_by_name(node_name).await?.addresses)
    }

    pub async fn node_addresses_by_provider_id(
        &self,
        provider_id: &str,
    ) -> CpiResult<Vec<NodeAddress>> {
        Ok(self.resolve_by_provider_id(provider_id).await?.addresses)
    }

    /// Snapshot of cached nodes, optionally scoped to a tenant and datacenter
    pub fn enumerate(&self, tenant: Option<&str>, datacenter: Option<&str>) -> Vec<NodeInfo> {
        self.index.read().enumerate(tenant, datacenter)
    }

    /// JSON export of [`enumerate`](Self::enumerate)
    pub fn export_nodes(
        &self,
        tenant: Option<&str>,
        datacenter: Option<&str>,
    ) -> CpiResult<serde_json::Value> {
        Ok(serde_json::to_value(self.enumerate(tenant, datacenter))?)
    }

    /// Failure domain and region of a node.
    ///
    /// Returns an empty zone unless both tag categories are configured.
    pub async fn resolve_zone(&self, node: &NodeInfo) -> CpiResult<Zone> {
        let Some(resolver) = ZoneResolver::new(&self.labels) else {
            return Ok(Zone::default());
        };
        let tenant = self
            .discoverer
            .tenant(&node.tenant)
            .ok_or_else(|| CpiError::not_found(format!("tenant {}", node.tenant)))?;
        resolver.resolve(tenant.tags.as_ref(), node).await
    }

    pub async fn zone_by_provider_id(&self, provider_id: &str) -> CpiResult<Zone> {
        let node = self.resolve_by_provider_id(provider_id).await?;
        self.resolve_zone(&node).await
    }

    pub fn cached_by_name(&self, name: &str) -> Option<NodeInfo> {
        self.index
            .read()
            .by_name
            .get(name)
            .map(|info| info.as_ref().clone())
    }

    pub fn cached_by_uuid(&self, uuid: &str) -> Option<NodeInfo> {
        self.index
            .read()
            .by_uuid
            .get(uuid)
            .map(|info| info.as_ref().clone())
    }

    /// Number of cached identities
    pub fn len(&self) -> usize {
        self.index.read().by_uuid.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn hostname_of(&self, name: &str) -> Option<String> {
        self.cached_by_name(name).and_then(|info| {
            info.addresses_of(AddressKind::Hostname)
                .next()
                .map(str::to_string)
        })
    }

    fn uuid_from_provider_id(&self, provider_id: &str) -> String {
        uuid_from_provider_id(provider_id, &self.provider_id_scheme)
    }

    async fn discover(
        &self,
        identifier: &str,
        search: SearchBy,
        node_name: Option<&str>,
    ) -> CpiResult<NodeInfo> {
        tokio::time::timeout(
            self.discovery_timeout,
            self.discoverer.discover(identifier, search, node_name),
        )
        .await
        .map_err(|_| {
            CpiError::timeout(
                format!("discover node by {} {}", search, identifier),
                self.discovery_timeout,
            )
        })?
    }
}
