//! Node address selection
//!
//! Chooses which of a VM's guest addresses are published as the node's
//! InternalIP and ExternalIP. For each configured IP family, in priority
//! order:
//!
//! 1. Addresses in an exclude subnet are removed from the candidates for that
//!    role (internal and external have separate exclude lists).
//! 2. The first candidate inside a configured subnet wins, subnets tried in
//!    configured order.
//! 3. Otherwise the first candidate on the configured virtual network wins.
//! 4. If neither role was resolved, the first remaining candidate is used for
//!    each role, which may publish the same address twice.
//!
//! Candidates listed in the VM's static network plan are tried before all
//! others.

use ipnet::IpNet;
use std::net::IpAddr;
use tracing::{debug, warn};

use crate::config::{IpFamily, NodesConfig};
use crate::error::{CpiError, CpiResult};
use crate::network_plan::NetworkPlan;
use crate::types::{AddressKind, GuestInfo, GuestNic, NodeAddress};

/// One guest IP address and the virtual network it was observed on
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct IpAddrNetworkName {
    pub address: String,
    pub ip: IpAddr,
    pub network_name: String,
}

impl IpAddrNetworkName {
    fn family(&self) -> IpFamily {
        match self.ip {
            IpAddr::V4(_) => IpFamily::Ipv4,
            IpAddr::V6(_) => IpFamily::Ipv6,
        }
    }

    fn in_any(&self, subnets: &[IpNet]) -> bool {
        subnets.iter().any(|net| net.contains(&self.ip))
    }
}

/// Select the addresses to publish for a VM.
///
/// The guest hostname is always published first. `vm` is only used in log
/// and error messages.
pub fn select_addresses(
    vm: &str,
    guest: &GuestInfo,
    config: &NodesConfig,
    plan: Option<&NetworkPlan>,
) -> CpiResult<Vec<NodeAddress>> {
    let mut addresses = vec![NodeAddress::new(
        AddressKind::Hostname,
        guest.host_name.clone(),
    )];

    let nics: Vec<&GuestNic> = guest.nets.iter().filter(|nic| !nic.is_virtual()).collect();
    check_network_names(vm, &nics, config)?;

    let mut candidates = collect_candidates(&nics);
    if let Some(plan) = plan.filter(|p| !p.is_empty()) {
        prefer_planned(&mut candidates, plan);
    }

    for family in &config.ip_families {
        let in_family: Vec<&IpAddrNetworkName> =
            candidates.iter().filter(|c| c.family() == *family).collect();

        let internal_view = without_subnets(&in_family, &config.exclude_internal_subnets);
        let external_view = without_subnets(&in_family, &config.exclude_external_subnets);

        let mut internal = select_role(
            &internal_view,
            &config.internal_subnets,
            config.internal_network_name.as_deref(),
        );
        let mut external = select_role(
            &external_view,
            &config.external_subnets,
            config.external_network_name.as_deref(),
        );

        if internal.is_none() && external.is_none() {
            internal = internal_view.first().copied();
            external = external_view.first().copied();
            if internal.is_some() || external.is_some() {
                debug!(
                    vm = %vm,
                    family = %family,
                    "No subnet or network name matched, using first discovered addresses"
                );
            }
        }

        if let Some(candidate) = internal {
            push_unique(&mut addresses, AddressKind::InternalIP, &candidate.address);
        }
        if let Some(candidate) = external {
            push_unique(&mut addresses, AddressKind::ExternalIP, &candidate.address);
        }

        if !guest.nets.is_empty() && internal.is_none() && external.is_none() {
            return Err(CpiError::NoAddressForFamily {
                vm: vm.to_string(),
                family: family.to_string(),
            });
        }
    }

    Ok(addresses)
}

/// Fail when both network names are configured and the VM is attached to
/// neither of them.
fn check_network_names(vm: &str, nics: &[&GuestNic], config: &NodesConfig) -> CpiResult<()> {
    let (Some(internal), Some(external)) = (
        config.internal_network_name.as_deref(),
        config.external_network_name.as_deref(),
    ) else {
        return Ok(());
    };

    let attached = |name: &str| nics.iter().any(|nic| nic.network.eq_ignore_ascii_case(name));
    if attached(internal) || attached(external) {
        return Ok(());
    }

    warn!(
        vm = %vm,
        internal = %internal,
        external = %external,
        "VM is not attached to the configured internal or external network"
    );
    Err(CpiError::NetworkNameMismatch {
        vm: vm.to_string(),
        internal: internal.to_string(),
        external: external.to_string(),
    })
}

/// Flatten NICs into (IP, network) pairs, dropping addresses that can never
/// be node addresses.
pub(crate) fn collect_candidates(nics: &[&GuestNic]) -> Vec<IpAddrNetworkName> {
    let mut candidates = Vec::new();
    for nic in nics {
        for raw in &nic.ip_addresses {
            let raw = raw.trim();
            let Ok(ip) = raw.parse::<IpAddr>() else {
                debug!(address = %raw, network = %nic.network, "Skipping unparseable guest address");
                continue;
            };

            // IPv4-mapped IPv6 addresses are classified by their 4-byte form
            // but matched and published as reported
            let ip = match ip {
                IpAddr::V6(v6) => v6.to_ipv4_mapped().map_or(ip, IpAddr::V4),
                IpAddr::V4(_) => ip,
            };

            if ip.is_unspecified()
                || ip.is_loopback()
                || is_link_local_unicast(&ip)
                || is_link_local_multicast(&ip)
            {
                continue;
            }

            candidates.push(IpAddrNetworkName {
                address: raw.to_string(),
                ip,
                network_name: nic.network.clone(),
            });
        }
    }
    candidates
}

/// Stable sort that moves planned addresses to the front in plan order
fn prefer_planned(candidates: &mut [IpAddrNetworkName], plan: &NetworkPlan) {
    candidates.sort_by_key(|c| match plan.position(&c.address) {
        Some(index) => (0, index),
        None => (1, 0),
    });
}

fn without_subnets<'a>(
    candidates: &[&'a IpAddrNetworkName],
    excluded: &[IpNet],
) -> Vec<&'a IpAddrNetworkName> {
    candidates
        .iter()
        .copied()
        .filter(|c| !c.in_any(excluded))
        .collect()
}

fn select_role<'a>(
    candidates: &[&'a IpAddrNetworkName],
    subnets: &[IpNet],
    network_name: Option<&str>,
) -> Option<&'a IpAddrNetworkName> {
    let by_subnet = subnets
        .iter()
        .find_map(|net| candidates.iter().copied().find(|c| net.contains(&c.ip)));
    if by_subnet.is_some() {
        return by_subnet;
    }

    let name = network_name?;
    candidates
        .iter()
        .copied()
        .find(|c| c.network_name.eq_ignore_ascii_case(name))
}

fn push_unique(addresses: &mut Vec<NodeAddress>, kind: AddressKind, address: &str) {
    if !addresses
        .iter()
        .any(|a| a.kind == kind && a.address == address)
    {
        addresses.push(NodeAddress::new(kind, address));
    }
}

fn is_link_local_unicast(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => v4.is_link_local(),
        IpAddr::V6(v6) => (v6.segments()[0] & 0xffc0) == 0xfe80,
    }
}

fn is_link_local_multicast(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            let o = v4.octets();
            o[0] == 224 && o[1] == 0 && o[2] == 0
        }
        IpAddr::V6(v6) => (v6.segments()[0] & 0xff0f) == 0xff02,
    }
}
