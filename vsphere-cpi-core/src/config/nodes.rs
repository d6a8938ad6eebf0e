//! Node address selection configuration

use ipnet::IpNet;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{CpiError, CpiResult};

/// IP address family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IpFamily {
    Ipv4,
    Ipv6,
}

impl fmt::Display for IpFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IpFamily::Ipv4 => write!(f, "ipv4"),
            IpFamily::Ipv6 => write!(f, "ipv6"),
        }
    }
}

impl FromStr for IpFamily {
    type Err = CpiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ipv4" => Ok(IpFamily::Ipv4),
            "ipv6" => Ok(IpFamily::Ipv6),
            other => Err(CpiError::configuration(
                "nodes.ip_families",
                format!("unknown IP family {:?}", other),
            )),
        }
    }
}

/// Controls which VM addresses are published as node addresses
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodesConfig {
    /// Families to publish, in priority order
    pub ip_families: Vec<IpFamily>,

    /// Addresses inside these subnets are preferred as InternalIP
    pub internal_subnets: Vec<IpNet>,

    /// Addresses inside these subnets are preferred as ExternalIP
    pub external_subnets: Vec<IpNet>,

    /// Addresses inside these subnets are never published as InternalIP
    pub exclude_internal_subnets: Vec<IpNet>,

    /// Addresses inside these subnets are never published as ExternalIP
    pub exclude_external_subnets: Vec<IpNet>,

    /// Virtual network whose addresses are published as InternalIP
    pub internal_network_name: Option<String>,

    /// Virtual network whose addresses are published as ExternalIP
    pub external_network_name: Option<String>,
}

impl Default for NodesConfig {
    fn default() -> Self {
        Self {
            ip_families: vec![IpFamily::Ipv4],
            internal_subnets: Vec::new(),
            external_subnets: Vec::new(),
            exclude_internal_subnets: Vec::new(),
            exclude_external_subnets: Vec::new(),
            internal_network_name: None,
            external_network_name: None,
        }
    }
}

impl NodesConfig {
    pub fn validate(&self) -> CpiResult<()> {
        if self.ip_families.is_empty() {
            return Err(CpiError::configuration(
                "nodes.ip_families",
                "at least one IP family is required",
            ));
        }

        for (i, family) in self.ip_families.iter().enumerate() {
            if self.ip_families[..i].contains(family) {
                return Err(CpiError::configuration(
                    "nodes.ip_families",
                    format!("IP family {} listed more than once", family),
                ));
            }
        }

        for (field, name) in [
            ("nodes.internal_network_name", &self.internal_network_name),
            ("nodes.external_network_name", &self.external_network_name),
        ] {
            if matches!(name, Some(n) if n.trim().is_empty()) {
                return Err(CpiError::configuration(field, "network name cannot be blank"));
            }
        }

        Ok(())
    }
}

/// Parse a comma-separated list of CIDRs
pub fn parse_cidr_list(field: &str, value: &str) -> CpiResult<Vec<IpNet>> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<IpNet>().map_err(|e| {
                CpiError::configuration(field, format!("invalid CIDR {:?}: {}", s, e))
            })
        })
        .collect()
}

/// Parse a comma-separated list of IP families
pub fn parse_ip_families(value: &str) -> CpiResult<Vec<IpFamily>> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::parse)
        .collect()
}
