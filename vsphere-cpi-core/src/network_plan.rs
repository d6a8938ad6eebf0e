//! Static network plan decoded from VM extra-config
//!
//! Cluster API provisions VMs with cloud-init metadata in the
//! `guestinfo.metadata` extra-config key. The metadata embeds a netplan v2
//! document whose `network.ethernets.<id>.addresses` lists the addresses the
//! operator assigned. Addresses in the plan are preferred when choosing node
//! addresses.
//!
//! The metadata may be stored raw, base64 encoded, or gzip compressed and
//! then base64 encoded. Decoding tries those encodings in that order.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use flate2::read::GzDecoder;
use serde_yaml::{Mapping, Value};
use std::collections::HashMap;
use std::io::Read;
use tracing::{debug, warn};

use crate::config::METADATA_EXTRA_CONFIG_KEY;
use crate::error::{CpiError, CpiResult};

/// Ordered addresses of a static network plan, CIDR suffixes removed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NetworkPlan {
    addresses: Vec<String>,
}

impl NetworkPlan {
    pub fn new(addresses: Vec<String>) -> Self {
        Self { addresses }
    }

    /// Decode the plan carried in a VM's extra-config, if any.
    ///
    /// Undecodable metadata is logged and treated as "no plan".
    pub fn from_extra_config(extra_config: &HashMap<String, String>) -> Option<Self> {
        let raw = extra_config.get(METADATA_EXTRA_CONFIG_KEY)?;
        if raw.trim().is_empty() {
            return None;
        }

        match Self::decode(raw) {
            Ok(plan) => {
                debug!(addresses = ?plan.addresses, "Decoded network plan from VM metadata");
                Some(plan)
            }
            Err(e) => {
                warn!(error = %e, "Ignoring undecodable VM metadata");
                None
            }
        }
    }

    /// Decode metadata stored raw, as base64, or as gzip+base64
    pub fn decode(raw: &str) -> CpiResult<Self> {
        if let Some(mapping) = parse_mapping(raw) {
            return Ok(Self::from_metadata(&mapping));
        }

        let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
        let bytes = STANDARD
            .decode(compact.as_bytes())
            .map_err(|e| CpiError::serialization("decode base64 metadata", e))?;

        if let Some(mapping) = std::str::from_utf8(&bytes).ok().and_then(parse_mapping) {
            return Ok(Self::from_metadata(&mapping));
        }

        let mut inflated = String::new();
        GzDecoder::new(bytes.as_slice())
            .read_to_string(&mut inflated)
            .map_err(|e| CpiError::serialization("decompress gzip metadata", e))?;

        parse_mapping(&inflated)
            .map(|mapping| Self::from_metadata(&mapping))
            .ok_or_else(|| {
                CpiError::validation("guestinfo.metadata", "metadata is not a YAML mapping")
            })
    }

    fn from_metadata(metadata: &Mapping) -> Self {
        let network = match metadata.get("network") {
            Some(Value::Mapping(network)) => network,
            _ => metadata,
        };

        let mut addresses = Vec::new();
        if let Some(Value::Mapping(ethernets)) = network.get("ethernets") {
            for (_, ethernet) in ethernets {
                let Some(Value::Sequence(list)) = ethernet.get("addresses") else {
                    continue;
                };
                for address in list.iter().filter_map(Value::as_str) {
                    let address = address.split('/').next().unwrap_or(address).trim();
                    if !address.is_empty() {
                        addresses.push(address.to_string());
                    }
                }
            }
        }

        Self { addresses }
    }

    /// Index of `address` in the plan
    pub fn position(&self, address: &str) -> Option<usize> {
        self.addresses.iter().position(|a| a == address)
    }

    pub fn addresses(&self) -> &[String] {
        &self.addresses
    }

    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }
}

fn parse_mapping(text: &str) -> Option<Mapping> {
    match serde_yaml::from_str::<Value>(text) {
        Ok(Value::Mapping(mapping)) => Some(mapping),
        _ => None,
    }
}
