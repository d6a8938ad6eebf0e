//! Configuration for the vSphere cloud provider core
//!
//! Values are loaded from a TOML file, overridden by `VSPHERE_CPI_*`
//! environment variables, then validated.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::{CpiError, CpiResult};

pub mod defaults;
pub mod labels;
pub mod nodes;

pub use defaults::*;
pub use labels::LabelsConfig;
pub use nodes::{IpFamily, NodesConfig};

/// Root configuration structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CpiConfig {
    /// Node address selection
    pub nodes: NodesConfig,

    /// Zone and region tag categories
    pub labels: LabelsConfig,

    /// Discovery behaviour
    pub discovery: DiscoveryConfig,

    /// Logging
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Upper bound on a single discovery, including locator round-trips
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,

    /// Scheme prefix of node provider IDs
    pub provider_id_scheme: String,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            timeout: duration_secs(DEFAULT_DISCOVERY_TIMEOUT_SECS),
            provider_id_scheme: DEFAULT_PROVIDER_ID_SCHEME.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

impl Default for CpiConfig {
    fn default() -> Self {
        Self {
            nodes: NodesConfig::default(),
            labels: LabelsConfig::default(),
            discovery: DiscoveryConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl CpiConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> CpiResult<Self> {
        let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            CpiError::configuration(
                "file",
                format!("failed to read {}: {}", path.as_ref().display(), e),
            )
        })?;

        let mut config = Self::from_toml(&contents)?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from TOML text without env overrides or validation
    pub fn from_toml(contents: &str) -> CpiResult<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Load configuration from environment variables on top of the defaults
    pub fn from_env() -> CpiResult<Self> {
        let mut config = Self::default();
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) -> CpiResult<()> {
        if let Some(val) = env_var("IP_FAMILY") {
            self.nodes.ip_families = nodes::parse_ip_families(&val)?;
        }

        if let Some(val) = env_var("INTERNAL_NETWORK_NAME") {
            self.nodes.internal_network_name = Some(val);
        }
        if let Some(val) = env_var("EXTERNAL_NETWORK_NAME") {
            self.nodes.external_network_name = Some(val);
        }

        if let Some(val) = env_var("INTERNAL_SUBNETS") {
            self.nodes.internal_subnets = nodes::parse_cidr_list("nodes.internal_subnets", &val)?;
        }
        if let Some(val) = env_var("EXTERNAL_SUBNETS") {
            self.nodes.external_subnets = nodes::parse_cidr_list("nodes.external_subnets", &val)?;
        }
        if let Some(val) = env_var("EXCLUDE_INTERNAL_SUBNETS") {
            self.nodes.exclude_internal_subnets =
                nodes::parse_cidr_list("nodes.exclude_internal_subnets", &val)?;
        }
        if let Some(val) = env_var("EXCLUDE_EXTERNAL_SUBNETS") {
            self.nodes.exclude_external_subnets =
                nodes::parse_cidr_list("nodes.exclude_external_subnets", &val)?;
        }

        if let Some(val) = env_var("ZONE_CATEGORY") {
            self.labels.zone = Some(val);
        }
        if let Some(val) = env_var("REGION_CATEGORY") {
            self.labels.region = Some(val);
        }

        if let Some(val) = env_var("DISCOVERY_TIMEOUT_SECS") {
            let secs = val.parse::<u64>().map_err(|_| {
                CpiError::configuration(
                    "discovery.timeout",
                    format!("invalid {}DISCOVERY_TIMEOUT_SECS", ENV_PREFIX),
                )
            })?;
            self.discovery.timeout = Duration::from_secs(secs);
        }

        if let Some(val) = env_var("LOG_LEVEL") {
            self.logging.level = val;
        }

        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> CpiResult<()> {
        self.nodes.validate()?;

        if self.discovery.timeout.is_zero() {
            return Err(CpiError::configuration(
                "discovery.timeout",
                "timeout must be greater than zero",
            ));
        }

        if self.discovery.provider_id_scheme.is_empty() {
            return Err(CpiError::configuration(
                "discovery.provider_id_scheme",
                "scheme cannot be empty",
            ));
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_ascii_lowercase().as_str()) {
            return Err(CpiError::configuration(
                "logging.level",
                format!("invalid log level {:?}", self.logging.level),
            ));
        }

        Ok(())
    }
}

/// Builder for CpiConfig
pub struct CpiConfigBuilder {
    config: CpiConfig,
}

impl CpiConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: CpiConfig::default(),
        }
    }

    pub fn nodes(mut self, nodes: NodesConfig) -> Self {
        self.config.nodes = nodes;
        self
    }

    pub fn ip_families(mut self, families: Vec<IpFamily>) -> Self {
        self.config.nodes.ip_families = families;
        self
    }

    pub fn labels(mut self, zone: impl Into<String>, region: impl Into<String>) -> Self {
        self.config.labels = LabelsConfig {
            zone: Some(zone.into()),
            region: Some(region.into()),
        };
        self
    }

    pub fn discovery_timeout(mut self, timeout: Duration) -> Self {
        self.config.discovery.timeout = timeout;
        self
    }

    pub fn build(self) -> CpiResult<CpiConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for CpiConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn env_var(suffix: &str) -> Option<String> {
    std::env::var(format!("{}{}", ENV_PREFIX, suffix))
        .ok()
        .filter(|v| !v.is_empty())
}
