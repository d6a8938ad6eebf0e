//! Default configuration values
//!
//! This module centralizes all default values to make them easy to find and modify.

use std::time::Duration;

// Discovery defaults
pub const DEFAULT_DISCOVERY_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_PROVIDER_ID_SCHEME: &str = "vsphere://";

// Extra-config keys carrying the cloud-init network plan
pub const METADATA_EXTRA_CONFIG_KEY: &str = "guestinfo.metadata";

// Logging defaults
pub const DEFAULT_LOG_LEVEL: &str = "info";

// Environment variable prefix
pub const ENV_PREFIX: &str = "VSPHERE_CPI_";

pub const fn duration_secs(secs: u64) -> Duration {
    Duration::from_secs(secs)
}
