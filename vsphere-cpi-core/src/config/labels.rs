//! Topology label configuration

use serde::{Deserialize, Serialize};

/// Tag categories that carry the failure domain and region of a host
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelsConfig {
    /// Tag category whose tags name the failure domain (zone)
    pub zone: Option<String>,

    /// Tag category whose tags name the region
    pub region: Option<String>,
}

impl LabelsConfig {
    /// Both categories are configured and non-empty
    pub fn is_enabled(&self) -> bool {
        let set = |c: &Option<String>| c.as_deref().is_some_and(|c| !c.is_empty());
        set(&self.zone) && set(&self.region)
    }
}
