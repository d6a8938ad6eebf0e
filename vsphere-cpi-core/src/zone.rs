//! Zone and region resolution from vSphere tags
//!
//! The failure domain and region of a node come from tags attached to the
//! ancestors of the host running its VM. The walk starts at the host and
//! moves up through the cluster, datacenter and folders; the closest
//! ancestor tagged in a category wins for that category.

use tracing::{debug, instrument};

use crate::config::LabelsConfig;
use crate::error::{CpiError, CpiResult};
use crate::locator::TagLookup;
use crate::types::{NodeInfo, Zone};

pub struct ZoneResolver {
    zone_category: String,
    region_category: String,
}

impl ZoneResolver {
    /// `None` unless both tag categories are configured
    pub fn new(labels: &LabelsConfig) -> Option<Self> {
        if !labels.is_enabled() {
            return None;
        }
        Some(Self {
            zone_category: labels.zone.clone().unwrap_or_default(),
            region_category: labels.region.clone().unwrap_or_default(),
        })
    }

    #[instrument(skip(self, tags, node), fields(node = %node.node_name, vm = %node.vm))]
    pub async fn resolve(&self, tags: &dyn TagLookup, node: &NodeInfo) -> CpiResult<Zone> {
        let ancestors = tags.host_ancestors(&node.vm).await?;

        let mut failure_domain: Option<String> = None;
        let mut region: Option<String> = None;

        for ancestor in &ancestors {
            if failure_domain.is_some() && region.is_some() {
                break;
            }

            for tag in tags.attached_tags(ancestor).await? {
                if failure_domain.is_none() && tag.category == self.zone_category {
                    debug!(ancestor = %ancestor.reference, zone = %tag.name, "Found zone tag");
                    failure_domain = Some(tag.name.clone());
                }
                if region.is_none() && tag.category == self.region_category {
                    debug!(ancestor = %ancestor.reference, region = %tag.name, "Found region tag");
                    region = Some(tag.name);
                }
            }
        }

        let failure_domain = failure_domain.ok_or_else(|| CpiError::TopologyCategoryMissing {
            vm: node.vm.to_string(),
            kind: "zone".to_string(),
            category: self.zone_category.clone(),
        })?;
        let region = region.ok_or_else(|| CpiError::TopologyCategoryMissing {
            vm: node.vm.to_string(),
            kind: "region".to_string(),
            category: self.region_category.clone(),
        })?;

        Ok(Zone {
            failure_domain,
            region,
        })
    }
}
