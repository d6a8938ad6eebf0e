use anyhow::{Context, Result};
use clap::{Args, Parser};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use tracing::warn;

use vsphere_cpi_core::{
    inventory::Inventory, observability::init_tracing, uuid_codec::to_canonical, CpiConfig,
    NodeRegistry,
};

#[derive(Parser)]
#[command(name = "vsphere-cpi")]
#[command(about = "Resolve Kubernetes nodes against a vSphere inventory snapshot", long_about = None)]
struct Cli {
    /// Configuration file (TOML). Defaults plus VSPHERE_CPI_* variables when omitted
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Inventory snapshot (YAML)
    #[arg(long, global = true, default_value = "inventory.yaml")]
    inventory: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Resolve a node and print its identity and addresses
    Resolve(ResolveArgs),
    /// Print the zone and region of a node
    Zone {
        /// Node name
        #[arg(long)]
        name: String,
    },
    /// Discover every VM in the inventory and print the node cache
    Export {
        #[arg(long)]
        tenant: Option<String>,
        #[arg(long)]
        datacenter: Option<String>,
    },
    /// Convert a UUID between Kubernetes and vSphere byte order
    Uuid {
        id: String,
    },
}

#[derive(Args)]
#[group(required = true, multiple = false)]
struct ResolveArgs {
    /// Node name, VM name or guest IP
    #[arg(long)]
    name: Option<String>,

    /// BIOS UUID in either byte order
    #[arg(long)]
    uuid: Option<String>,

    /// Provider ID (vsphere://<uuid>)
    #[arg(long)]
    provider_id: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref())?;
    init_tracing(&config.logging.level);

    let output = run(cli.command, &config, &cli.inventory).await?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<CpiConfig> {
    match path {
        Some(path) => CpiConfig::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => CpiConfig::from_env().context("Invalid VSPHERE_CPI_* environment"),
    }
}

fn load_inventory(path: &Path) -> Result<Inventory> {
    Inventory::from_yaml_file(path)
        .with_context(|| format!("Failed to load inventory from {}", path.display()))
}

/// Registry over the inventory snapshot, plus the BIOS UUID of every VM in it
fn open_registry(config: &CpiConfig, inventory_path: &Path) -> Result<(NodeRegistry, Vec<String>)> {
    let inventory = load_inventory(inventory_path)?;
    let vm_uuids = inventory
        .tenants
        .iter()
        .flat_map(|t| t.datacenters.iter())
        .flat_map(|dc| dc.vms.iter())
        .map(|vm| vm.uuid.clone())
        .collect();
    Ok((NodeRegistry::new(inventory.into_tenants(), config), vm_uuids))
}

async fn run(command: Commands, config: &CpiConfig, inventory_path: &Path) -> Result<Value> {
    match command {
        Commands::Uuid { id } => Ok(json!({
            "converted": to_canonical(&id),
            "input": id,
        })),
        Commands::Resolve(args) => {
            let (registry, _) = open_registry(config, inventory_path)?;
            let node = if let Some(name) = args.name {
                registry.resolve_by_name(&name).await?
            } else if let Some(uuid) = args.uuid {
                registry.resolve_by_uuid(&uuid).await?
            } else if let Some(provider_id) = args.provider_id {
                registry.resolve_by_provider_id(&provider_id).await?
            } else {
                anyhow::bail!("one of --name, --uuid or --provider-id is required");
            };
            Ok(serde_json::to_value(node)?)
        }
        Commands::Zone { name } => {
            let (registry, _) = open_registry(config, inventory_path)?;
            let node = registry.resolve_by_name(&name).await?;
            let zone = registry.resolve_zone(&node).await?;
            Ok(json!({
                "node": node.node_name,
                "failure_domain": zone.failure_domain,
                "region": zone.region,
            }))
        }
        Commands::Export { tenant, datacenter } => {
            let (registry, vm_uuids) = open_registry(config, inventory_path)?;
            for uuid in &vm_uuids {
                if let Err(e) = registry.resolve_by_uuid(uuid).await {
                    warn!(uuid = %uuid, error = %e, "Skipping VM that failed discovery");
                }
            }
            Ok(registry.export_nodes(tenant.as_deref(), datacenter.as_deref())?)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const INVENTORY: &str = r#"
tenants:
  - name: vc1
    datacenters:
      - name: dc1
        vms:
          - reference: vm-101
            name: worker-1
            uuid: 422e4956-ad22-1139-6d72-59cc8f26bc90
            guest:
              host_name: worker-1
              nets:
                - network: VM Network
                  ip_addresses: ["10.0.0.5"]
                  device_config_id: 4000
            hardware:
              num_cpu: 4
              memory_mb: 8192
              guest_id: ubuntu64Guest
            ancestors:
              - kind: host
                reference: host-12
                tags:
                  - { name: zone-a, category: k8s-zone }
                  - { name: region-1, category: k8s-region }
      - name: dc2
        vms:
          - reference: vm-202
            name: worker-2
            uuid: 4237a1b2-c3d4-e5f6-0718-293a4b5c6d7e
            guest:
              host_name: worker-2
              nets:
                - network: VM Network
                  ip_addresses: ["10.0.1.5"]
                  device_config_id: 4000
"#;

    fn inventory_file() -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(INVENTORY.as_bytes()).unwrap();
        file
    }

    fn parse(args: &[&str]) -> Commands {
        Cli::try_parse_from(args).unwrap().command
    }

    #[test]
    fn test_resolve_requires_exactly_one_target() {
        assert!(Cli::try_parse_from(["vsphere-cpi", "resolve"]).is_err());
        assert!(
            Cli::try_parse_from(["vsphere-cpi", "resolve", "--name", "a", "--uuid", "b"]).is_err()
        );
        assert!(Cli::try_parse_from(["vsphere-cpi", "resolve", "--provider-id", "vsphere://x"]).is_ok());
    }

    #[tokio::test]
    async fn test_uuid_command_needs_no_inventory() {
        let output = run(
            parse(&["vsphere-cpi", "uuid", "56492e42-22ad-3911-6d72-59cc8f26bc90"]),
            &CpiConfig::default(),
            Path::new("/nonexistent/inventory.yaml"),
        )
        .await
        .unwrap();

        assert_eq!(output["converted"], "422e4956-ad22-1139-6d72-59cc8f26bc90");
    }

    #[tokio::test]
    async fn test_resolve_by_provider_id() {
        let file = inventory_file();
        let output = run(
            parse(&[
                "vsphere-cpi",
                "resolve",
                "--provider-id",
                "vsphere://422E4956-AD22-1139-6D72-59CC8F26BC90",
            ]),
            &CpiConfig::default(),
            file.path(),
        )
        .await
        .unwrap();

        assert_eq!(output["node_name"], "worker-1");
        assert_eq!(output["instance_type"], "vsphere-vm.cpu-4.mem-8gb.os-ubuntu");
    }

    #[tokio::test]
    async fn test_zone_command() {
        let file = inventory_file();
        let mut config = CpiConfig::default();
        config.labels.zone = Some("k8s-zone".to_string());
        config.labels.region = Some("k8s-region".to_string());

        let output = run(
            parse(&["vsphere-cpi", "zone", "--name", "worker-1"]),
            &config,
            file.path(),
        )
        .await
        .unwrap();

        assert_eq!(output["failure_domain"], "zone-a");
        assert_eq!(output["region"], "region-1");
    }

    #[tokio::test]
    async fn test_export_scoped_to_datacenter() {
        let file = inventory_file();
        let output = run(
            parse(&["vsphere-cpi", "export", "--datacenter", "dc2"]),
            &CpiConfig::default(),
            file.path(),
        )
        .await
        .unwrap();

        let nodes = output.as_array().unwrap();
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0]["node_name"], "worker-2");
    }

    #[tokio::test]
    async fn test_unknown_node_is_an_error() {
        let file = inventory_file();
        let result = run(
            parse(&["vsphere-cpi", "resolve", "--name", "worker-9"]),
            &CpiConfig::default(),
            file.path(),
        )
        .await;

        assert!(result.is_err());
    }
}
