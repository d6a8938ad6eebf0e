use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use std::io::Write;
use std::time::Duration;
use tempfile::NamedTempFile;
use vsphere_cpi_core::{
    config::{CpiConfig, CpiConfigBuilder, IpFamily},
    CpiError,
};

/// Loading from a file applies `VSPHERE_CPI_*` overrides, so every test that
/// loads or sets them holds this lock
static ENV_LOCK: Mutex<()> = parking_lot::const_mutex(());

/// Sets environment variables and removes them again on drop
struct EnvVars(Vec<&'static str>);

impl EnvVars {
    fn set(vars: &[(&'static str, &str)]) -> Self {
        for (key, value) in vars {
            std::env::set_var(key, value);
        }
        Self(vars.iter().map(|(key, _)| *key).collect())
    }
}

impl Drop for EnvVars {
    fn drop(&mut self) {
        for key in &self.0 {
            std::env::remove_var(key);
        }
    }
}

#[test]
fn test_default_config() {
    let config = CpiConfig::default();

    assert_eq!(config.nodes.ip_families, vec![IpFamily::Ipv4]);
    assert!(config.nodes.internal_subnets.is_empty());
    assert!(!config.labels.is_enabled());
    assert_eq!(config.discovery.timeout, Duration::from_secs(60));
    assert_eq!(config.discovery.provider_id_scheme, "vsphere://");
    assert_eq!(config.logging.level, "info");
}

#[test]
fn test_config_builder() {
    let config = CpiConfigBuilder::new()
        .ip_families(vec![IpFamily::Ipv6, IpFamily::Ipv4])
        .labels("k8s-zone", "k8s-region")
        .discovery_timeout(Duration::from_secs(5))
        .build()
        .unwrap();

    assert_eq!(config.nodes.ip_families, vec![IpFamily::Ipv6, IpFamily::Ipv4]);
    assert!(config.labels.is_enabled());
    assert_eq!(config.discovery.timeout, Duration::from_secs(5));
}

#[test]
fn test_builder_rejects_invalid_config() {
    let result = CpiConfigBuilder::new().ip_families(vec![]).build();
    assert!(matches!(result, Err(CpiError::ConfigurationError { .. })));

    let result = CpiConfigBuilder::new()
        .discovery_timeout(Duration::ZERO)
        .build();
    assert!(matches!(result, Err(CpiError::ConfigurationError { .. })));
}

#[test]
fn test_load_from_toml() {
    let toml_content = r#"
[nodes]
ip_families = ["ipv6", "ipv4"]
internal_subnets = ["10.0.0.0/16", "fd00::/64"]
exclude_internal_subnets = ["10.0.9.0/24"]
internal_network_name = "mgmt"
external_network_name = "public"

[labels]
zone = "k8s-zone"
region = "k8s-region"

[discovery]
timeout = "30s"

[logging]
level = "debug"
"#;

    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(toml_content.as_bytes()).unwrap();

    let _env = ENV_LOCK.lock();
    let config = CpiConfig::from_file(temp_file.path()).unwrap();

    assert_eq!(config.nodes.ip_families, vec![IpFamily::Ipv6, IpFamily::Ipv4]);
    assert_eq!(config.nodes.internal_subnets.len(), 2);
    assert_eq!(
        config.nodes.exclude_internal_subnets[0].to_string(),
        "10.0.9.0/24"
    );
    assert_eq!(config.nodes.internal_network_name.as_deref(), Some("mgmt"));
    assert_eq!(config.labels.zone.as_deref(), Some("k8s-zone"));
    assert_eq!(config.discovery.timeout, Duration::from_secs(30));
    // Unset fields keep their defaults
    assert_eq!(config.discovery.provider_id_scheme, "vsphere://");
    assert_eq!(config.logging.level, "debug");
}

#[test]
fn test_invalid_toml_values_rejected() {
    let cases = [
        "[nodes]\ninternal_subnets = [\"10.0.0.0/33\"]\n",
        "[nodes]\nip_families = [\"ipx\"]\n",
        "[discovery]\ntimeout = \"soon\"\n",
    ];

    let _env = ENV_LOCK.lock();
    for contents in cases {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(contents.as_bytes()).unwrap();
        assert!(
            CpiConfig::from_file(temp_file.path()).is_err(),
            "accepted {:?}",
            contents
        );
    }
}

#[test]
fn test_missing_file() {
    let _env = ENV_LOCK.lock();
    let err = CpiConfig::from_file("/nonexistent/vsphere-cpi.toml").unwrap_err();
    assert!(matches!(err, CpiError::ConfigurationError { .. }));
}

#[test]
fn test_env_overrides() {
    let _env = ENV_LOCK.lock();
    let _vars = EnvVars::set(&[
        ("VSPHERE_CPI_IP_FAMILY", "ipv6, ipv4"),
        ("VSPHERE_CPI_INTERNAL_SUBNETS", "10.0.0.0/24,fd00::/64"),
        ("VSPHERE_CPI_DISCOVERY_TIMEOUT_SECS", "15"),
    ]);

    let config = CpiConfig::from_env().unwrap();

    assert_eq!(config.nodes.ip_families, vec![IpFamily::Ipv6, IpFamily::Ipv4]);
    let subnets: Vec<String> = config
        .nodes
        .internal_subnets
        .iter()
        .map(|net| net.to_string())
        .collect();
    assert_eq!(subnets, vec!["10.0.0.0/24", "fd00::/64"]);
    assert_eq!(config.discovery.timeout, Duration::from_secs(15));
    assert_eq!(config.logging.level, "info");
}

#[test]
fn test_env_overrides_file_values() {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file
        .write_all(b"[discovery]\ntimeout = \"30s\"\n\n[labels]\nzone = \"k8s-zone\"\n")
        .unwrap();

    let _env = ENV_LOCK.lock();
    let _vars = EnvVars::set(&[
        ("VSPHERE_CPI_DISCOVERY_TIMEOUT_SECS", "5"),
        ("VSPHERE_CPI_REGION_CATEGORY", "k8s-region"),
    ]);

    let config = CpiConfig::from_file(temp_file.path()).unwrap();

    assert_eq!(config.discovery.timeout, Duration::from_secs(5));
    assert_eq!(config.labels.zone.as_deref(), Some("k8s-zone"));
    assert_eq!(config.labels.region.as_deref(), Some("k8s-region"));
}

#[test]
fn test_invalid_env_values_rejected() {
    let _env = ENV_LOCK.lock();
    let cases = [
        ("VSPHERE_CPI_IP_FAMILY", "ipv5"),
        ("VSPHERE_CPI_INTERNAL_SUBNETS", "10.0.0.0/24,not-a-cidr"),
        ("VSPHERE_CPI_DISCOVERY_TIMEOUT_SECS", "soon"),
        ("VSPHERE_CPI_DISCOVERY_TIMEOUT_SECS", "0"),
    ];

    for (key, value) in cases {
        let _vars = EnvVars::set(&[(key, value)]);
        let result = CpiConfig::from_env();
        assert!(
            matches!(result, Err(CpiError::ConfigurationError { .. })),
            "{}={} gave {:?}",
            key,
            value,
            result
        );
    }
}
