//! Logging setup
//!
//! The core logs through `tracing`; binaries call [`init_tracing`] once at
//! startup to install a subscriber.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Initialize tracing.
///
/// `RUST_LOG` takes precedence; otherwise `level` applies to this workspace's
/// crates and everything else logs at `warn`.
pub fn init_tracing(level: &str) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "warn,vsphere_cpi_core={level},vsphere_cpi={level}",
            level = level
        ))
    });

    let fmt_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    // A subscriber may already be installed (tests, embedding binaries)
    let _ = Registry::default()
        .with(env_filter)
        .with(fmt_layer)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        init_tracing("debug");
        init_tracing("info");
    }
}
