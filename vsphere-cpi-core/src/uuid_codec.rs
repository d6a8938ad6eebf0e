//! Conversion between orchestrator and platform UUID byte order
//!
//! Kubernetes reports the SMBIOS system UUID with its first three fields in
//! little-endian order, while vSphere stores the BIOS UUID big-endian. The
//! conversion swaps the bytes of the first three fields (8/4/4 hex digits)
//! and passes the remaining two through, so applying it twice returns the
//! original value.

use tracing::warn;

const UUID_LEN: usize = 36;

/// Swap a Kubernetes system UUID into vSphere BIOS UUID order, or back.
///
/// Inputs that are too short to be a UUID are returned unmodified.
pub fn to_canonical(id: &str) -> String {
    let id = id.trim();
    if id.len() < UUID_LEN || !id.is_ascii() {
        warn!(uuid = %id, "Invalid UUID, passing through unmodified");
        return id.to_string();
    }

    let u = &id[..UUID_LEN];
    let swapped = format!(
        "{}{}{}{}-{}{}-{}{}-{}-{}",
        &u[6..8],
        &u[4..6],
        &u[2..4],
        &u[0..2],
        &u[11..13],
        &u[9..11],
        &u[16..18],
        &u[14..16],
        &u[19..23],
        &u[24..36],
    );
    swapped.to_lowercase()
}

/// Strip a provider-ID scheme prefix (`vsphere://`) and normalise the UUID.
pub fn uuid_from_provider_id(provider_id: &str, scheme: &str) -> String {
    let trimmed = provider_id.trim();
    trimmed
        .strip_prefix(scheme)
        .unwrap_or(trimmed)
        .trim()
        .to_lowercase()
}
