//! Trust-root (CA bundle) resolution.
//!
//! Evaluated on every handle creation and reset, in order:
//! 1. `CURLNET_CA_BUNDLE`
//! 2. `CURL_CA_BUNDLE`
//! 3. `SSL_CERT_FILE`
//! 4. the first readable well-known bundle path for the OS
//!
//! Environment values are used only when non-empty and readable. When
//! nothing matches, the engine's built-in default stays in effect.

use std::env;
use std::fs::File;
use std::path::{Path, PathBuf};

/// Environment variables consulted, in priority order.
pub const CA_BUNDLE_ENV: [&str; 3] = ["CURLNET_CA_BUNDLE", "CURL_CA_BUNDLE", "SSL_CERT_FILE"];

/// Well-known bundle locations, in priority order.
#[cfg(target_os = "macos")]
pub const WELL_KNOWN_BUNDLES: &[&str] = &["/etc/ssl/cert.pem"];

#[cfg(all(unix, not(target_os = "macos")))]
pub const WELL_KNOWN_BUNDLES: &[&str] = &[
    "/etc/ssl/cert.pem",
    // Debian/Ubuntu
    "/etc/ssl/certs/ca-certificates.crt",
    // RHEL/Fedora
    "/etc/pki/tls/certs/ca-bundle.crt",
    // SLES/openSUSE
    "/etc/ssl/ca-bundle.pem",
];

#[cfg(not(unix))]
pub const WELL_KNOWN_BUNDLES: &[&str] = &[];

/// Resolve the bundle from the process environment and file system.
pub fn resolve() -> Option<PathBuf> {
    resolve_with(|name| env::var_os(name).map(PathBuf::from), WELL_KNOWN_BUNDLES)
}

/// Resolve with an explicit variable lookup and candidate list.
pub fn resolve_with<F>(lookup: F, candidates: &[&str]) -> Option<PathBuf>
where
    F: Fn(&str) -> Option<PathBuf>,
{
    CA_BUNDLE_ENV
        .iter()
        .filter_map(|name| lookup(*name))
        .find(|path| !path.as_os_str().is_empty() && is_readable(path))
        .or_else(|| {
            candidates
                .iter()
                .map(PathBuf::from)
                .find(|path| is_readable(path))
        })
}

fn is_readable(path: &Path) -> bool {
    path.is_file() && File::open(path).is_ok()
}
