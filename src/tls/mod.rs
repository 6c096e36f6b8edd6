//! TLS trust configuration.
//!
//! Transport security itself is handled by the engine; this module only
//! decides which CA bundle each handle starts with.

pub mod cabundle;

pub use cabundle::{resolve as resolve_ca_bundle, CA_BUNDLE_ENV, WELL_KNOWN_BUNDLES};
