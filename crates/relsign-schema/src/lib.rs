//! Shared types and wire format for relsign.
//!
//! The signer manifest defined here is the only data handed across the
//! process boundary to the external signing tool. Everything else in the
//! workspace builds on these types.

pub mod hash;
pub mod manifest;
pub mod types;

// Re-exports
pub use hash::*;
pub use manifest::{ManifestRecord, SigningManifest};
pub use types::*;

/// Suffix appended to an archive name for its detached signature.
pub const SIGNATURE_SUFFIX: &str = ".sig";

/// Suffix appended to a published file name for its checksum sidecar.
pub const CHECKSUM_SUFFIX: &str = ".sha256";
