//! Phases, signing profiles and archive formats.

use serde::{Deserialize, Serialize};

/// One of the ordered stages of a signing run.
///
/// Every archive completes a phase before any archive moves to the next one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    /// Sign individual entries extracted from each archive.
    #[serde(rename = "1-Individual")]
    Entries,
    /// Notarize platform archives (currently never produces requests).
    #[serde(rename = "2-Notarize")]
    Notarize,
    /// Produce a detached signature for each whole archive.
    #[serde(rename = "3-Sigs")]
    Signatures,
}

impl Phase {
    /// Stable step name, used in file names handed to the signer.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Entries => "1-Individual",
            Self::Notarize => "2-Notarize",
            Self::Signatures => "3-Sigs",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Signing identity requested for a file, passed to the signer verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SigningProfile {
    /// Authenticode signing for Windows native executables.
    #[serde(rename = "Microsoft400")]
    WindowsExecutable,
    /// macOS hardening of binaries submitted inside a zip bundle.
    #[serde(rename = "MacDeveloperHarden")]
    MacHarden,
    /// Detached signature over a whole release archive.
    #[serde(rename = "LinuxSignManagedLanguageCompiler")]
    DetachedSignature,
}

impl SigningProfile {
    /// The identifier understood by the signing service.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::WindowsExecutable => "Microsoft400",
            Self::MacHarden => "MacDeveloperHarden",
            Self::DetachedSignature => "LinuxSignManagedLanguageCompiler",
        }
    }
}

impl std::fmt::Display for SigningProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Container format of a release archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArchiveFormat {
    /// A zip archive (Windows releases).
    Zip,
    /// A gzip-compressed tar archive (macOS and Linux releases).
    TarGz,
}

impl std::fmt::Display for ArchiveFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Zip => f.write_str("zip"),
            Self::TarGz => f.write_str("tar.gz"),
        }
    }
}
