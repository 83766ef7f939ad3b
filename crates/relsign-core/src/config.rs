//! Run configuration
//!
//! Plain data assembled by the CLI from flags and `RELSIGN_*` environment
//! variables. Defaults match the repository layout the signing project
//! expects.

use std::path::PathBuf;
use std::time::Duration;

/// Settings for one signing run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignConfig {
    /// Glob selecting the archives to sign.
    pub files_glob: String,
    /// Directory that receives finished archives, signatures and checksums.
    pub destination_dir: PathBuf,
    /// Scratch root; each archive gets its own `sign-work-<name>` below it.
    pub temp_dir: PathBuf,
    /// Directory holding `Sign.csproj`.
    pub signing_project_dir: PathBuf,
    /// Signing mode passed to the signer verbatim (`test` or `real`).
    pub sign_type: String,
    /// Run the notarization phase.
    pub notarize: bool,
    /// Skip signer invocations; local extraction and repacking still run.
    pub dry_run: bool,
    /// Overall deadline. `None` means no deadline.
    pub timeout: Option<Duration>,
}

impl Default for SignConfig {
    fn default() -> Self {
        Self {
            files_glob: "eng/signing/tosign/*".to_string(),
            destination_dir: PathBuf::from("eng/signing/signed"),
            temp_dir: PathBuf::from("eng/signing/signing-temp"),
            signing_project_dir: PathBuf::from("eng/signing"),
            sign_type: "test".to_string(),
            notarize: false,
            dry_run: false,
            timeout: None,
        }
    }
}
