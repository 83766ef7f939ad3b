//! relsign - release archive signing
//!
//! Command-line front end for `relsign-core`. Flags mirror the fields of
//! [`SignConfig`] and can also be set through `RELSIGN_*` environment
//! variables.

#![allow(clippy::missing_errors_doc)]

pub mod cmd;

use clap::{Args, Parser, Subcommand};
use relsign_core::SignConfig;
use std::path::PathBuf;
use std::time::Duration;

/// Top-level arguments.
#[derive(Debug, Parser)]
#[command(name = "relsign")]
#[command(author, version, about = "relsign - sign and repackage toolchain release archives")]
pub struct Cli {
    /// Only log warnings and errors
    #[arg(long, short, global = true, env = "RELSIGN_QUIET")]
    pub quiet: bool,

    /// Command to run
    #[command(subcommand)]
    pub command: Commands,
}

/// Subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Sign release archives and publish them with signatures and checksums
    Sign(SignArgs),
    /// Write a `.sha256` sidecar next to each file
    Checksum {
        /// Files to hash
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

/// Arguments of `relsign sign`.
#[derive(Debug, Args)]
pub struct SignArgs {
    /// Glob selecting the archives to sign
    #[arg(long = "files", env = "RELSIGN_FILES", default_value = "eng/signing/tosign/*")]
    pub files_glob: String,

    /// Directory that receives signed archives, signatures and checksums
    #[arg(long, env = "RELSIGN_DESTINATION_DIR", default_value = "eng/signing/signed")]
    pub destination_dir: PathBuf,

    /// Scratch directory for intermediate files
    #[arg(long, env = "RELSIGN_TEMP_DIR", default_value = "eng/signing/signing-temp")]
    pub temp_dir: PathBuf,

    /// Directory containing Sign.csproj
    #[arg(long, env = "RELSIGN_SIGNING_CSPROJ_DIR", default_value = "eng/signing")]
    pub signing_csproj_dir: PathBuf,

    /// Signing mode passed to the signing project (test or real)
    #[arg(long, env = "RELSIGN_SIGN_TYPE", default_value = "test")]
    pub sign_type: String,

    /// Run the notarization phase
    #[arg(long, env = "RELSIGN_NOTARIZE")]
    pub notarize: bool,

    /// Log what would be signed without calling the signer
    #[arg(long, short = 'n', env = "RELSIGN_DRY_RUN")]
    pub dry_run: bool,

    /// Give up after this many seconds (0 = no limit)
    #[arg(long, env = "RELSIGN_TIMEOUT_SECS", default_value_t = 0)]
    pub timeout_secs: u64,
}

impl SignArgs {
    /// Build the run configuration.
    pub fn to_config(&self) -> SignConfig {
        SignConfig {
            files_glob: self.files_glob.clone(),
            destination_dir: self.destination_dir.clone(),
            temp_dir: self.temp_dir.clone(),
            signing_project_dir: self.signing_csproj_dir.clone(),
            sign_type: self.sign_type.clone(),
            notarize: self.notarize,
            dry_run: self.dry_run,
            timeout: (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn sign_defaults_match_config_defaults() {
        let cli = Cli::parse_from(["relsign", "sign"]);
        let Commands::Sign(args) = cli.command else {
            panic!("expected sign");
        };
        assert_eq!(args.to_config(), SignConfig::default());
    }

    #[test]
    fn sign_flags_fill_config() {
        let cli = Cli::parse_from([
            "relsign",
            "sign",
            "--files",
            "out/*",
            "--sign-type",
            "real",
            "--notarize",
            "-n",
            "--timeout-secs",
            "90",
        ]);
        let Commands::Sign(args) = cli.command else {
            panic!("expected sign");
        };
        let config = args.to_config();
        assert_eq!(config.files_glob, "out/*");
        assert_eq!(config.sign_type, "real");
        assert!(config.notarize);
        assert!(config.dry_run);
        assert_eq!(config.timeout, Some(Duration::from_secs(90)));
    }

    #[test]
    fn checksum_requires_files() {
        assert!(Cli::try_parse_from(["relsign", "checksum"]).is_err());
    }
}
