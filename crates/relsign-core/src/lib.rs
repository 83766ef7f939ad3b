//! Archive signing and repackaging for toolchain release artifacts.
//!
//! Discovers release archives, extracts the entries that need platform
//! signatures, submits them to an external signer in one batch per phase,
//! rebuilds each archive around the signed content, and publishes the
//! results with detached signatures and checksum sidecars.
//!
//! ```no_run
//! use relsign_core::{Cancellation, MsBuildSigner, Pipeline, SignConfig};
//!
//! let config = SignConfig::default();
//! let signer = MsBuildSigner::from_config(&config)?;
//! let report = Pipeline::new(config, signer).run(&Cancellation::none())?;
//! println!("published {} archives", report.published.len());
//! # Ok::<(), relsign_core::SignError>(())
//! ```

pub mod archive;
pub mod batch;
pub mod cancel;
pub mod checksum;
pub mod config;
pub mod error;
pub mod io;
pub mod signer;

pub use archive::{Archive, ArchiveKind, SigningRequest, Stage};
pub use batch::{Pipeline, Published, RunReport, discover};
pub use cancel::Cancellation;
pub use checksum::{sha256_file, write_checksum_file};
pub use config::SignConfig;
pub use error::{CancelReason, Result, SignError};
pub use signer::{MsBuildSigner, Signer};
