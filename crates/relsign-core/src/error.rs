//! Error taxonomy for signing runs.
//!
//! Every variant is fatal. Nothing in this crate retries or swallows an
//! error: a half-signed release must never be resumed silently.

use relsign_schema::Phase;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Why a run stopped before finishing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    /// The configured deadline passed.
    DeadlineExceeded,
    /// Someone tripped the cancellation flag (e.g. Ctrl-C).
    Cancelled,
}

impl std::fmt::Display for CancelReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DeadlineExceeded => f.write_str("deadline exceeded"),
            Self::Cancelled => f.write_str("cancelled"),
        }
    }
}

/// Errors produced while discovering, repacking, or signing archives.
#[derive(Error, Debug)]
pub enum SignError {
    /// A discovered file matches no known archive naming pattern.
    #[error("unknown archive type: {}", path.display())]
    Classification {
        /// The file that matched no naming pattern.
        path: PathBuf,
    },

    /// A container entry resolves outside its own root.
    #[error("{} contains non-local path: {entry}", archive.display())]
    UnsafePath {
        /// Container holding the entry.
        archive: PathBuf,
        /// Offending entry name.
        entry: String,
    },

    /// Two discovered archives share a case-insensitive file name.
    #[error(
        "duplicate archive {}, already found {} (comparing lowercase filename)",
        path.display(),
        existing.display()
    )]
    DuplicateArchive {
        /// The second file seen.
        path: PathBuf,
        /// The file that claimed the name first.
        existing: PathBuf,
    },

    /// Two entries destined for one bundle share a basename.
    #[error("duplicate file name {name:?} in bundle for {}", archive.display())]
    DuplicateBundleEntry {
        /// Archive the entries were extracted from.
        archive: PathBuf,
        /// Basename seen twice.
        name: String,
    },

    /// Discovery matched nothing.
    #[error("no archives found to sign matching glob {0:?}")]
    NoArchives(String),

    /// A glob pattern failed to parse.
    #[error("invalid glob {pattern:?}: {source}")]
    Pattern {
        /// The rejected pattern.
        pattern: String,
        /// Parser error.
        #[source]
        source: glob::PatternError,
    },

    /// Filesystem failure.
    #[error("{}: {source}", path.display())]
    Io {
        /// File or directory being accessed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },

    /// Zip container failure.
    #[error("{}: {source}", path.display())]
    Zip {
        /// Zip file being read or written.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: zip::result::ZipError,
    },

    /// A tar entry body did not match its header size.
    #[error("wrote {written} bytes for {entry:?}, header declares {declared}")]
    EntrySize {
        /// Entry whose body had the wrong length.
        entry: String,
        /// Bytes actually written.
        written: u64,
        /// Size recorded in the header.
        declared: u64,
    },

    /// An entry carries metadata the zip writer cannot carry over.
    #[error("cannot reproduce metadata of {entry:?} in {}: {detail}", archive.display())]
    UnsupportedMetadata {
        /// Container holding the entry.
        archive: PathBuf,
        /// Entry name.
        entry: String,
        /// What could not be carried over.
        detail: String,
    },

    /// The external signer failed or could not be started.
    #[error("signing step {phase} failed: {message}")]
    Signer {
        /// Phase whose invocation failed.
        phase: Phase,
        /// Exit status or spawn error.
        message: String,
    },

    /// The run hit its deadline or was cancelled.
    #[error("operation aborted: {0}")]
    Cancelled(CancelReason),
}

impl SignError {
    /// Wrap an I/O error with the path it concerns.
    pub fn io(path: impl AsRef<Path>, source: io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Wrap a zip error with the path it concerns.
    pub fn zip(path: impl AsRef<Path>, source: zip::result::ZipError) -> Self {
        Self::Zip {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Whether the run stopped because it ran out of time or was cancelled,
    /// as opposed to something breaking.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled(_))
    }
}

/// Result alias used across the crate.
pub type Result<T, E = SignError> = std::result::Result<T, E>;

/// Attach a path to `io::Result` values.
pub(crate) trait IoContext<T> {
    fn at(self, path: impl AsRef<Path>) -> Result<T>;
}

impl<T> IoContext<T> for io::Result<T> {
    fn at(self, path: impl AsRef<Path>) -> Result<T> {
        self.map_err(|e| SignError::io(path, e))
    }
}

/// Attach a path to `ZipResult` values.
pub(crate) trait ZipContext<T> {
    fn at(self, path: impl AsRef<Path>) -> Result<T>;
}

impl<T> ZipContext<T> for zip::result::ZipResult<T> {
    fn at(self, path: impl AsRef<Path>) -> Result<T> {
        self.map_err(|e| SignError::zip(path, e))
    }
}
