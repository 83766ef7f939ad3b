//! Checksum sidecars
//!
//! Every published archive gets a `<name>.sha256` file next to it holding a
//! single `<hex>  <name>` line, the format `sha256sum -c` accepts.

use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};

use relsign_schema::{CHECKSUM_SUFFIX, Sha256Digest};
use sha2::{Digest, Sha256};

use crate::error::{IoContext, Result};

/// Compute the SHA-256 of a file (streaming).
///
/// # Errors
///
/// Returns an I/O error naming `path` if the file cannot be read.
pub fn sha256_file(path: &Path) -> Result<Sha256Digest> {
    let mut file = File::open(path).at(path)?;
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 65536]; // 64KB buffer

    loop {
        let bytes_read = file.read(&mut buffer).at(path)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(Sha256Digest::from_bytes(hasher.finalize().into()))
}

/// Path of the sidecar written for `path`.
pub fn sidecar_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(CHECKSUM_SUFFIX);
    PathBuf::from(name)
}

/// Hash `path` and write its sidecar. Returns the sidecar path and digest.
///
/// # Errors
///
/// Returns an I/O error if the file cannot be read or the sidecar written.
pub fn write_checksum_file(path: &Path) -> Result<(PathBuf, Sha256Digest)> {
    let digest = sha256_file(path)?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let sidecar = sidecar_path(path);
    tracing::info!("Writing checksum file {}", sidecar.display());
    fs::write(&sidecar, digest.checksum_line(&name)).at(&sidecar)?;
    Ok((sidecar, digest))
}
