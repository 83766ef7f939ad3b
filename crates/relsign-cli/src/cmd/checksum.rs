//! Checksum command

use anyhow::{Context, Result};
use std::path::PathBuf;

/// Write `<file>.sha256` for each file
pub fn checksum(files: &[PathBuf]) -> Result<()> {
    for file in files {
        let (sidecar, digest) = relsign_core::write_checksum_file(file)
            .with_context(|| format!("failed to checksum {}", file.display()))?;
        println!("{digest}  {}", sidecar.display());
    }
    Ok(())
}
