//! Plain file helpers shared by the archive model and the orchestrator.

use std::fs::{self, File};
use std::io::{self, BufWriter, Read, Write};
use std::path::Path;

use crate::error::{IoContext, Result};

/// Create the parent directory of `path` if it has one.
pub fn create_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).at(parent)?;
    }
    Ok(())
}

/// Stream `reader` into a new file at `path`, creating parent directories.
///
/// Returns the number of bytes written.
pub fn copy_to_file(path: &Path, reader: &mut dyn Read) -> Result<u64> {
    create_parent(path)?;
    let file = File::create(path).at(path)?;
    let mut out = BufWriter::new(file);
    let written = io::copy(reader, &mut out).at(path)?;
    out.flush().at(path)?;
    Ok(written)
}

/// Copy `src` to `dst`, creating `dst`'s parent directories.
pub fn copy_file(dst: &Path, src: &Path) -> Result<u64> {
    let mut input = File::open(src).at(src)?;
    copy_to_file(dst, &mut input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copy_file_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src.bin");
        fs::write(&src, b"payload").unwrap();

        let dst = dir.path().join("a/b/c/dst.bin");
        let n = copy_file(&dst, &src).unwrap();

        assert_eq!(n, 7);
        assert_eq!(fs::read(&dst).unwrap(), b"payload");
    }

    #[test]
    fn missing_source_names_path() {
        let dir = tempfile::tempdir().unwrap();
        let err = copy_file(&dir.path().join("out"), &dir.path().join("absent")).unwrap_err();
        assert!(err.to_string().contains("absent"));
    }
}
