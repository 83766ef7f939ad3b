//! Archive entry primitives
//!
//! Safe iteration and construction for zip and tar.gz containers. Every
//! iterator rejects entries whose names escape the container root and checks
//! the cancellation signal before handing each entry to the visitor.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Seek, Write};
use std::path::Path;

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use zip::{ZipArchive, ZipWriter};

use crate::cancel::Cancellation;
use crate::error::{IoContext, Result, SignError, ZipContext};
use crate::io::fs::create_parent;

/// Zip archive opened from disk.
pub type ZipReader = ZipArchive<BufReader<File>>;

/// Zip archive being written to disk.
pub type ZipOut = ZipWriter<BufWriter<File>>;

/// tar.gz archive opened from disk.
pub type TarGzReader = tar::Archive<GzDecoder<BufReader<File>>>;

/// tar.gz archive being written to disk.
pub type TarGzOut = tar::Builder<GzEncoder<BufWriter<File>>>;

/// Whether `name` stays inside its root: non-empty, relative, and never
/// climbing above the root through `..` segments.
///
/// Both `/` and `\` count as separators, and drive-qualified names such as
/// `C:foo` are rejected, so a name that is unsafe on any host is refused.
///
/// ```
/// use relsign_core::io::entries::is_local;
///
/// assert!(is_local("go/bin/go.exe"));
/// assert!(is_local("go/../go/bin"));
/// assert!(!is_local("../etc/passwd"));
/// assert!(!is_local("/etc/passwd"));
/// assert!(!is_local(""));
/// ```
pub fn is_local(name: &str) -> bool {
    if name.is_empty() || name.starts_with('/') || name.starts_with('\\') {
        return false;
    }
    let bytes = name.as_bytes();
    if bytes.len() >= 2 && bytes[1] == b':' && bytes[0].is_ascii_alphabetic() {
        return false;
    }

    let mut depth: i64 = 0;
    for segment in name.split(['/', '\\']) {
        match segment {
            "" | "." => {}
            ".." => {
                depth -= 1;
                if depth < 0 {
                    return false;
                }
            }
            _ => depth += 1,
        }
    }
    true
}

/// Position and name of one zip entry, handed to zip visitors.
#[derive(Debug, Clone)]
pub struct ZipEntryRef {
    /// Index into the central directory.
    pub index: usize,
    /// Entry name as stored in the archive.
    pub name: String,
}

/// Open a zip archive for reading.
pub fn open_zip(path: &Path) -> Result<ZipReader> {
    let file = File::open(path).at(path)?;
    ZipArchive::new(BufReader::new(file)).at(path)
}

/// Open a tar.gz archive for reading.
pub fn open_tar_gz(path: &Path) -> Result<TarGzReader> {
    let file = File::open(path).at(path)?;
    Ok(tar::Archive::new(GzDecoder::new(BufReader::new(file))))
}

/// Visit every entry of `archive` in central-directory order.
///
/// The visitor receives the archive itself so it can open the entry (or any
/// other entry) by index.
///
/// # Errors
///
/// Stops at the first non-local entry name ([`SignError::UnsafePath`]), the
/// first cancellation, or the first visitor error.
pub fn for_each_zip_entry<R, F>(
    archive: &mut ZipArchive<R>,
    archive_path: &Path,
    cancel: &Cancellation,
    mut visit: F,
) -> Result<()>
where
    R: Read + Seek,
    F: FnMut(&mut ZipArchive<R>, &ZipEntryRef) -> Result<()>,
{
    for index in 0..archive.len() {
        cancel.check()?;
        let name = archive
            .name_for_index(index)
            .map(str::to_owned)
            .ok_or_else(|| {
                SignError::zip(archive_path, zip::result::ZipError::FileNotFound)
            })?;
        if !is_local(&name) {
            return Err(SignError::UnsafePath {
                archive: archive_path.to_path_buf(),
                entry: name,
            });
        }
        visit(archive, &ZipEntryRef { index, name })?;
    }
    Ok(())
}

/// Visit every entry of a tar stream in order.
///
/// The visitor receives the entry (a reader scoped to exactly that entry's
/// bytes, with its header) and the entry's full name.
///
/// # Errors
///
/// Stops at the first non-local entry name ([`SignError::UnsafePath`]), the
/// first cancellation, the first malformed header, or the first visitor error.
pub fn for_each_tar_entry<R, F>(
    archive: &mut tar::Archive<R>,
    archive_path: &Path,
    cancel: &Cancellation,
    mut visit: F,
) -> Result<()>
where
    R: Read,
    F: FnMut(&mut tar::Entry<'_, R>, &str) -> Result<()>,
{
    for entry in archive.entries().at(archive_path)? {
        cancel.check()?;
        let mut entry = entry.at(archive_path)?;
        let name = String::from_utf8_lossy(&entry.path_bytes()).into_owned();
        if !is_local(&name) {
            return Err(SignError::UnsafePath {
                archive: archive_path.to_path_buf(),
                entry: name,
            });
        }
        visit(&mut entry, &name)?;
    }
    Ok(())
}

/// Create `path` (and its parent directories) and hand the file to `f`.
///
/// The file is flushed even when `f` fails; the first error wins. A partial
/// file is left on disk for the caller to deal with.
pub fn with_file_create<T, F>(path: &Path, f: F) -> Result<T>
where
    F: FnOnce(&mut BufWriter<File>) -> Result<T>,
{
    create_parent(path)?;
    let file = File::create(path).at(path)?;
    let mut out = BufWriter::new(file);
    let result = f(&mut out);
    let closed = out.flush().at(path);
    let value = result?;
    closed?;
    Ok(value)
}

/// Create a zip archive at `path` and hand its writer to `f`.
///
/// The central directory is written even when `f` fails; the first error wins.
pub fn with_zip_create<T, F>(path: &Path, f: F) -> Result<T>
where
    F: FnOnce(&mut ZipOut) -> Result<T>,
{
    create_parent(path)?;
    let file = File::create(path).at(path)?;
    let mut writer = ZipWriter::new(BufWriter::new(file));
    let result = f(&mut writer);
    let closed = writer
        .finish()
        .at(path)
        .and_then(|mut out| out.flush().at(path));
    let value = result?;
    closed?;
    Ok(value)
}

/// Create a tar.gz archive at `path` (best compression) and hand its builder
/// to `f`.
///
/// The tar trailer and gzip footer are written even when `f` fails; the first
/// error wins.
pub fn with_tar_gz_create<T, F>(path: &Path, f: F) -> Result<T>
where
    F: FnOnce(&mut TarGzOut) -> Result<T>,
{
    create_parent(path)?;
    let file = File::create(path).at(path)?;
    let encoder = GzEncoder::new(BufWriter::new(file), Compression::best());
    let mut builder = tar::Builder::new(encoder);
    let result = f(&mut builder);
    let closed = builder
        .into_inner()
        .and_then(GzEncoder::finish)
        .and_then(|mut out| out.flush())
        .at(path);
    let value = result?;
    closed?;
    Ok(value)
}

/// A reader that remembers how many bytes passed through it.
#[derive(Debug)]
pub struct CountingReader<R> {
    inner: R,
    count: u64,
}

impl<R: Read> CountingReader<R> {
    /// Wrap `inner`.
    pub fn new(inner: R) -> Self {
        Self { inner, count: 0 }
    }

    /// Bytes read so far.
    pub fn count(&self) -> u64 {
        self.count
    }
}

impl<R: Read> Read for CountingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.count += n as u64;
        Ok(n)
    }
}
