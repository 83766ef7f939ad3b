//! Release archive model
//!
//! An [`Archive`] is one platform release artifact. It owns a scratch
//! directory and walks through the signing phases in a fixed order:
//!
//! ```text
//! Discovered -> entries prepared -> repacked -> [notarize] -> signature prepared -> published
//! ```
//!
//! Each step is called at most once per run, and every archive in a batch
//! finishes a step before any archive starts the next one. The batch driver
//! lives in [`crate::batch`].

use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use glob::{MatchOptions, Pattern};
use relsign_schema::{ArchiveFormat, ManifestRecord, Phase, SIGNATURE_SUFFIX, SigningProfile};
use zip::{CompressionMethod, HasZipMetadata};
use zip::write::{FullFileOptions, SimpleFileOptions};

use crate::cancel::Cancellation;
use crate::error::{IoContext, Result, SignError, ZipContext};
use crate::io::entries::{
    CountingReader, TarGzOut, ZipEntryRef, ZipOut, ZipReader, for_each_tar_entry,
    for_each_zip_entry, open_tar_gz, open_zip, with_tar_gz_create, with_zip_create,
};
use crate::io::fs::{copy_file, copy_to_file};

const ZIP_PATTERN: &str = "go*.zip";
const TAR_GZ_PATTERN: &str = "go*.tar.gz";
const MACOS_PATTERN: &str = "go*darwin*.tar.gz";

/// Entries of Windows archives that get Authenticode signatures.
const WINDOWS_SIGNABLE_SUFFIX: &str = ".exe";

/// Entries of macOS archives that go into the hardening bundle.
const MACOS_SIGNABLE: [&str; 2] = ["go/bin/*", "go/pkg/tool/*/*"];

/// Host-system byte of zip entries made on Unix.
const ZIP_UNIX_HOST: u8 = 3;

/// Extra-field header id the zip writer manages itself.
const ZIP64_EXTRA_ID: u16 = 0x0001;

/// `*` never crosses a `/`, so `go/bin/*` does not match `go/bin/sub/x`.
fn glob_match(pattern: &str, name: &str) -> Result<bool> {
    let compiled = Pattern::new(pattern).map_err(|source| SignError::Pattern {
        pattern: pattern.to_string(),
        source,
    })?;
    Ok(compiled.matches_with(
        name,
        MatchOptions {
            case_sensitive: true,
            require_literal_separator: true,
            require_literal_leading_dot: false,
        },
    ))
}

fn base_name(entry: &str) -> &str {
    entry.rsplit('/').next().unwrap_or(entry)
}

/// Platform and container of a release archive, derived from its file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    /// Windows zip; native executables inside are signed one by one.
    WindowsZip,
    /// macOS tar.gz; binaries are hardened through a zip bundle.
    MacTarGz,
    /// Any other tar.gz; only the archive itself is signed.
    TarGz,
}

impl ArchiveKind {
    /// Classify a base file name, or `None` if it matches no known pattern.
    ///
    /// # Errors
    ///
    /// Returns [`SignError::Pattern`] if a built-in pattern fails to compile.
    pub fn classify(name: &str) -> Result<Option<Self>> {
        if glob_match(ZIP_PATTERN, name)? {
            return Ok(Some(Self::WindowsZip));
        }
        if glob_match(TAR_GZ_PATTERN, name)? {
            if glob_match(MACOS_PATTERN, name)? {
                return Ok(Some(Self::MacTarGz));
            }
            return Ok(Some(Self::TarGz));
        }
        Ok(None)
    }

    /// Container format.
    pub fn format(self) -> ArchiveFormat {
        match self {
            Self::WindowsZip => ArchiveFormat::Zip,
            Self::MacTarGz | Self::TarGz => ArchiveFormat::TarGz,
        }
    }

    /// Whether this platform goes through the zip-bundle hardening path.
    pub fn is_macos(self) -> bool {
        self == Self::MacTarGz
    }
}

/// The most processed variant of an archive produced so far.
///
/// Exactly one variant is authoritative; later phases read
/// [`Stage::path`] without caring which steps applied to this platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stage {
    /// Nothing has been rewritten yet.
    Original(PathBuf),
    /// Signed entries were substituted back in.
    Repacked(PathBuf),
    /// A notarization ticket was attached.
    Notarized(PathBuf),
}

impl Stage {
    /// Path of the current bytes.
    pub fn path(&self) -> &Path {
        match self {
            Self::Original(p) | Self::Repacked(p) | Self::Notarized(p) => p,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Self::Original(_) => 0,
            Self::Repacked(_) => 1,
            Self::Notarized(_) => 2,
        }
    }
}

/// One file an archive wants the external signer to process.
///
/// Requests belong to a single phase and are consumed when that phase's
/// manifest is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningRequest {
    /// Base name of the archive that issued the request.
    pub archive: String,
    /// Phase the request was prepared for.
    pub phase: Phase,
    /// Absolute path the signer replaces in place.
    pub path: PathBuf,
    /// Signing identity.
    pub profile: SigningProfile,
    /// The file is a zip bundle of entries to sign individually.
    pub zip_bundle: bool,
    /// Application name for notarization.
    pub app_name: Option<String>,
}

impl SigningRequest {
    /// Convert into the wire record handed to the signer.
    pub fn into_record(self) -> ManifestRecord {
        ManifestRecord {
            path: self.path,
            profile: self.profile,
            zip_bundle: self.zip_bundle,
            app_name: self.app_name,
        }
    }
}

/// A release archive and its per-run working state.
#[derive(Debug)]
pub struct Archive {
    path: PathBuf,
    name: String,
    kind: ArchiveKind,
    work_dir: PathBuf,
    work_ready: bool,
    stage: Stage,
    /// Zip entries extracted for individual signing.
    extracted: HashSet<String>,
    /// Tar entries placed in the hardening bundle.
    bundled: HashSet<String>,
}

impl Archive {
    /// Classify `path` and assign it a scratch directory under `temp_root`.
    ///
    /// The scratch directory is only created when a phase first needs it.
    ///
    /// # Errors
    ///
    /// Returns [`SignError::Classification`] if the file name matches no
    /// known archive pattern.
    pub fn new(path: impl Into<PathBuf>, temp_root: &Path) -> Result<Self> {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| SignError::Classification { path: path.clone() })?;
        let kind = ArchiveKind::classify(&name)?
            .ok_or_else(|| SignError::Classification { path: path.clone() })?;
        let work_dir = temp_root.join(format!("sign-work-{name}"));

        Ok(Self {
            stage: Stage::Original(path.clone()),
            path,
            name,
            kind,
            work_dir,
            work_ready: false,
            extracted: HashSet::new(),
            bundled: HashSet::new(),
        })
    }

    /// Base file name; also the published name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Platform classification.
    pub fn kind(&self) -> ArchiveKind {
        self.kind
    }

    /// Current stage.
    pub fn stage(&self) -> &Stage {
        &self.stage
    }

    /// Path of the most processed bytes produced so far.
    pub fn latest_path(&self) -> &Path {
        self.stage.path()
    }

    /// Where the detached signature is produced.
    pub fn sig_path(&self) -> PathBuf {
        self.work_dir
            .join(format!("{}{SIGNATURE_SUFFIX}", self.name))
    }

    /// Zip bundle submitted for macOS hardening.
    pub fn bundle_path(&self) -> PathBuf {
        self.work_dir.join(format!("{}.ToSignBundle.zip", self.name))
    }

    fn repack_path(&self) -> PathBuf {
        self.work_dir
            .join(format!("{}.WithSignedContent", self.name))
    }

    fn extract_root(&self) -> PathBuf {
        self.work_dir.join("extract")
    }

    fn ensure_work_dir(&mut self) -> Result<()> {
        if self.work_ready {
            return Ok(());
        }
        // Stale output from an earlier run would leak into this one.
        if self.work_dir.exists() {
            fs::remove_dir_all(&self.work_dir).at(&self.work_dir)?;
        }
        fs::create_dir_all(&self.work_dir).at(&self.work_dir)?;
        self.work_ready = true;
        Ok(())
    }

    fn advance(&mut self, next: Stage) {
        debug_assert!(next.rank() > self.stage.rank(), "stages only move forward");
        self.stage = next;
    }

    fn request(&self, phase: Phase, path: PathBuf, profile: SigningProfile) -> SigningRequest {
        SigningRequest {
            archive: self.name.clone(),
            phase,
            path,
            profile,
            zip_bundle: false,
            app_name: None,
        }
    }

    /// Extract entries that need signing and describe how to sign them.
    ///
    /// - Windows zips: every `*.exe` entry is extracted under the scratch
    ///   directory, one request each.
    /// - macOS tarballs: regular files under `go/bin/*` and `go/pkg/tool/*/*`
    ///   are packed flat into a new zip bundle, one request for the bundle.
    /// - Anything else: no requests.
    ///
    /// # Errors
    ///
    /// Fails on unsafe entry names, duplicate bundle basenames, cancellation,
    /// or any I/O and container error.
    pub fn prepare_entries(&mut self, cancel: &Cancellation) -> Result<Vec<SigningRequest>> {
        cancel.check()?;
        match self.kind {
            ArchiveKind::WindowsZip => self.extract_zip_entries(cancel),
            ArchiveKind::MacTarGz => Ok(vec![self.bundle_tar_entries(cancel)?]),
            ArchiveKind::TarGz => Ok(Vec::new()),
        }
    }

    fn extract_zip_entries(&mut self, cancel: &Cancellation) -> Result<Vec<SigningRequest>> {
        tracing::info!("Extracting files to sign from {}", self.path.display());
        self.ensure_work_dir()?;

        let extract_root = self.extract_root();
        let mut archive = open_zip(&self.path)?;
        let mut names = Vec::new();
        for_each_zip_entry(&mut archive, &self.path, cancel, |za, entry| {
            if !entry.name.ends_with(WINDOWS_SIGNABLE_SUFFIX) {
                return Ok(());
            }
            let mut file = za.by_index(entry.index).at(&self.path)?;
            if file.is_dir() {
                return Ok(());
            }
            copy_to_file(&extract_root.join(&entry.name), &mut file)?;
            names.push(entry.name.clone());
            Ok(())
        })?;

        let mut requests = Vec::with_capacity(names.len());
        for name in names {
            let path = extract_root.join(&name);
            requests.push(self.request(Phase::Entries, path, SigningProfile::WindowsExecutable));
            self.extracted.insert(name);
        }
        Ok(requests)
    }

    fn bundle_tar_entries(&mut self, cancel: &Cancellation) -> Result<SigningRequest> {
        self.ensure_work_dir()?;
        let bundle_path = self.bundle_path();
        tracing::info!(
            "Creating macOS file hardening bundle at {}",
            bundle_path.display()
        );

        let mut original = open_tar_gz(&self.path)?;
        let mut written: HashSet<String> = HashSet::new();
        let mut bundled = Vec::new();
        with_zip_create(&bundle_path, |zw| {
            for_each_tar_entry(&mut original, &self.path, cancel, |entry, name| {
                if !entry.header().entry_type().is_file() || !is_macos_signable(name)? {
                    return Ok(());
                }
                let base = base_name(name);
                if !written.insert(base.to_string()) {
                    return Err(SignError::DuplicateBundleEntry {
                        archive: self.path.clone(),
                        name: base.to_string(),
                    });
                }
                let header = entry.header();
                let mode = tar_number(&header.as_old().mode, header.mode()).at(&self.path)?;
                let options = SimpleFileOptions::default()
                    .compression_method(CompressionMethod::Stored)
                    .unix_permissions(mode);
                zw.start_file(base, options).at(&bundle_path)?;
                io::copy(entry, zw).at(&bundle_path)?;
                bundled.push(name.to_string());
                Ok(())
            })
        })?;

        tracing::debug!("Bundled {} entries from {}", bundled.len(), self.name);
        self.bundled.extend(bundled);
        let mut request = self.request(Phase::Entries, bundle_path, SigningProfile::MacHarden);
        request.zip_bundle = true;
        Ok(request)
    }

    /// Rebuild the archive with signed content substituted in.
    ///
    /// Every original entry is carried over in order with its metadata; only
    /// the bodies of entries handed out by [`prepare_entries`] are replaced.
    /// Platforms without entry signing keep their original bytes.
    ///
    /// [`prepare_entries`]: Self::prepare_entries
    ///
    /// # Errors
    ///
    /// Fails on unsafe entry names, unreproducible metadata, body length
    /// mismatches, cancellation, or any I/O and container error.
    pub fn repack(&mut self, cancel: &Cancellation) -> Result<()> {
        cancel.check()?;
        let target = self.repack_path();
        match self.kind {
            ArchiveKind::WindowsZip => {
                tracing::info!("Repacking signed content to {}", target.display());
                self.ensure_work_dir()?;
                self.repack_zip(&target, cancel)?;
            }
            ArchiveKind::MacTarGz => {
                tracing::info!("Repacking hardened content to {}", target.display());
                self.ensure_work_dir()?;
                self.repack_tar_gz(&target, cancel)?;
            }
            ArchiveKind::TarGz => return Ok(()),
        }
        self.advance(Stage::Repacked(target));
        Ok(())
    }

    fn repack_zip(&self, target: &Path, cancel: &Cancellation) -> Result<()> {
        let extract_root = self.extract_root();
        let mut original = open_zip(&self.path)?;
        with_zip_create(target, |out| {
            for_each_zip_entry(&mut original, &self.path, cancel, |za, entry| {
                let signed = self
                    .extracted
                    .contains(&entry.name)
                    .then(|| extract_root.join(&entry.name));
                self.write_zip_entry(za, entry, signed.as_deref(), out, target)
            })
        })
    }

    /// Copy one zip entry into `out`, taking the body from `signed` when given.
    ///
    /// The zip writer has no way to set a per-entry comment, so an entry that
    /// carries one fails with [`SignError::UnsupportedMetadata`] instead of
    /// losing it. Entries are always written as Unix-made; a DOS-made entry
    /// gets the writer's default mode.
    fn write_zip_entry(
        &self,
        za: &mut ZipReader,
        entry: &ZipEntryRef,
        signed: Option<&Path>,
        out: &mut ZipOut,
        target: &Path,
    ) -> Result<()> {
        let mut file = za.by_index(entry.index).at(&self.path)?;
        if !file.comment().is_empty() {
            return Err(self.unsupported(&entry.name, "per-entry comments"));
        }

        let body_size = match signed {
            Some(path) => fs::metadata(path).at(path)?.len(),
            None => file.size(),
        };
        let mut options = FullFileOptions::default()
            .compression_method(file.compression())
            .large_file(body_size > u64::from(u32::MAX));
        if let Some(modified) = file.last_modified() {
            options = options.last_modified_time(modified);
        }
        // DOS-made entries only carry attribute bits; the mode zip derives
        // from them is synthetic.
        let unix_made = file.get_metadata().system as u8 == ZIP_UNIX_HOST;
        if let Some(mode) = file.unix_mode().filter(|_| unix_made) {
            options = options.unix_permissions(mode);
        }
        if let Some(extra) = file.extra_data() {
            for (id, data) in extra_fields(extra) {
                if id == ZIP64_EXTRA_ID {
                    continue;
                }
                options
                    .add_extra_data(id, data.to_vec().into_boxed_slice(), false)
                    .map_err(|e| self.unsupported(&entry.name, &format!("extra field {id:#06x}: {e}")))?;
            }
        }

        if file.is_dir() {
            return out.add_directory(entry.name.as_str(), options).at(target);
        }
        out.start_file(entry.name.as_str(), options).at(target)?;
        match signed {
            Some(path) => {
                tracing::info!("Replacing with signed version: {}", entry.name);
                let mut replacement = File::open(path).at(path)?;
                io::copy(&mut replacement, out).at(target)?;
            }
            None => {
                io::copy(&mut file, out).at(target)?;
            }
        }
        Ok(())
    }

    fn repack_tar_gz(&self, target: &Path, cancel: &Cancellation) -> Result<()> {
        let bundle_path = self.bundle_path();
        let mut original = open_tar_gz(&self.path)?;
        // The bundle only exists once entries were prepared.
        let mut signed = if self.bundled.is_empty() {
            None
        } else {
            Some(open_zip(&bundle_path)?)
        };

        with_tar_gz_create(target, |out| {
            for_each_tar_entry(&mut original, &self.path, cancel, |entry, name| {
                let replacement = if self.bundled.contains(name) {
                    signed.as_mut().map(|z| (z, bundle_path.as_path()))
                } else {
                    None
                };
                self.write_tar_entry(entry, name, replacement, out)
            })
        })
    }

    /// Copy one tar entry into `out`, taking a regular file's body from the
    /// signed bundle when given.
    ///
    /// The byte count is checked right after each entry so a short or long
    /// body is reported against this entry rather than the next one.
    fn write_tar_entry<R: Read>(
        &self,
        entry: &mut tar::Entry<'_, R>,
        name: &str,
        signed: Option<(&mut ZipReader, &Path)>,
        out: &mut TarGzOut,
    ) -> Result<()> {
        let entry_type = entry.header().entry_type();
        if entry_type.is_pax_global_extensions() {
            let header = entry.header().clone();
            return out.append(&header, entry).at(&self.path);
        }
        if entry_type.is_gnu_sparse() {
            return Err(self.unsupported(name, "GNU sparse files"));
        }

        let mut header = self.copy_tar_header(entry, name)?;

        if entry_type.is_file() || entry_type == tar::EntryType::Continuous {
            if let Some((bundle, bundle_path)) = signed {
                tracing::info!("Replacing with signed version: {name}");
                let mut replacement = bundle.by_name(base_name(name)).at(bundle_path)?;
                let size = replacement.size();
                header.set_size(size);
                return self.append_counted(out, &mut header, name, &mut replacement, size);
            }
            let size = entry.size();
            return self.append_counted(out, &mut header, name, entry, size);
        }

        header.set_size(0);
        if entry_type.is_hard_link() || entry_type.is_symlink() {
            let target = entry
                .link_name_bytes()
                .map(|b| String::from_utf8_lossy(&b).into_owned())
                .unwrap_or_default();
            return out.append_link(&mut header, name, target).at(&self.path);
        }
        out.append_data(&mut header, name, io::empty()).at(&self.path)
    }

    fn append_counted(
        &self,
        out: &mut TarGzOut,
        header: &mut tar::Header,
        name: &str,
        body: &mut dyn Read,
        size: u64,
    ) -> Result<()> {
        let mut counted = CountingReader::new(Read::take(body, size));
        out.append_data(header, name, &mut counted)
            .at(&self.path)?;
        if counted.count() != size {
            return Err(SignError::EntrySize {
                entry: name.to_string(),
                written: counted.count(),
                declared: size,
            });
        }
        Ok(())
    }

    /// Start a fresh header from the original's portable fields: type, size,
    /// mode, ownership, and the three timestamps.
    fn copy_tar_header<R: Read>(&self, entry: &mut tar::Entry<'_, R>, name: &str) -> Result<tar::Header> {
        let (pax_atime, pax_ctime) = pax_times(entry).at(&self.path)?;
        let size = entry.size();
        let src = entry.header();

        let mut header = tar::Header::new_gnu();
        header.set_entry_type(src.entry_type());
        header.set_size(size);
        let raw = src.as_old();
        header.set_mode(tar_number(&raw.mode, src.mode()).at(&self.path)?);
        header.set_uid(tar_number(&raw.uid, src.uid()).at(&self.path)?);
        header.set_gid(tar_number(&raw.gid, src.gid()).at(&self.path)?);
        header.set_mtime(tar_number(&raw.mtime, src.mtime()).at(&self.path)?);

        let user = src
            .username()
            .map_err(|_| self.unsupported(name, "owner name is not UTF-8"))?;
        if let Some(user) = user {
            header.set_username(user).at(&self.path)?;
        }
        let group = src
            .groupname()
            .map_err(|_| self.unsupported(name, "group name is not UTF-8"))?;
        if let Some(group) = group {
            header.set_groupname(group).at(&self.path)?;
        }
        if let (Ok(Some(major)), Ok(Some(minor))) = (src.device_major(), src.device_minor()) {
            header.set_device_major(major).at(&self.path)?;
            header.set_device_minor(minor).at(&self.path)?;
        }

        let (gnu_atime, gnu_ctime) = match src.as_gnu() {
            Some(gnu) => (gnu.atime().ok(), gnu.ctime().ok()),
            None => (None, None),
        };
        if let Some(gnu) = header.as_gnu_mut() {
            if let Some(atime) = pax_atime.or(gnu_atime) {
                gnu.set_atime(atime);
            }
            if let Some(ctime) = pax_ctime.or(gnu_ctime) {
                gnu.set_ctime(ctime);
            }
        }
        Ok(header)
    }

    fn unsupported(&self, entry: &str, detail: &str) -> SignError {
        SignError::UnsupportedMetadata {
            archive: self.path.clone(),
            entry: entry.to_string(),
            detail: detail.to_string(),
        }
    }

    /// Notarization requests for this archive.
    ///
    /// Only macOS archives are candidates, and none of the artifacts produced
    /// today can carry a stapled ticket: the binaries inside were already
    /// hardened individually. Always returns an empty list.
    ///
    /// # Errors
    ///
    /// Returns [`SignError::Cancelled`] if the signal has fired.
    pub fn prepare_notarize(&self, cancel: &Cancellation) -> Result<Vec<SigningRequest>> {
        cancel.check()?;
        if self.kind.is_macos() {
            tracing::debug!("No stapleable artifacts in {}", self.name);
        }
        Ok(Vec::new())
    }

    /// Unpack notarized output. A no-op until notarization produces requests.
    ///
    /// # Errors
    ///
    /// Returns [`SignError::Cancelled`] if the signal has fired.
    pub fn apply_notarize(&mut self, cancel: &Cancellation) -> Result<()> {
        cancel.check()
    }

    /// Copy the latest bytes to the signature path and request a detached
    /// signature for that copy.
    ///
    /// The signer overwrites the submitted file with the signature, so the
    /// copy has to exist before submission.
    ///
    /// # Errors
    ///
    /// Fails on cancellation or if the copy fails.
    pub fn prepare_signature(&mut self, cancel: &Cancellation) -> Result<Vec<SigningRequest>> {
        cancel.check()?;
        self.ensure_work_dir()?;
        let sig = self.sig_path();
        tracing::info!(
            "Copying file for signature generation: {} -> {}",
            self.latest_path().display(),
            sig.display()
        );
        copy_file(&sig, self.latest_path())?;
        Ok(vec![self.request(
            Phase::Signatures,
            sig,
            SigningProfile::DetachedSignature,
        )])
    }

    /// Copy the finished archive and its signature into `destination`.
    ///
    /// Returns the path of the published archive.
    ///
    /// # Errors
    ///
    /// Fails on cancellation or if either copy fails.
    pub fn publish(&self, destination: &Path, cancel: &Cancellation) -> Result<PathBuf> {
        cancel.check()?;
        fs::create_dir_all(destination).at(destination)?;

        tracing::info!(
            "Copying finished files to destination: {}",
            self.latest_path().display()
        );
        let published = destination.join(&self.name);
        copy_file(&published, self.latest_path())?;
        copy_file(
            &destination.join(format!("{}{SIGNATURE_SUFFIX}", self.name)),
            &self.sig_path(),
        )?;
        Ok(published)
    }
}

fn is_macos_signable(name: &str) -> Result<bool> {
    for pattern in MACOS_SIGNABLE {
        if glob_match(pattern, name)? {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Read a numeric tar header field, treating a blank one (all NUL or space)
/// as zero. Other malformed values still fail.
fn tar_number<T: Default>(raw: &[u8], parsed: io::Result<T>) -> io::Result<T> {
    if raw.iter().all(|b| matches!(b, 0 | b' ')) {
        return Ok(T::default());
    }
    parsed
}

/// Split a raw zip extra field into `(header id, data)` blocks.
///
/// A truncated trailing block is dropped.
fn extra_fields(raw: &[u8]) -> Vec<(u16, &[u8])> {
    let mut fields = Vec::new();
    let mut rest = raw;
    while rest.len() >= 4 {
        let id = u16::from_le_bytes([rest[0], rest[1]]);
        let len = usize::from(u16::from_le_bytes([rest[2], rest[3]]));
        if rest.len() < 4 + len {
            break;
        }
        fields.push((id, &rest[4..4 + len]));
        rest = &rest[4 + len..];
    }
    fields
}

/// Access and change times recorded in PAX extensions, in whole seconds.
fn pax_times<R: Read>(entry: &mut tar::Entry<'_, R>) -> io::Result<(Option<u64>, Option<u64>)> {
    let mut atime = None;
    let mut ctime = None;
    if let Some(extensions) = entry.pax_extensions()? {
        for ext in extensions {
            let ext = ext?;
            let seconds = ext
                .value()
                .ok()
                .and_then(|v| v.split('.').next())
                .and_then(|s| s.parse::<u64>().ok());
            match ext.key() {
                Ok("atime") => atime = seconds,
                Ok("ctime") => ctime = seconds,
                _ => {}
            }
        }
    }
    Ok((atime, ctime))
}
