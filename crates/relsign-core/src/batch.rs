//! Batch orchestration
//!
//! Drives every discovered archive through the phases in lockstep. Each
//! remote phase collects the requests of all archives into one manifest and
//! makes a single signer call, because each call carries a large fixed
//! overhead.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use relsign_schema::{CHECKSUM_SUFFIX, Phase, Sha256Digest, SigningManifest};

use crate::archive::{Archive, SigningRequest};
use crate::cancel::Cancellation;
use crate::checksum::write_checksum_file;
use crate::config::SignConfig;
use crate::error::{IoContext, Result, SignError};
use crate::signer::Signer;

/// Find and classify the archives matching `pattern`.
///
/// Checksum sidecars are skipped. Base names are compared case-insensitively
/// because every result lands in one destination directory, which may live
/// on a case-insensitive filesystem.
///
/// # Errors
///
/// Fails on an invalid pattern, an unclassifiable file, a duplicate base
/// name, cancellation, or if nothing matches.
pub fn discover(pattern: &str, temp_root: &Path, cancel: &Cancellation) -> Result<Vec<Archive>> {
    let paths = glob::glob(pattern).map_err(|source| SignError::Pattern {
        pattern: pattern.to_string(),
        source,
    })?;

    let mut seen: HashMap<String, PathBuf> = HashMap::new();
    let mut archives = Vec::new();
    for entry in paths {
        cancel.check()?;
        let path = entry.map_err(|e| {
            let path = e.path().to_path_buf();
            SignError::io(path, e.into_error())
        })?;
        if path.to_string_lossy().ends_with(CHECKSUM_SUFFIX) {
            continue;
        }

        let lower = path
            .file_name()
            .map(|n| n.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        if let Some(existing) = seen.get(&lower) {
            return Err(SignError::DuplicateArchive {
                path,
                existing: existing.clone(),
            });
        }
        seen.insert(lower, path.clone());

        let archive = Archive::new(path, temp_root)?;
        tracing::debug!("Found {} archive {}", archive.kind().format(), archive.name());
        archives.push(archive);
    }

    if archives.is_empty() {
        return Err(SignError::NoArchives(pattern.to_string()));
    }
    Ok(archives)
}

/// What a completed run produced.
#[derive(Debug, Default)]
pub struct RunReport {
    /// Manifest built for each remote phase, in phase order.
    pub manifests: Vec<SigningManifest>,
    /// Published archives with their checksum sidecars and digests.
    pub published: Vec<Published>,
}

/// One archive as it landed in the destination directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Published {
    /// Published archive.
    pub archive: PathBuf,
    /// Checksum sidecar next to it.
    pub checksum: PathBuf,
    /// Digest recorded in the sidecar.
    pub digest: Sha256Digest,
}

/// A configured signing run.
#[derive(Debug)]
pub struct Pipeline<S> {
    config: SignConfig,
    signer: S,
}

impl<S: Signer> Pipeline<S> {
    /// Create a run over `config` that submits manifests to `signer`.
    pub fn new(config: SignConfig, signer: S) -> Self {
        Self { config, signer }
    }

    /// Run every phase to completion.
    ///
    /// The first failure aborts the run; nothing is published unless all
    /// signing phases succeeded.
    ///
    /// # Errors
    ///
    /// Any archive, signer, or cancellation error.
    pub fn run(&self, cancel: &Cancellation) -> Result<RunReport> {
        let temp_root = std::path::absolute(&self.config.temp_dir).at(&self.config.temp_dir)?;
        let mut archives = discover(&self.config.files_glob, &temp_root, cancel)?;
        tracing::info!("Found {} archive(s) to sign", archives.len());

        let mut report = RunReport::default();

        tracing::info!("Extracting files to sign");
        let requests = collect(&mut archives, |a| a.prepare_entries(cancel))?;
        report
            .manifests
            .push(self.submit(Phase::Entries, requests, cancel)?);

        tracing::info!("Repacking archives with signed content");
        for a in &mut archives {
            a.repack(cancel)?;
        }

        if self.config.notarize {
            tracing::info!("Notarizing");
            let requests = collect(&mut archives, |a| a.prepare_notarize(cancel))?;
            report
                .manifests
                .push(self.submit(Phase::Notarize, requests, cancel)?);
            for a in &mut archives {
                a.apply_notarize(cancel)?;
            }
        } else {
            tracing::info!("Skipping notarization");
        }

        tracing::info!("Creating signature files");
        let requests = collect(&mut archives, |a| a.prepare_signature(cancel))?;
        report
            .manifests
            .push(self.submit(Phase::Signatures, requests, cancel)?);

        tracing::info!("Copying finished files to destination");
        let mut published = Vec::with_capacity(archives.len());
        for a in &archives {
            published.push(a.publish(&self.config.destination_dir, cancel)?);
        }

        tracing::info!("Generating checksum files");
        for archive in published {
            cancel.check()?;
            let (checksum, digest) = write_checksum_file(&archive)?;
            report.published.push(Published {
                archive,
                checksum,
                digest,
            });
        }

        Ok(report)
    }

    /// Build the manifest for `phase` and hand it to the signer.
    ///
    /// Empty manifests and dry runs skip the signer call; the manifest is
    /// still logged and returned.
    fn submit(
        &self,
        phase: Phase,
        requests: Vec<SigningRequest>,
        cancel: &Cancellation,
    ) -> Result<SigningManifest> {
        cancel.check()?;
        let mut manifest = SigningManifest::new(phase);
        for request in requests {
            if request.phase != phase {
                tracing::warn!(
                    "Ignoring stale {} request from {} in phase {phase}",
                    request.phase,
                    request.archive
                );
                continue;
            }
            manifest.push(request.into_record());
        }

        tracing::info!("Signing with props file content:\n{}", manifest.to_props());
        if self.config.dry_run {
            tracing::info!("Dry run: skipping signing.");
            return Ok(manifest);
        }
        if manifest.is_empty() {
            tracing::info!("Nothing to sign in phase {phase}");
            return Ok(manifest);
        }
        self.signer.sign(&manifest, cancel)?;
        Ok(manifest)
    }
}

fn collect<F>(archives: &mut [Archive], mut prepare: F) -> Result<Vec<SigningRequest>>
where
    F: FnMut(&mut Archive) -> Result<Vec<SigningRequest>>,
{
    let mut requests = Vec::new();
    for a in archives {
        requests.extend(prepare(a)?);
    }
    Ok(requests)
}
