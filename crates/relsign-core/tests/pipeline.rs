//! End-to-end runs of the signing pipeline against a recording signer.

use std::cell::RefCell;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use relsign_core::{Cancellation, Pipeline, SignConfig, SignError, Signer, sha256_file};
use relsign_schema::{Phase, SigningManifest, SigningProfile};
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

const SIGNED_PREFIX: &[u8] = b"signed:";

/// Records manifests and "signs" files by prefixing their contents.
///
/// Zip bundles are signed entry by entry, the way the real service treats
/// them.
#[derive(Default)]
struct RecordingSigner {
    calls: RefCell<Vec<SigningManifest>>,
    fail: bool,
}

impl RecordingSigner {
    fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    fn phases(&self) -> Vec<Phase> {
        self.calls.borrow().iter().map(|m| m.phase).collect()
    }
}

impl Signer for RecordingSigner {
    fn sign(&self, manifest: &SigningManifest, cancel: &Cancellation) -> relsign_core::Result<()> {
        cancel.check()?;
        self.calls.borrow_mut().push(manifest.clone());
        if self.fail {
            return Err(SignError::Signer {
                phase: manifest.phase,
                message: "service unavailable".to_string(),
            });
        }
        for record in &manifest.records {
            if record.zip_bundle {
                sign_bundle(&record.path);
            } else {
                let body = fs::read(&record.path).unwrap();
                fs::write(&record.path, signed(&body)).unwrap();
            }
        }
        Ok(())
    }
}

fn signed(body: &[u8]) -> Vec<u8> {
    [SIGNED_PREFIX, body].concat()
}

fn sign_bundle(path: &Path) {
    let entries = read_zip(path);
    let mut w = ZipWriter::new(File::create(path).unwrap());
    for (name, body) in entries {
        w.start_file(name, SimpleFileOptions::default()).unwrap();
        w.write_all(&signed(&body)).unwrap();
    }
    w.finish().unwrap();
}

fn write_zip(path: &Path, entries: &[(&str, &[u8])]) {
    let mut w = ZipWriter::new(File::create(path).unwrap());
    for (name, body) in entries {
        w.start_file(*name, SimpleFileOptions::default()).unwrap();
        w.write_all(body).unwrap();
    }
    w.finish().unwrap();
}

fn read_zip(path: &Path) -> Vec<(String, Vec<u8>)> {
    let mut z = ZipArchive::new(File::open(path).unwrap()).unwrap();
    (0..z.len())
        .map(|i| {
            let mut f = z.by_index(i).unwrap();
            let mut body = Vec::new();
            f.read_to_end(&mut body).unwrap();
            (f.name().to_string(), body)
        })
        .collect()
}

fn write_tar_gz(path: &Path, entries: &[(&str, &[u8])]) {
    let gz = GzEncoder::new(File::create(path).unwrap(), Compression::default());
    let mut b = tar::Builder::new(gz);
    for (name, body) in entries {
        let mut h = tar::Header::new_gnu();
        h.set_mode(0o755);
        h.set_mtime(1_700_000_000);
        h.set_size(body.len() as u64);
        h.set_entry_type(tar::EntryType::Regular);
        b.append_data(&mut h, name, *body).unwrap();
    }
    b.into_inner().unwrap().finish().unwrap();
}

fn read_tar_gz(path: &Path) -> Vec<(String, Vec<u8>)> {
    let mut a = tar::Archive::new(GzDecoder::new(File::open(path).unwrap()));
    a.entries()
        .unwrap()
        .map(|e| {
            let mut e = e.unwrap();
            let name = e.path().unwrap().to_string_lossy().into_owned();
            let mut body = Vec::new();
            e.read_to_end(&mut body).unwrap();
            (name, body)
        })
        .collect()
}

struct Workspace {
    _dir: tempfile::TempDir,
    root: PathBuf,
}

impl Workspace {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_path_buf();
        fs::create_dir_all(root.join("tosign")).unwrap();
        Self { _dir: dir, root }
    }

    fn input(&self, name: &str) -> PathBuf {
        self.root.join("tosign").join(name)
    }

    fn dest(&self) -> PathBuf {
        self.root.join("signed")
    }

    fn config(&self) -> SignConfig {
        SignConfig {
            files_glob: format!("{}/tosign/*", self.root.display()),
            destination_dir: self.dest(),
            temp_dir: self.root.join("signing-temp"),
            signing_project_dir: self.root.clone(),
            ..SignConfig::default()
        }
    }
}

#[test]
fn windows_zip_signs_executables_and_archive() {
    let ws = Workspace::new();
    let name = "go1.23.3.windows-amd64.zip";
    write_zip(
        &ws.input(name),
        &[("go/bin/go.exe", b"MZ go"), ("go/doc/go.html", b"<html>")],
    );

    let signer = RecordingSigner::default();
    let report = Pipeline::new(ws.config(), &signer)
        .run(&Cancellation::none())
        .unwrap();

    let calls = signer.calls.borrow();
    assert_eq!(signer.phases(), vec![Phase::Entries, Phase::Signatures]);
    assert_eq!(calls[0].len(), 1);
    assert_eq!(calls[0].records[0].profile, SigningProfile::WindowsExecutable);
    assert!(calls[0].records[0].path.ends_with("extract/go/bin/go.exe"));
    assert_eq!(calls[1].records[0].profile, SigningProfile::DetachedSignature);

    let published = ws.dest().join(name);
    assert_eq!(
        read_zip(&published),
        vec![
            ("go/bin/go.exe".to_string(), signed(b"MZ go")),
            ("go/doc/go.html".to_string(), b"<html>".to_vec()),
        ]
    );
    let sig = fs::read(ws.dest().join(format!("{name}.sig"))).unwrap();
    assert_eq!(sig, signed(&fs::read(&published).unwrap()));

    let digest = sha256_file(&published).unwrap();
    assert_eq!(
        fs::read_to_string(ws.dest().join(format!("{name}.sha256"))).unwrap(),
        format!("{digest}  {name}\n")
    );
    assert_eq!(report.published.len(), 1);
    assert_eq!(report.published[0].digest, digest);
}

#[test]
fn darwin_tarball_is_hardened_through_bundle() {
    let ws = Workspace::new();
    let name = "go1.23.3.darwin-amd64.tar.gz";
    write_tar_gz(
        &ws.input(name),
        &[
            ("go/bin/go", b"go"),
            ("go/pkg/tool/darwin_amd64/compile", b"compile"),
            ("go/src/fmt/print.go", b"package fmt"),
        ],
    );

    let signer = RecordingSigner::default();
    Pipeline::new(ws.config(), &signer)
        .run(&Cancellation::none())
        .unwrap();

    let calls = signer.calls.borrow();
    let bundle = &calls[0].records[0];
    assert_eq!(calls[0].len(), 1);
    assert_eq!(bundle.profile, SigningProfile::MacHarden);
    assert!(bundle.zip_bundle);
    assert!(calls[0].to_props().contains("Zip=\"true\""));

    assert_eq!(
        read_tar_gz(&ws.dest().join(name)),
        vec![
            ("go/bin/go".to_string(), signed(b"go")),
            ("go/pkg/tool/darwin_amd64/compile".to_string(), signed(b"compile")),
            ("go/src/fmt/print.go".to_string(), b"package fmt".to_vec()),
        ]
    );
}

#[test]
fn linux_tarball_is_published_unchanged() {
    let ws = Workspace::new();
    let name = "go1.23.3.linux-amd64.tar.gz";
    write_tar_gz(&ws.input(name), &[("go/bin/go", b"elf")]);

    let signer = RecordingSigner::default();
    let report = Pipeline::new(ws.config(), &signer)
        .run(&Cancellation::none())
        .unwrap();

    // The empty entry phase never reaches the signer.
    assert_eq!(signer.phases(), vec![Phase::Signatures]);
    assert!(report.manifests[0].is_empty());
    assert_eq!(
        fs::read(ws.dest().join(name)).unwrap(),
        fs::read(ws.input(name)).unwrap()
    );
}

#[test]
fn mixed_batch_makes_one_call_per_phase() {
    let ws = Workspace::new();
    write_zip(&ws.input("go1.23.3.windows-amd64.zip"), &[("go/bin/go.exe", b"MZ")]);
    write_zip(&ws.input("go1.23.3.windows-arm64.zip"), &[("go/bin/gofmt.exe", b"MZ")]);
    write_tar_gz(&ws.input("go1.23.3.darwin-arm64.tar.gz"), &[("go/bin/go", b"macho")]);
    write_tar_gz(&ws.input("go1.23.3.linux-amd64.tar.gz"), &[("go/bin/go", b"elf")]);

    let signer = RecordingSigner::default();
    let report = Pipeline::new(ws.config(), &signer)
        .run(&Cancellation::none())
        .unwrap();

    let calls = signer.calls.borrow();
    assert_eq!(signer.phases(), vec![Phase::Entries, Phase::Signatures]);
    assert_eq!(calls[0].len(), 3);
    assert_eq!(calls[1].len(), 4);
    assert_eq!(report.published.len(), 4);
}

#[test]
fn notarize_phase_runs_with_no_requests() {
    let ws = Workspace::new();
    write_tar_gz(&ws.input("go1.23.3.darwin-arm64.tar.gz"), &[("go/bin/go", b"macho")]);

    let config = SignConfig {
        notarize: true,
        ..ws.config()
    };
    let signer = RecordingSigner::default();
    let report = Pipeline::new(config, &signer)
        .run(&Cancellation::none())
        .unwrap();

    let phases: Vec<_> = report.manifests.iter().map(|m| m.phase).collect();
    assert_eq!(phases, vec![Phase::Entries, Phase::Notarize, Phase::Signatures]);
    assert!(report.manifests[1].is_empty());
    assert_eq!(signer.phases(), vec![Phase::Entries, Phase::Signatures]);
}

#[test]
fn dry_run_is_repeatable() {
    let ws = Workspace::new();
    write_zip(&ws.input("go1.23.3.windows-amd64.zip"), &[("go/bin/go.exe", b"MZ")]);
    write_tar_gz(&ws.input("go1.23.3.darwin-amd64.tar.gz"), &[("go/bin/go", b"macho")]);

    let config = SignConfig {
        dry_run: true,
        ..ws.config()
    };
    let signer = RecordingSigner::default();
    let first = Pipeline::new(config.clone(), &signer)
        .run(&Cancellation::none())
        .unwrap();
    let second = Pipeline::new(config, &signer)
        .run(&Cancellation::none())
        .unwrap();

    assert!(signer.calls.borrow().is_empty());
    assert_eq!(first.manifests, second.manifests);
    assert_eq!(first.manifests[0].len(), 2);
    // Local work still happens: published archives carry the unsigned content.
    assert_eq!(
        read_zip(&ws.dest().join("go1.23.3.windows-amd64.zip")),
        vec![("go/bin/go.exe".to_string(), b"MZ".to_vec())]
    );
}

#[test]
fn traversal_entry_stops_before_signing() {
    let ws = Workspace::new();
    write_zip(
        &ws.input("go1.23.3.windows-amd64.zip"),
        &[("go/bin/go.exe", b"MZ"), ("../evil.exe", b"MZ")],
    );

    let signer = RecordingSigner::default();
    let err = Pipeline::new(ws.config(), &signer)
        .run(&Cancellation::none())
        .unwrap_err();

    assert!(matches!(err, SignError::UnsafePath { ref entry, .. } if entry == "../evil.exe"));
    assert!(signer.calls.borrow().is_empty());
    assert!(!ws.root.join("evil.exe").exists());
    assert!(!ws.root.join("signing-temp/evil.exe").exists());
    assert!(!ws.dest().exists());
}

#[test]
fn duplicate_names_fail_before_any_work() {
    let ws = Workspace::new();
    fs::create_dir_all(ws.root.join("tosign/a")).unwrap();
    fs::create_dir_all(ws.root.join("tosign/b")).unwrap();
    write_tar_gz(&ws.input("a/go1.23.3.linux-amd64.tar.gz"), &[("go/VERSION", b"1")]);
    write_tar_gz(&ws.input("b/Go1.23.3.Linux-amd64.tar.gz"), &[("go/VERSION", b"1")]);

    let config = SignConfig {
        files_glob: format!("{}/tosign/*/*", ws.root.display()),
        ..ws.config()
    };
    let signer = RecordingSigner::default();
    let err = Pipeline::new(config, &signer)
        .run(&Cancellation::none())
        .unwrap_err();

    assert!(matches!(err, SignError::DuplicateArchive { .. }));
    assert!(signer.calls.borrow().is_empty());
    assert!(!ws.root.join("signing-temp").exists());
}

#[test]
fn signer_failure_publishes_nothing() {
    let ws = Workspace::new();
    write_zip(&ws.input("go1.23.3.windows-amd64.zip"), &[("go/bin/go.exe", b"MZ")]);

    let signer = RecordingSigner::failing();
    let err = Pipeline::new(ws.config(), &signer)
        .run(&Cancellation::none())
        .unwrap_err();

    assert!(matches!(err, SignError::Signer { phase: Phase::Entries, .. }));
    assert!(!ws.dest().exists());
}

#[test]
fn cancelled_run_does_nothing() {
    let ws = Workspace::new();
    write_zip(&ws.input("go1.23.3.windows-amd64.zip"), &[("go/bin/go.exe", b"MZ")]);

    let cancel = Cancellation::none();
    cancel.cancel();
    let signer = RecordingSigner::default();
    let err = Pipeline::new(ws.config(), &signer).run(&cancel).unwrap_err();

    assert!(err.is_cancelled());
    assert!(signer.calls.borrow().is_empty());
    assert!(!ws.dest().exists());
}

#[test]
fn stale_checksums_in_input_are_ignored() {
    let ws = Workspace::new();
    let name = "go1.23.3.linux-amd64.tar.gz";
    write_tar_gz(&ws.input(name), &[("go/VERSION", b"1")]);
    fs::write(ws.input(&format!("{name}.sha256")), "0000  old\n").unwrap();

    let signer = RecordingSigner::default();
    let report = Pipeline::new(ws.config(), &signer)
        .run(&Cancellation::none())
        .unwrap();

    assert_eq!(report.published.len(), 1);
    let line = fs::read_to_string(ws.dest().join(format!("{name}.sha256"))).unwrap();
    assert!(line.ends_with(&format!("  {name}\n")));
    assert!(!line.starts_with("0000"));
}
