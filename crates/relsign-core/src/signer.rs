//! External signer seam
//!
//! The signing service is opaque: it receives a manifest of absolute paths
//! and replaces each file in place with its signed equivalent, or fails the
//! whole batch. [`MsBuildSigner`] drives the MSBuild signing project; tests
//! substitute their own [`Signer`].

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus};
use std::time::Duration;

use relsign_schema::{Phase, SigningManifest};
use wait_timeout::ChildExt;

use crate::cancel::Cancellation;
use crate::config::SignConfig;
use crate::error::{IoContext, Result, SignError};

/// Submits one manifest per phase and blocks until every file is signed.
pub trait Signer {
    /// Sign every record of `manifest` in place.
    ///
    /// # Errors
    ///
    /// Fails if any record could not be signed, or if `cancel` fires while
    /// the signer is running.
    fn sign(&self, manifest: &SigningManifest, cancel: &Cancellation) -> Result<()>;
}

impl<S: Signer + ?Sized> Signer for &S {
    fn sign(&self, manifest: &SigningManifest, cancel: &Cancellation) -> Result<()> {
        (**self).sign(manifest, cancel)
    }
}

/// How often a running signer is checked against the cancellation signal.
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Runs `dotnet build Sign.csproj` with a generated props file.
#[derive(Debug, Clone)]
pub struct MsBuildSigner {
    program: PathBuf,
    project_dir: PathBuf,
    temp_dir: PathBuf,
    sign_type: String,
}

impl MsBuildSigner {
    /// Build a signer from run settings.
    ///
    /// The temp directory is made absolute because MSBuild resolves relative
    /// paths against the project file, not our working directory.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the current directory cannot be read.
    pub fn from_config(config: &SignConfig) -> Result<Self> {
        let temp_dir = std::path::absolute(&config.temp_dir).at(&config.temp_dir)?;
        Ok(Self {
            program: PathBuf::from("dotnet"),
            project_dir: config.signing_project_dir.clone(),
            temp_dir,
            sign_type: config.sign_type.clone(),
        })
    }

    /// Use a different executable in place of `dotnet`.
    #[must_use]
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    /// Props file written for `phase`.
    pub fn props_path(&self, phase: Phase) -> PathBuf {
        self.temp_dir.join(format!("Sign{phase}.props"))
    }

    /// JSON copy of the manifest written for `phase`, kept for auditing.
    pub fn json_path(&self, phase: Phase) -> PathBuf {
        self.temp_dir.join(format!("Sign{phase}.json"))
    }

    fn command(&self, phase: Phase, props: &Path) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg("build")
            .arg("Sign.csproj")
            .arg(format!("/p:SignFilesDir={}", self.temp_dir.display()))
            .arg(format!("/p:FilesToSignPropsFile={}", props.display()))
            .arg("/t:AfterBuild")
            .arg(format!("/p:SignType={}", self.sign_type))
            .arg(format!(
                "/bl:{}",
                self.temp_dir.join(format!("Sign{phase}.binlog")).display()
            ))
            .arg("/v:n")
            .current_dir(&self.project_dir);
        cmd
    }

    /// Wait in short slices so a fired signal stops the child promptly.
    fn wait(&self, child: &mut Child, phase: Phase, cancel: &Cancellation) -> Result<ExitStatus> {
        loop {
            let slice = cancel
                .remaining()
                .map_or(POLL_INTERVAL, |left| left.min(POLL_INTERVAL));
            match child.wait_timeout(slice) {
                Ok(Some(status)) => return Ok(status),
                Ok(None) => {
                    if let Some(reason) = cancel.reason() {
                        tracing::warn!("Stopping signer for phase {phase}: {reason}");
                        let _ = child.kill();
                        let _ = child.wait(); // reap
                        return Err(SignError::Cancelled(reason));
                    }
                }
                Err(e) => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(SignError::Signer {
                        phase,
                        message: format!("waiting for {}: {e}", self.program.display()),
                    });
                }
            }
        }
    }
}

impl Signer for MsBuildSigner {
    fn sign(&self, manifest: &SigningManifest, cancel: &Cancellation) -> Result<()> {
        cancel.check()?;
        let phase = manifest.phase;

        fs::create_dir_all(&self.temp_dir).at(&self.temp_dir)?;
        let props = self.props_path(phase);
        fs::write(&props, manifest.to_props()).at(&props)?;
        let json_path = self.json_path(phase);
        let json = manifest.to_json().map_err(|e| SignError::Signer {
            phase,
            message: format!("serializing manifest: {e}"),
        })?;
        fs::write(&json_path, json).at(&json_path)?;

        let mut cmd = self.command(phase, &props);
        tracing::info!("Running: {cmd:?}");
        let mut child = cmd.spawn().map_err(|e| SignError::Signer {
            phase,
            message: format!("failed to start {}: {e}", self.program.display()),
        })?;

        let status = self.wait(&mut child, phase, cancel)?;
        if !status.success() {
            return Err(SignError::Signer {
                phase,
                message: format!("{} exited with {status}", self.program.display()),
            });
        }
        Ok(())
    }
}
