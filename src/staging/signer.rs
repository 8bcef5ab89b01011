//! Detached signatures for staged artifacts.
//!
//! Signing shells out to GnuPG. The passphrase is fed on stdin with
//! loopback pinentry so it never appears in the process list.

use crate::error::{Result, StagingError};
use async_trait::async_trait;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use super::checksum::sidecar_path;

/// Produces a detached signature beside a file.
#[async_trait]
pub trait ArtifactSigner: Send + Sync {
    /// Signs `path` and returns the path of the `.asc` signature.
    async fn sign(&self, path: &Path) -> Result<PathBuf>;
}

/// GnuPG-backed [`ArtifactSigner`].
#[derive(Clone)]
pub struct GpgSigner {
    program: PathBuf,
    passphrase: String,
    key_id: Option<String>,
}

impl fmt::Debug for GpgSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GpgSigner")
            .field("program", &self.program)
            .field("passphrase", &"<redacted>")
            .field("key_id", &self.key_id)
            .finish()
    }
}

impl GpgSigner {
    /// Creates a signer for an explicit gpg binary.
    pub fn new(program: PathBuf, passphrase: impl Into<String>) -> Self {
        Self {
            program,
            passphrase: passphrase.into(),
            key_id: None,
        }
    }

    /// Locates `gpg` (or `gpg2`) on `PATH`.
    pub fn detect(passphrase: impl Into<String>) -> Result<Self> {
        let program = ["gpg", "gpg2"]
            .iter()
            .find_map(|name| match which::which(name) {
                Ok(path) => {
                    log::debug!("Found {} at: {}", name, path.display());
                    Some(path)
                }
                Err(e) => {
                    log::debug!("{} not found in PATH: {}", name, e);
                    None
                }
            })
            .ok_or_else(|| StagingError::SigningFailure {
                path: PathBuf::new(),
                reason: "Neither gpg nor gpg2 was found in PATH".to_string(),
            })?;

        Ok(Self::new(program, passphrase))
    }

    /// Signs with a specific key instead of the default one.
    pub fn with_key_id(mut self, key_id: Option<String>) -> Self {
        self.key_id = key_id;
        self
    }

    fn args(&self, path: &Path) -> Vec<std::ffi::OsString> {
        let mut args: Vec<std::ffi::OsString> = [
            "--batch",
            "--yes",
            "--pinentry-mode",
            "loopback",
            "--passphrase-fd",
            "0",
        ]
        .iter()
        .map(Into::into)
        .collect();

        if let Some(key_id) = &self.key_id {
            args.push("--local-user".into());
            args.push(key_id.into());
        }
        args.push("--armor".into());
        args.push("--detach-sign".into());
        args.push(path.as_os_str().to_os_string());
        args
    }
}

#[async_trait]
impl ArtifactSigner for GpgSigner {
    async fn sign(&self, path: &Path) -> Result<PathBuf> {
        log::info!("Signing {}", path.display());

        let failure = |reason: String| StagingError::SigningFailure {
            path: path.to_path_buf(),
            reason,
        };

        let mut child = Command::new(&self.program)
            .args(self.args(path))
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| failure(format!("Failed to start {}: {}", self.program.display(), e)))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(self.passphrase.as_bytes())
                .await
                .map_err(|e| failure(format!("Failed to pass passphrase: {}", e)))?;
            stdin
                .write_all(b"\n")
                .await
                .map_err(|e| failure(format!("Failed to pass passphrase: {}", e)))?;
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| failure(format!("Failed to wait for gpg: {}", e)))?;

        if !output.status.success() {
            return Err(failure(format!(
                "gpg exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let signature = sidecar_path(path, "asc");
        if !signature.is_file() {
            return Err(failure(format!(
                "gpg succeeded but {} was not written",
                signature.display()
            )));
        }

        Ok(signature)
    }
}
