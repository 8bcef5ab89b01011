//! Checksum sidecar files for staged artifacts.
//!
//! Maven repositories expect `<file>.md5` and `<file>.sha1` next to every
//! uploaded file, each holding the lowercase hex digest and nothing else.

use crate::error::Result;
use sha1::{Digest, Sha1};
use std::path::{Path, PathBuf};
use tokio::io::AsyncReadExt;

/// Read size for streamed hashing
const CHUNK_SIZE: usize = 8192;

/// Digest algorithms written as sidecar files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestAlgorithm {
    Md5,
    Sha1,
}

impl DigestAlgorithm {
    /// Sidecar extension, also the algorithm's name in logs.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Md5 => "md5",
            Self::Sha1 => "sha1",
        }
    }
}

/// Computes the hex digest of `path` without writing anything.
pub async fn calculate_digest(path: &Path, algorithm: DigestAlgorithm) -> Result<String> {
    match algorithm {
        DigestAlgorithm::Md5 => {
            let contents = tokio::fs::read(path).await?;
            Ok(format!("{:x}", md5::compute(&contents)))
        }
        DigestAlgorithm::Sha1 => calculate_file_sha1(path).await,
    }
}

/// Computes the digest of `path` and writes it to `<path>.<algorithm>`.
///
/// # Returns
///
/// * `Ok(PathBuf)` - Path of the written sidecar
/// * `Err` - If the file cannot be read or the sidecar cannot be written
pub async fn write_digest(path: &Path, algorithm: DigestAlgorithm) -> Result<PathBuf> {
    log::info!(
        "Generating {} checksum for {}",
        algorithm.extension().to_uppercase(),
        path.display()
    );

    let digest = calculate_digest(path, algorithm).await?;
    let sidecar = sidecar_path(path, algorithm.extension());
    tokio::fs::write(&sidecar, digest.as_bytes()).await?;

    Ok(sidecar)
}

/// `<path>.<extension>`, keeping the original extension.
pub fn sidecar_path(path: &Path, extension: &str) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".");
    name.push(extension);
    PathBuf::from(name)
}

/// Calculates SHA-1 of a single file.
///
/// Reads the file in 8KB chunks to handle large files efficiently.
async fn calculate_file_sha1(file_path: &Path) -> Result<String> {
    let mut file = tokio::fs::File::open(file_path).await?;
    let mut hasher = Sha1::new();
    let mut buffer = vec![0u8; CHUNK_SIZE];

    loop {
        let n = file.read(&mut buffer).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }

    Ok(hex::encode(hasher.finalize()))
}
