//! Artifact checksum calculation.

use crate::bundler::error::{ErrorExt, Result};
use sha2::{Digest, Sha256};
use tokio::io::AsyncReadExt;

/// Calculates the SHA256 checksum of an artifact file.
///
/// Reads the file in 8KB chunks and returns the hex-encoded digest
/// (64 characters).
pub async fn calculate_sha256(path: &std::path::Path) -> Result<String> {
    let mut file = tokio::fs::File::open(path)
        .await
        .fs_context("opening artifact for hashing", path)?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; 8192];

    loop {
        let n = file
            .read(&mut buffer)
            .await
            .fs_context("reading artifact for hash calculation", path)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}
