//! SHA-256 verification of downloaded archives.

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::io::Read;
use std::path::Path;

use crate::error::InstallError;
use crate::runtime::Runtime;

/// Hex-encoded SHA-256 of the file at `path`.
pub fn sha256_file<R: Runtime>(runtime: &R, path: &Path) -> Result<String> {
    let mut reader = runtime.open(path)?;
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 64 * 1024];

    loop {
        let n = reader
            .read(&mut buffer)
            .with_context(|| format!("Failed to read {:?} for hashing", path))?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Validate a user-supplied digest: 64 hex characters, case-insensitive.
pub fn parse_sha256(value: &str) -> Result<String> {
    let value = value.trim();
    let value = value.strip_prefix("sha256:").unwrap_or(value);
    match hex::decode(value) {
        Ok(bytes) if bytes.len() == 32 => Ok(value.to_lowercase()),
        _ => Err(InstallError::configuration(format!(
            "'{}' is not a SHA-256 digest (expected 64 hex characters)",
            value
        ))
        .into()),
    }
}

/// Compare the archive against `expected`. A mismatch means the transfer
/// delivered the wrong bytes and is reported as a fetch failure.
pub fn verify_sha256<R: Runtime>(
    runtime: &R,
    path: &Path,
    expected: &str,
    url: &str,
) -> Result<()> {
    let actual = sha256_file(runtime, path)?;
    if !actual.eq_ignore_ascii_case(expected) {
        return Err(InstallError::fetch(
            url,
            format!("checksum mismatch: expected sha256 {}, got {}", expected, actual),
        )
        .into());
    }
    log::debug!("Checksum verified for {:?}", path);
    Ok(())
}
