//! Advisory lock serializing installs into the same destination directory.
//!
//! The lock file lives outside the destination (named after a hash of the
//! destination path), so the destination only ever sees the final binary.

use anyhow::{Context, Result};
use fs4::fs_std::FileExt;
use log::debug;
use sha2::{Digest, Sha256};
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

/// Held for the duration of an install; released when dropped.
#[derive(Debug)]
pub struct InstallLock {
    _file: File,
    path: PathBuf,
}

impl InstallLock {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Lock file path for `destination` inside `lock_dir`.
pub fn lock_path(lock_dir: &Path, destination: &Path) -> PathBuf {
    let absolute = std::path::absolute(destination).unwrap_or_else(|_| destination.to_path_buf());
    let digest = Sha256::digest(absolute.to_string_lossy().as_bytes());
    let short = &hex::encode(digest)[..16];
    lock_dir.join(format!("install-{}.lock", short))
}

/// Blocks (on a worker thread) until no other install holds the lock for `destination`.
#[tracing::instrument]
pub async fn acquire(lock_dir: &Path, destination: &Path) -> Result<InstallLock> {
    std::fs::create_dir_all(lock_dir)
        .with_context(|| format!("Failed to create lock directory {:?}", lock_dir))?;

    let path = lock_path(lock_dir, destination);
    let file = OpenOptions::new()
        .create(true)
        .read(true)
        .write(true)
        .truncate(false)
        .open(&path)
        .with_context(|| format!("Failed to open lock file {:?}", path))?;

    debug!("Acquiring install lock {:?} for {:?}", path, destination);
    let file = tokio::task::spawn_blocking(move || -> std::io::Result<File> {
        FileExt::lock_exclusive(&file)?;
        Ok(file)
    })
    .await
    .context("Lock task failed")?
    .with_context(|| format!("Failed to lock {:?}", path))?;

    debug!("Acquired install lock {:?}", path);
    Ok(InstallLock { _file: file, path })
}
