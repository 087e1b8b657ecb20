//! Temporary-file bookkeeping.
//!
//! [`ScratchDir`] owns the per-run work directory and deletes it when dropped,
//! which covers early returns, errors and cancelled futures. The shared
//! [`CleanupContext`] additionally lets the Ctrl-C handler remove whatever is
//! still registered before the process exits.

use anyhow::{Context, Result};
use log::{debug, warn};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::runtime::Runtime;

/// Tracks paths that need cleanup on interruption
#[derive(Default)]
pub struct CleanupContext {
    #[cfg(test)]
    pub paths: Vec<PathBuf>,
    #[cfg(not(test))]
    paths: Vec<PathBuf>,
}

impl CleanupContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a path to be cleaned up on interruption
    pub fn add(&mut self, path: PathBuf) {
        self.paths.push(path);
    }

    /// Remove a path from cleanup list (e.g., when it was already removed)
    pub fn remove(&mut self, path: &Path) {
        self.paths.retain(|p| p != path);
    }

    /// Clean up all registered paths
    pub fn cleanup(&self) {
        for path in &self.paths {
            debug!("Cleaning up: {:?}", path);
            if path.is_dir() {
                let _ = std::fs::remove_dir_all(path);
            } else {
                let _ = std::fs::remove_file(path);
            }
        }
    }
}

/// Type alias for shared cleanup context
pub type SharedCleanupContext = Arc<Mutex<CleanupContext>>;

/// Create a new shared cleanup context
pub fn new_shared() -> SharedCleanupContext {
    Arc::new(Mutex::new(CleanupContext::new()))
}

fn register(ctx: &SharedCleanupContext, path: &Path) {
    if let Ok(mut guard) = ctx.lock() {
        guard.add(path.to_path_buf());
    }
}

fn unregister(ctx: &SharedCleanupContext, path: &Path) {
    if let Ok(mut guard) = ctx.lock() {
        guard.remove(path);
    }
}

/// Unique-per-run suffix for temporary names.
pub fn run_id() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or_default();
    format!("{}-{:08x}", std::process::id(), nanos)
}

/// Work directory removed, with everything inside it, when dropped.
///
/// Owns a handle to the runtime so it can be moved onto a blocking thread
/// together with the work that fills it.
pub struct ScratchDir<R: Runtime> {
    runtime: Arc<R>,
    path: PathBuf,
    ctx: SharedCleanupContext,
}

impl<R: Runtime> ScratchDir<R> {
    /// Creates `<parent>/<prefix>-<run id>` and registers it for interruption cleanup.
    pub fn create(
        runtime: Arc<R>,
        parent: &Path,
        prefix: &str,
        ctx: SharedCleanupContext,
    ) -> Result<Self> {
        let path = parent.join(format!("{}-{}", prefix, run_id()));
        runtime
            .create_dir_all(&path)
            .with_context(|| format!("Failed to create work directory {:?}", path))?;
        register(&ctx, &path);
        debug!("Created work directory {:?}", path);
        Ok(Self { runtime, path, ctx })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl<R: Runtime> Drop for ScratchDir<R> {
    fn drop(&mut self) {
        if self.runtime.exists(&self.path)
            && let Err(e) = self.runtime.remove_dir_all(&self.path)
        {
            warn!("Failed to remove work directory {:?}: {:#}", self.path, e);
        }
        unregister(&self.ctx, &self.path);
    }
}

/// Removes a file on drop unless [`FileGuard::keep`] was called.
///
/// Used for the staging file written into the destination directory, so an
/// aborted placement leaves nothing behind there.
pub struct FileGuard<'a, R: Runtime> {
    runtime: &'a R,
    path: PathBuf,
    ctx: SharedCleanupContext,
    armed: bool,
}

impl<'a, R: Runtime> FileGuard<'a, R> {
    pub fn new(runtime: &'a R, path: PathBuf, ctx: SharedCleanupContext) -> Self {
        register(&ctx, &path);
        Self {
            runtime,
            path,
            ctx,
            armed: true,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The file has been moved away or should stay; do not delete it.
    pub fn keep(mut self) {
        self.armed = false;
    }
}

impl<R: Runtime> Drop for FileGuard<'_, R> {
    fn drop(&mut self) {
        if self.armed
            && self.runtime.exists(&self.path)
            && let Err(e) = self.runtime.remove_file(&self.path)
        {
            warn!("Failed to remove {:?}: {:#}", self.path, e);
        }
        unregister(&self.ctx, &self.path);
    }
}
