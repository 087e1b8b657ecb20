use anyhow::{Context, Result};
use log::{debug, info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::{
    archive::{ArchiveExtractor, ArchiveExtractorImpl},
    cancel::Cancellation,
    checksum::verify_sha256,
    cleanup::{ScratchDir, SharedCleanupContext, new_shared},
    config::InstallConfig,
    download::{Downloader, HttpDownloader},
    error::{InstallError, install_error},
    http::HttpClient,
    lock,
    platform::{Platform, resolve_target},
    release::ReleaseDescriptor,
    runtime::Runtime,
};

mod placement;

pub use placement::{EXECUTABLE_MODE, find_executable, place_executable};
use placement::warn_if_not_native;

/// Install one release with the default HTTP downloader and extractors.
/// Returns the path of the installed executable.
#[tracing::instrument(skip(runtime, config))]
pub async fn install<R: Runtime + 'static>(runtime: R, config: &InstallConfig) -> Result<PathBuf> {
    let installer = Installer::new(
        runtime,
        HttpDownloader::new(HttpClient::with_defaults()?),
        ArchiveExtractorImpl::new(),
    );
    installer.install(config).await
}

/// Resolve the release an install would fetch, without touching the network.
pub fn resolve<R: Runtime>(runtime: &R, config: &InstallConfig) -> Result<ReleaseDescriptor> {
    let config = config.clone().validate()?;
    resolve_release(runtime, &config)
}

fn resolve_release<R: Runtime>(runtime: &R, config: &InstallConfig) -> Result<ReleaseDescriptor> {
    let platform =
        Platform::detect_with_overrides(runtime, config.os.as_deref(), config.arch.as_deref());
    let target = resolve_target(&platform)?;
    ReleaseDescriptor::new(&config.source, &config.version, &target)
}

/// Keep an error that already has a kind; otherwise give it one.
fn classify(err: anyhow::Error, kind: impl FnOnce(&anyhow::Error) -> InstallError) -> anyhow::Error {
    if install_error(&err).is_some() {
        err
    } else {
        let kind = kind(&err);
        anyhow::Error::from(kind)
    }
}

pub struct Installer<R: Runtime, D: Downloader, E: ArchiveExtractor> {
    runtime: Arc<R>,
    downloader: D,
    extractor: Arc<E>,
    cleanup_ctx: SharedCleanupContext,
}

impl<R: Runtime + 'static, D: Downloader, E: ArchiveExtractor + 'static> Installer<R, D, E> {
    pub fn new(runtime: R, downloader: D, extractor: E) -> Self {
        Self {
            runtime: Arc::new(runtime),
            downloader,
            extractor: Arc::new(extractor),
            cleanup_ctx: new_shared(),
        }
    }

    /// Temporary paths currently in use, for an interrupt handler to remove.
    pub fn cleanup_context(&self) -> SharedCleanupContext {
        self.cleanup_ctx.clone()
    }

    /// Run the whole pipeline: resolve, fetch, verify, extract, place.
    ///
    /// Temporary files are removed on every exit path. When the configured
    /// timeout expires the run is cancelled, in-flight extraction or placement
    /// is stopped at its next checkpoint, and [`InstallError::TimedOut`] is
    /// returned once nothing touches the file system any more. Nothing is retried.
    #[tracing::instrument(skip(self, config))]
    pub async fn install(&self, config: &InstallConfig) -> Result<PathBuf> {
        let config = config.clone().validate()?;
        let release = resolve_release(&*self.runtime, &config)?;
        let destination = config.destination_or_default(&*self.runtime)?;

        info!(
            "Installing {} {} ({}) into {:?}",
            release.name, release.version, release.triple, destination
        );

        let cancel = Cancellation::new();
        let pipeline = self.run(&config, &release, &destination, &cancel);
        let installed = match config.timeout {
            Some(limit) => match tokio::time::timeout(limit, pipeline).await {
                Ok(result) => result?,
                Err(_) => {
                    warn!("Installation timed out after {:?}, stopping", limit);
                    cancel.cancel();
                    cancel.settled().await;
                    return Err(InstallError::TimedOut { limit }.into());
                }
            },
            None => pipeline.await?,
        };

        info!("Installed {:?}", installed);
        Ok(installed)
    }

    async fn run(
        &self,
        config: &InstallConfig,
        release: &ReleaseDescriptor,
        destination: &Path,
        cancel: &Cancellation,
    ) -> Result<PathBuf> {
        let lock_dir = config.lock_dir_or_default(&*self.runtime);
        let lock = lock::acquire(&lock_dir, destination)
            .await
            .map_err(|e| classify(e, |e| InstallError::filesystem(&lock_dir, e)))?;

        let work_dir = config.work_dir_or_default(&*self.runtime);
        let scratch = ScratchDir::create(
            self.runtime.clone(),
            &work_dir,
            "tooldrop",
            self.cleanup_ctx.clone(),
        )
        .map_err(|e| classify(e, |e| InstallError::filesystem(&work_dir, e)))?;

        let archive_path = scratch.path().join(&release.archive_name);
        self.fetch(config, release, &archive_path).await?;

        // Extraction and placement block. The task owns the scratch directory
        // and the lock so both outlive a dropped (timed out) future.
        let work = cancel.begin_work().await;
        let runtime = self.runtime.clone();
        let extractor = self.extractor.clone();
        let release = release.clone();
        let destination = destination.to_path_buf();
        let cleanup_ctx = self.cleanup_ctx.clone();
        let cancel = cancel.clone();

        tokio::task::spawn_blocking(move || {
            let result = unpack_and_place(
                &*runtime,
                &*extractor,
                &release,
                scratch.path(),
                &destination,
                cleanup_ctx,
                &cancel,
            );
            drop(scratch);
            drop(lock);
            drop(work);
            result
        })
        .await
        .context("Install task failed")?
    }

    /// Download the archive and check its digest when one is configured.
    async fn fetch(
        &self,
        config: &InstallConfig,
        release: &ReleaseDescriptor,
        archive_path: &Path,
    ) -> Result<()> {
        self.downloader
            .download(&*self.runtime, &release.url, archive_path)
            .await
            .map_err(|e| classify(e, |e| InstallError::filesystem(archive_path, e)))?;

        match &config.expected_sha256 {
            Some(expected) => verify_sha256(&*self.runtime, archive_path, expected, &release.url)
                .map_err(|e| classify(e, |e| InstallError::filesystem(archive_path, e)))?,
            None => warn!(
                "No checksum configured for {}; archive integrity is not verified",
                release.archive_name
            ),
        }
        Ok(())
    }
}

fn unpack_and_place<R: Runtime + 'static, E: ArchiveExtractor>(
    runtime: &R,
    extractor: &E,
    release: &ReleaseDescriptor,
    scratch_dir: &Path,
    destination: &Path,
    cleanup_ctx: SharedCleanupContext,
    cancel: &Cancellation,
) -> Result<PathBuf> {
    let archive_path = scratch_dir.join(&release.archive_name);
    let extract_dir = scratch_dir.join("extract");
    let binary = unpack(runtime, extractor, release, &archive_path, &extract_dir, cancel)?;

    place_executable(
        runtime,
        &binary,
        destination,
        &release.binary_name,
        cleanup_ctx,
        cancel,
    )
    .map_err(|e| classify(e, |e| InstallError::filesystem(destination, e)))
}

/// Extract the archive and locate the executable inside it.
fn unpack<R: Runtime + 'static, E: ArchiveExtractor>(
    runtime: &R,
    extractor: &E,
    release: &ReleaseDescriptor,
    archive_path: &Path,
    extract_dir: &Path,
    cancel: &Cancellation,
) -> Result<PathBuf> {
    let extraction = |e: &anyhow::Error| InstallError::extraction(archive_path, e);

    runtime
        .create_dir_all(extract_dir)
        .with_context(|| format!("Failed to create extraction directory {:?}", extract_dir))
        .map_err(|e| classify(e, |e| InstallError::filesystem(extract_dir, e)))?;

    extractor
        .extract(runtime, archive_path, extract_dir, cancel)
        .map_err(|e| classify(e, extraction))?;

    cancel.check()?;
    let binary = find_executable(runtime, extract_dir, &release.binary_name)
        .map_err(|e| classify(e, extraction))?
        .ok_or_else(|| {
            extraction(&anyhow::anyhow!(
                "archive does not contain an executable named '{}'",
                release.binary_name
            ))
        })?;

    debug!("Executable found at {:?}", binary);
    warn_if_not_native(runtime, &binary);
    Ok(binary)
}
