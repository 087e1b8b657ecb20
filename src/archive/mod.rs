mod tarball;
mod zip;

use crate::cancel::Cancellation;
use crate::runtime::Runtime;
use anyhow::{Result, anyhow};
use std::path::Path;

pub use tarball::{TarGzExtractor, TarXzExtractor};
pub use zip::ZipExtractor;

/// Trait for format-specific archive extractors
#[cfg_attr(test, mockall::automock)]
pub trait ArchiveExtractor: Send + Sync {
    /// Check if this extractor can handle the given archive format
    fn can_handle(&self, archive_path: &Path) -> bool;

    /// Extract the archive into `extract_to`, which must already exist
    fn extract<R: Runtime + 'static>(
        &self,
        runtime: &R,
        archive_path: &Path,
        extract_to: &Path,
        cancel: &Cancellation,
    ) -> Result<()>;
}

/// Dispatcher that selects the appropriate extractor based on the archive file name.
pub struct ArchiveExtractorImpl {
    tar_xz: TarXzExtractor,
    tar_gz: TarGzExtractor,
    zip: ZipExtractor,
}

impl Default for ArchiveExtractorImpl {
    fn default() -> Self {
        Self::new()
    }
}

impl ArchiveExtractorImpl {
    pub fn new() -> Self {
        Self {
            tar_xz: TarXzExtractor,
            tar_gz: TarGzExtractor,
            zip: ZipExtractor,
        }
    }
}

impl ArchiveExtractor for ArchiveExtractorImpl {
    fn can_handle(&self, archive_path: &Path) -> bool {
        self.tar_xz.can_handle(archive_path)
            || self.tar_gz.can_handle(archive_path)
            || self.zip.can_handle(archive_path)
    }

    #[tracing::instrument(skip(self, runtime))]
    fn extract<R: Runtime + 'static>(
        &self,
        runtime: &R,
        archive_path: &Path,
        extract_to: &Path,
        cancel: &Cancellation,
    ) -> Result<()> {
        if self.tar_xz.can_handle(archive_path) {
            return self.tar_xz.extract(runtime, archive_path, extract_to, cancel);
        }
        if self.tar_gz.can_handle(archive_path) {
            return self.tar_gz.extract(runtime, archive_path, extract_to, cancel);
        }
        if self.zip.can_handle(archive_path) {
            return self.zip.extract(runtime, archive_path, extract_to, cancel);
        }
        Err(anyhow!(
            "Unsupported archive format: {}",
            archive_path.display()
        ))
    }
}

fn file_name_lower(archive_path: &Path) -> String {
    archive_path
        .file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}
