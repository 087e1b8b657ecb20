use crate::cancel::Cancellation;
use crate::runtime::Runtime;
use anyhow::{Context, Result, anyhow};
use flate2::read::GzDecoder;
use log::{debug, info};
use std::io::Read;
use std::path::Path;
use tar::Archive;
use xz2::read::XzDecoder;

use super::{ArchiveExtractor, file_name_lower};

/// Extractor for .tar.xz / .txz archives
pub struct TarXzExtractor;

/// Extractor for .tar.gz / .tgz archives
pub struct TarGzExtractor;

impl ArchiveExtractor for TarXzExtractor {
    fn can_handle(&self, archive_path: &Path) -> bool {
        let name = file_name_lower(archive_path);
        name.ends_with(".tar.xz") || name.ends_with(".txz")
    }

    fn extract<R: Runtime + 'static>(
        &self,
        runtime: &R,
        archive_path: &Path,
        extract_to: &Path,
        cancel: &Cancellation,
    ) -> Result<()> {
        debug!("Extracting tar.xz archive to {:?}...", extract_to);
        let file = runtime
            .open(archive_path)
            .with_context(|| format!("Failed to open archive at {:?}", archive_path))?;
        unpack_tar(XzDecoder::new(file), extract_to, cancel)
    }
}

impl ArchiveExtractor for TarGzExtractor {
    fn can_handle(&self, archive_path: &Path) -> bool {
        let name = file_name_lower(archive_path);
        name.ends_with(".tar.gz") || name.ends_with(".tgz")
    }

    fn extract<R: Runtime + 'static>(
        &self,
        runtime: &R,
        archive_path: &Path,
        extract_to: &Path,
        cancel: &Cancellation,
    ) -> Result<()> {
        debug!("Extracting tar.gz archive to {:?}...", extract_to);
        let file = runtime
            .open(archive_path)
            .with_context(|| format!("Failed to open archive at {:?}", archive_path))?;
        unpack_tar(GzDecoder::new(file), extract_to, cancel)
    }
}

/// Unpacks every entry below `extract_to`. Entries that would escape it
/// (absolute paths, `..`) are skipped by `unpack_in`.
fn unpack_tar<D: Read>(decoder: D, extract_to: &Path, cancel: &Cancellation) -> Result<()> {
    let mut archive = Archive::new(decoder);
    archive.set_preserve_permissions(true);
    archive.set_overwrite(true);

    let mut unpacked = 0usize;
    for entry in archive.entries().context("Failed to read tar entries")? {
        cancel.check()?;
        let mut entry = entry.context("Failed to read tar entry")?;
        let entry_path = entry
            .path()
            .map(|p| p.to_path_buf())
            .context("Invalid path in tar entry")?;

        if entry
            .unpack_in(extract_to)
            .with_context(|| format!("Failed to unpack {:?}", entry_path))?
        {
            unpacked += 1;
        } else {
            debug!("Skipping entry outside extraction root: {:?}", entry_path);
        }
    }

    if unpacked == 0 {
        return Err(anyhow!("Archive appears to be empty."));
    }

    info!("Extraction complete ({} entries).", unpacked);
    Ok(())
}
