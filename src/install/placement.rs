use anyhow::{Context, Result, bail};
use log::{debug, info, warn};
use std::collections::VecDeque;
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::cancel::Cancellation;
use crate::cleanup::{FileGuard, SharedCleanupContext, run_id};
use crate::runtime::Runtime;

/// Mode given to the installed executable.
pub const EXECUTABLE_MODE: u32 = 0o755;

/// Find `binary_name` in the extracted tree, preferring the shallowest match.
///
/// Release archives usually wrap their contents in a single top-level
/// directory named after the archive, but some ship the executable at the root.
/// Symbolic links are never followed, and a link carrying the executable's
/// name is an error: it could point anywhere on the host.
pub fn find_executable<R: Runtime>(
    runtime: &R,
    extract_dir: &Path,
    binary_name: &str,
) -> Result<Option<PathBuf>> {
    let mut queue = VecDeque::from([extract_dir.to_path_buf()]);

    while let Some(dir) = queue.pop_front() {
        let mut entries = runtime.read_dir(&dir)?;
        entries.sort();

        for entry in entries {
            let is_match = entry.file_name().is_some_and(|n| n == binary_name);
            if runtime.is_symlink(&entry) {
                if is_match {
                    bail!("{:?} is a symbolic link, not a regular file", entry);
                }
                debug!("Not following symbolic link {:?}", entry);
            } else if runtime.is_dir(&entry) {
                queue.push_back(entry);
            } else if is_match {
                debug!("Found {} at {:?}", binary_name, entry);
                return Ok(Some(entry));
            }
        }
    }

    Ok(None)
}

/// Log a warning when the file is not a native executable image.
#[tracing::instrument(skip(runtime))]
pub fn warn_if_not_native<R: Runtime>(runtime: &R, path: &Path) {
    let mut buffer = Vec::new();
    let read = runtime
        .open(path)
        .and_then(|mut f| f.read_to_end(&mut buffer).map_err(Into::into));
    if read.is_err() {
        return;
    }

    match goblin::Object::parse(&buffer) {
        Ok(goblin::Object::Elf(_)) | Ok(goblin::Object::Mach(_)) | Ok(goblin::Object::PE(_)) => {
            debug!("{:?} is a native executable image", path);
        }
        _ => warn!(
            "{:?} is not an ELF, Mach-O or PE image; installing it anyway",
            path
        ),
    }
}

/// Atomically install `binary` as `<dest_dir>/<binary_name>`.
///
/// The file is copied to a hidden staging name inside `dest_dir`, made
/// executable, then renamed onto the final name. An existing file with that
/// name is replaced, so reinstalling is idempotent. If any step fails the
/// staging file is removed and the destination keeps its previous content.
/// Once `cancel` fires the final rename is skipped.
#[tracing::instrument(skip(runtime, cleanup_ctx, cancel))]
pub fn place_executable<R: Runtime>(
    runtime: &R,
    binary: &Path,
    dest_dir: &Path,
    binary_name: &str,
    cleanup_ctx: SharedCleanupContext,
    cancel: &Cancellation,
) -> Result<PathBuf> {
    cancel.check()?;

    if !runtime.exists(dest_dir) {
        debug!("Creating destination directory {:?}", dest_dir);
    }
    runtime
        .create_dir_all(dest_dir)
        .with_context(|| format!("Failed to create destination directory {:?}", dest_dir))?;

    let final_path = dest_dir.join(binary_name);
    if runtime.is_dir(&final_path) {
        bail!("{:?} exists and is a directory", final_path);
    }

    let staging = FileGuard::new(
        runtime,
        dest_dir.join(format!(".{}.partial-{}", binary_name, run_id())),
        cleanup_ctx,
    );

    runtime.copy(binary, staging.path())?;
    runtime.set_permissions(staging.path(), EXECUTABLE_MODE)?;

    cancel.check()?;
    if runtime.exists(&final_path) {
        info!("Replacing existing {:?}", final_path);
    }
    runtime.rename(staging.path(), &final_path)?;
    staging.keep();

    Ok(final_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cleanup::new_shared;
    use crate::runtime::{MockRuntime, RealRuntime};
    use mockall::predicate::eq;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_find_executable_nested() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("typst-x86_64-unknown-linux-musl");
        fs::create_dir(&nested).unwrap();
        fs::write(nested.join("typst"), "bin").unwrap();
        fs::write(nested.join("LICENSE"), "license").unwrap();

        let found = find_executable(&RealRuntime, dir.path(), "typst").unwrap();
        assert_eq!(found, Some(nested.join("typst")));
    }

    #[test]
    fn test_find_executable_prefers_shallowest() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("a/b")).unwrap();
        fs::write(dir.path().join("a/b/tool"), "deep").unwrap();
        fs::write(dir.path().join("tool"), "top").unwrap();

        let found = find_executable(&RealRuntime, dir.path(), "tool").unwrap();
        assert_eq!(found, Some(dir.path().join("tool")));
    }

    #[test]
    fn test_find_executable_missing() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("README.md"), "docs").unwrap();

        assert_eq!(
            find_executable(&RealRuntime, dir.path(), "typst").unwrap(),
            None
        );
    }

    #[test]
    fn test_find_executable_ignores_directory_with_same_name() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("typst/bin")).unwrap();
        fs::write(dir.path().join("typst/bin/typst"), "bin").unwrap();

        let found = find_executable(&RealRuntime, dir.path(), "typst").unwrap();
        assert_eq!(found, Some(dir.path().join("typst/bin/typst")));
    }

    #[cfg(unix)]
    #[test]
    fn test_find_executable_rejects_symlinked_executable() {
        let dir = tempdir().unwrap();
        let secret = dir.path().join("secret.txt");
        fs::write(&secret, "host file").unwrap();
        let extract = dir.path().join("extract/typst-x86_64-unknown-linux-musl");
        fs::create_dir_all(&extract).unwrap();
        std::os::unix::fs::symlink(&secret, extract.join("typst")).unwrap();

        let err = find_executable(&RealRuntime, &dir.path().join("extract"), "typst").unwrap_err();
        assert!(err.to_string().contains("symbolic link"));
    }

    #[cfg(unix)]
    #[test]
    fn test_find_executable_does_not_follow_directory_links() {
        let dir = tempdir().unwrap();
        let extract = dir.path().join("extract");
        fs::create_dir_all(&extract).unwrap();
        for name in ["a", "b", "c"] {
            std::os::unix::fs::symlink(".", extract.join(name)).unwrap();
        }
        fs::write(extract.join("README"), "docs").unwrap();

        let outside = dir.path().join("outside");
        fs::create_dir(&outside).unwrap();
        fs::write(outside.join("typst"), "not from the archive").unwrap();
        std::os::unix::fs::symlink(&outside, extract.join("linked")).unwrap();

        assert_eq!(find_executable(&RealRuntime, &extract, "typst").unwrap(), None);
    }

    #[test]
    fn test_place_executable_skipped_after_cancel() {
        let dir = tempdir().unwrap();
        let binary = dir.path().join("typst");
        fs::write(&binary, "bin").unwrap();
        let dest = dir.path().join("bin");

        let cancel = Cancellation::new();
        cancel.cancel();
        let result = place_executable(&RealRuntime, &binary, &dest, "typst", new_shared(), &cancel);

        assert!(result.is_err());
        assert!(!dest.join("typst").exists());
    }

    #[test]
    fn test_place_executable_creates_dest_and_sets_mode() {
        let dir = tempdir().unwrap();
        let binary = dir.path().join("typst");
        fs::write(&binary, "bin").unwrap();
        let dest = dir.path().join("opt/bin");

        let installed = place_executable(
            &RealRuntime,
            &binary,
            &dest,
            "typst",
            new_shared(),
            &Cancellation::new(),
        )
        .unwrap();

        assert_eq!(installed, dest.join("typst"));
        assert_eq!(fs::read_to_string(&installed).unwrap(), "bin");
        assert_eq!(fs::read_dir(&dest).unwrap().count(), 1);

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(&installed).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, EXECUTABLE_MODE);
        }
    }

    #[test]
    fn test_place_executable_overwrites_existing() {
        let dir = tempdir().unwrap();
        let binary = dir.path().join("new");
        fs::write(&binary, "new version").unwrap();
        let dest = dir.path().join("bin");
        fs::create_dir(&dest).unwrap();
        fs::write(dest.join("typst"), "old version").unwrap();

        place_executable(
            &RealRuntime,
            &binary,
            &dest,
            "typst",
            new_shared(),
            &Cancellation::new(),
        )
        .unwrap();

        assert_eq!(
            fs::read_to_string(dest.join("typst")).unwrap(),
            "new version"
        );
        assert_eq!(fs::read_dir(&dest).unwrap().count(), 1);
    }

    #[test]
    fn test_place_executable_refuses_directory_target() {
        let dir = tempdir().unwrap();
        let binary = dir.path().join("new");
        fs::write(&binary, "x").unwrap();
        let dest = dir.path().join("bin");
        fs::create_dir_all(dest.join("typst")).unwrap();

        let err = place_executable(
            &RealRuntime,
            &binary,
            &dest,
            "typst",
            new_shared(),
            &Cancellation::new(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("is a directory"));
    }

    #[test]
    fn test_failed_rename_removes_staging_file() {
        let dest = PathBuf::from("/opt/bin");
        let mut runtime = MockRuntime::new();

        runtime.expect_exists().returning(|_| true);
        runtime
            .expect_create_dir_all()
            .with(eq(dest.clone()))
            .returning(|_| Ok(()));
        runtime.expect_is_dir().returning(|_| false);
        runtime.expect_copy().returning(|_, _| Ok(3));
        runtime.expect_set_permissions().returning(|_, _| Ok(()));
        runtime
            .expect_rename()
            .returning(|_, _| Err(anyhow::anyhow!("permission denied")));
        // The staging file is the only thing removed
        runtime
            .expect_remove_file()
            .withf(|p| {
                p.parent() == Some(Path::new("/opt/bin"))
                    && p.file_name()
                        .is_some_and(|n| n.to_string_lossy().starts_with(".typst.partial-"))
            })
            .times(1)
            .returning(|_| Ok(()));

        let ctx = new_shared();
        let err = place_executable(
            &runtime,
            Path::new("/tmp/work/extract/typst"),
            &dest,
            "typst",
            ctx.clone(),
            &Cancellation::new(),
        )
        .unwrap_err();

        assert!(err.to_string().contains("permission denied"));
        assert!(ctx.lock().unwrap().paths.is_empty());
    }

    #[test]
    fn test_warn_if_not_native_accepts_scripts() {
        let dir = tempdir().unwrap();
        let script = dir.path().join("tool");
        fs::write(&script, "#!/bin/sh\necho hi\n").unwrap();

        // Only logs; must not panic
        warn_if_not_native(&RealRuntime, &script);
        warn_if_not_native(&RealRuntime, &dir.path().join("missing"));
    }
}
