//! Explicit install configuration, built once by the caller.

use anyhow::Result;
use std::path::PathBuf;
use std::time::Duration;

use crate::checksum::parse_sha256;
use crate::error::InstallError;
use crate::release::{ArtifactSource, normalize_version};
use crate::runtime::Runtime;

/// Everything one install run needs. Nothing is read from the environment
/// after this has been built.
#[derive(Debug, Clone, Default)]
pub struct InstallConfig {
    /// Release to install; required
    pub version: String,
    /// Directory receiving the executable; see [`default_destination`]
    pub destination: Option<PathBuf>,
    pub source: ArtifactSource,
    /// Overrides for the detected OS family and architecture
    pub os: Option<String>,
    pub arch: Option<String>,
    /// Expected hex SHA-256 of the archive
    pub expected_sha256: Option<String>,
    /// Bound on the whole operation
    pub timeout: Option<Duration>,
    /// Parent for the per-run scratch directory (defaults to the system temp dir)
    pub work_dir: Option<PathBuf>,
    /// Where install locks are kept (defaults to `<cache>/tooldrop/locks`)
    pub lock_dir: Option<PathBuf>,
}

impl InstallConfig {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            ..Self::default()
        }
    }

    /// Check required inputs and normalise them. Fails with
    /// [`InstallError::Configuration`] before any other work happens.
    pub fn validate(mut self) -> Result<Self> {
        self.version = normalize_version(&self.version)?;
        if let Some(digest) = self.expected_sha256.take() {
            self.expected_sha256 = Some(parse_sha256(&digest)?);
        }
        if self.timeout == Some(Duration::ZERO) {
            return Err(InstallError::configuration("Timeout must be greater than zero").into());
        }
        Ok(self)
    }

    pub fn destination_or_default<R: Runtime>(&self, runtime: &R) -> Result<PathBuf> {
        match &self.destination {
            Some(dest) => Ok(dest.clone()),
            None => default_destination(runtime, &self.source.name),
        }
    }

    pub fn work_dir_or_default<R: Runtime>(&self, runtime: &R) -> PathBuf {
        self.work_dir.clone().unwrap_or_else(|| runtime.temp_dir())
    }

    pub fn lock_dir_or_default<R: Runtime>(&self, runtime: &R) -> PathBuf {
        self.lock_dir.clone().unwrap_or_else(|| {
            runtime
                .cache_dir()
                .unwrap_or_else(|| runtime.temp_dir())
                .join("tooldrop")
                .join("locks")
        })
    }
}

/// Standard binary directory: system-wide when running privileged,
/// otherwise the user's executable directory.
pub fn default_destination<R: Runtime>(runtime: &R, name: &str) -> Result<PathBuf> {
    if runtime.is_privileged() {
        #[cfg(not(windows))]
        {
            let _ = name;
            return Ok(PathBuf::from("/usr/local/bin"));
        }
        #[cfg(windows)]
        {
            if let Ok(program_files) = runtime.env_var("ProgramFiles") {
                return Ok(PathBuf::from(program_files).join(name));
            }
        }
    }

    if let Some(dir) = runtime.executable_dir() {
        return Ok(dir);
    }

    runtime
        .home_dir()
        .map(|home| home.join(".local").join("bin"))
        .ok_or_else(|| {
            InstallError::configuration(
                "Could not determine a destination directory; pass --dest",
            )
            .into()
        })
}
