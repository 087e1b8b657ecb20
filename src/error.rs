//! Error kinds surfaced by the installer.
//!
//! Errors travel through the pipeline as `anyhow::Error`. Whenever a failure
//! belongs to one of the kinds below it is wrapped in an [`InstallError`], so
//! callers can downcast and tell the kinds apart (the CLI maps them to exit
//! codes).

use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug)]
pub enum InstallError {
    /// Missing or invalid required input
    Configuration(String),
    /// Host (or requested) OS/architecture is not in the supported table
    UnsupportedPlatform { os: String, arch: String },
    /// Network or remote failure while fetching the archive
    Fetch { url: String, reason: String },
    /// Corrupt, unsupported or incomplete archive
    Extraction { archive: PathBuf, reason: String },
    /// Placement failed (permission denied, disk full, ...)
    Filesystem { path: PathBuf, reason: String },
    /// The caller-supplied time bound expired
    TimedOut { limit: Duration },
}

impl InstallError {
    pub fn configuration(msg: impl Into<String>) -> Self {
        InstallError::Configuration(msg.into())
    }

    pub fn fetch(url: &str, reason: impl std::fmt::Display) -> Self {
        InstallError::Fetch {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Uses the alternate `{:#}` form so anyhow context chains stay readable.
    pub fn extraction(archive: &Path, reason: &anyhow::Error) -> Self {
        InstallError::Extraction {
            archive: archive.to_path_buf(),
            reason: format!("{:#}", reason),
        }
    }

    pub fn filesystem(path: &Path, reason: &anyhow::Error) -> Self {
        InstallError::Filesystem {
            path: path.to_path_buf(),
            reason: format!("{:#}", reason),
        }
    }

    /// Process exit status for this kind of failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            InstallError::Configuration(_) => 2,
            InstallError::UnsupportedPlatform { .. } => 3,
            InstallError::Fetch { .. } => 4,
            InstallError::Extraction { .. } => 5,
            InstallError::Filesystem { .. } => 6,
            InstallError::TimedOut { .. } => 7,
        }
    }

    /// Whether repeating the whole operation may succeed. The installer itself
    /// never retries.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            InstallError::Fetch { .. } | InstallError::TimedOut { .. }
        )
    }
}

impl std::fmt::Display for InstallError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InstallError::Configuration(msg) => {
                write!(f, "Configuration error: {}", msg)
            }
            InstallError::UnsupportedPlatform { os, arch } => {
                write!(
                    f,
                    "Unsupported platform: OS '{}' with architecture '{}' has no release artifact. Run `tooldrop platforms` to see the supported targets.",
                    os, arch
                )
            }
            InstallError::Fetch { url, reason } => {
                write!(f, "Failed to fetch {}: {}", url, reason)
            }
            InstallError::Extraction { archive, reason } => {
                write!(f, "Failed to extract {:?}: {}", archive, reason)
            }
            InstallError::Filesystem { path, reason } => {
                write!(f, "Failed to install into {:?}: {}", path, reason)
            }
            InstallError::TimedOut { limit } => {
                write!(f, "Installation did not finish within {:?}", limit)
            }
        }
    }
}

impl std::error::Error for InstallError {}

/// Finds the [`InstallError`] inside an `anyhow::Error`, if there is one.
pub fn install_error(err: &anyhow::Error) -> Option<&InstallError> {
    err.chain().find_map(|e| e.downcast_ref::<InstallError>())
}

/// Exit status for any error returned by the installer.
pub fn exit_code(err: &anyhow::Error) -> i32 {
    install_error(err).map(InstallError::exit_code).unwrap_or(1)
}
