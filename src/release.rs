//! Release descriptors: which archive to fetch for a version and target.

use anyhow::Result;
use serde::Serialize;

use crate::error::InstallError;
use crate::platform::Target;

pub const DEFAULT_NAME: &str = "typst";
pub const DEFAULT_BASE_URL: &str = "https://github.com/typst/typst/releases/download";

/// Where release archives for an artifact are published.
///
/// Archives are expected at `{base_url}/{tag_prefix}{version}/{name}-{triple}{ext}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactSource {
    pub name: String,
    pub base_url: String,
    pub tag_prefix: String,
}

impl Default for ArtifactSource {
    fn default() -> Self {
        Self {
            name: DEFAULT_NAME.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            tag_prefix: "v".to_string(),
        }
    }
}

impl ArtifactSource {
    pub fn new(name: Option<String>, base_url: Option<String>) -> Result<Self> {
        let mut source = Self::default();
        if let Some(name) = name {
            let name = name.trim();
            if name.is_empty() || name.contains(['/', '\\']) || name.contains(char::is_whitespace)
            {
                return Err(InstallError::configuration(format!(
                    "Invalid artifact name '{}'",
                    name
                ))
                .into());
            }
            source.name = name.to_string();
        }
        if let Some(base_url) = base_url {
            let base_url = base_url.trim().trim_end_matches('/');
            if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
                return Err(InstallError::configuration(format!(
                    "Base URL '{}' must start with http:// or https://",
                    base_url
                ))
                .into());
            }
            source.base_url = base_url.to_string();
        }
        Ok(source)
    }
}

/// Validate a requested version and strip an optional leading `v`.
pub fn normalize_version(version: &str) -> Result<String> {
    let trimmed = version.trim();
    let stripped = trimmed.strip_prefix('v').unwrap_or(trimmed);

    if stripped.is_empty() {
        return Err(InstallError::configuration("A version is required (e.g. 0.12.0)").into());
    }
    if stripped.contains(char::is_whitespace)
        || stripped.contains(['/', '\\'])
        || stripped.contains("..")
    {
        return Err(
            InstallError::configuration(format!("Invalid version '{}'", version)).into(),
        );
    }

    Ok(stripped.to_string())
}

/// Everything needed to fetch and unpack one release archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReleaseDescriptor {
    pub name: String,
    pub version: String,
    pub triple: String,
    pub url: String,
    pub archive_name: String,
    pub binary_name: String,
}

impl ReleaseDescriptor {
    /// Build the descriptor. Pure: no I/O, same inputs always give the same URL.
    pub fn new(source: &ArtifactSource, version: &str, target: &Target) -> Result<Self> {
        let version = normalize_version(version)?;
        let archive_name = format!("{}-{}{}", source.name, target.triple, target.archive_ext);
        let url = format!(
            "{}/{}{}/{}",
            source.base_url.trim_end_matches('/'),
            source.tag_prefix,
            version,
            archive_name
        );

        Ok(Self {
            name: source.name.clone(),
            version,
            triple: target.triple.to_string(),
            url,
            archive_name,
            binary_name: format!("{}{}", source.name, target.exe_suffix()),
        })
    }
}
