use anyhow::Result;

use super::Platform;
use crate::error::InstallError;

/// Operating system families with published release artifacts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Os {
    Linux,
    MacOs,
    Windows,
}

impl Os {
    /// Accepts both `uname -s` style names and Rust's `std::env::consts::OS`.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim().to_lowercase();
        match value.as_str() {
            "linux" => Some(Os::Linux),
            "darwin" | "macos" | "osx" => Some(Os::MacOs),
            "windows" | "win32" | "win64" => Some(Os::Windows),
            v if v.starts_with("mingw") || v.starts_with("msys") || v.starts_with("cygwin") => {
                Some(Os::Windows)
            }
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Os::Linux => "linux",
            Os::MacOs => "macos",
            Os::Windows => "windows",
        }
    }
}

/// CPU architectures with published release artifacts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arch {
    X86_64,
    Aarch64,
    Armv7,
    Riscv64,
}

impl Arch {
    /// Accepts both `uname -m` style names and Rust's `std::env::consts::ARCH`.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim().to_lowercase();
        match value.as_str() {
            "x86_64" | "amd64" | "x64" => Some(Arch::X86_64),
            "aarch64" | "arm64" => Some(Arch::Aarch64),
            "armv7l" | "armv7" | "arm" => Some(Arch::Armv7),
            "riscv64" | "riscv64gc" => Some(Arch::Riscv64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Arch::X86_64 => "x86_64",
            Arch::Aarch64 => "aarch64",
            Arch::Armv7 => "armv7",
            Arch::Riscv64 => "riscv64",
        }
    }
}

/// A supported (OS, architecture) pair and the artifact naming it maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Target {
    pub os: Os,
    pub arch: Arch,
    pub triple: &'static str,
    pub archive_ext: &'static str,
}

impl Target {
    /// Suffix of the executable inside the archive.
    pub fn exe_suffix(&self) -> &'static str {
        match self.os {
            Os::Windows => ".exe",
            _ => "",
        }
    }
}

pub const SUPPORTED_TARGETS: &[Target] = &[
    Target {
        os: Os::Linux,
        arch: Arch::X86_64,
        triple: "x86_64-unknown-linux-musl",
        archive_ext: ".tar.xz",
    },
    Target {
        os: Os::Linux,
        arch: Arch::Aarch64,
        triple: "aarch64-unknown-linux-musl",
        archive_ext: ".tar.xz",
    },
    Target {
        os: Os::Linux,
        arch: Arch::Armv7,
        triple: "armv7-unknown-linux-musleabi",
        archive_ext: ".tar.xz",
    },
    Target {
        os: Os::Linux,
        arch: Arch::Riscv64,
        triple: "riscv64gc-unknown-linux-gnu",
        archive_ext: ".tar.xz",
    },
    Target {
        os: Os::MacOs,
        arch: Arch::X86_64,
        triple: "x86_64-apple-darwin",
        archive_ext: ".tar.xz",
    },
    Target {
        os: Os::MacOs,
        arch: Arch::Aarch64,
        triple: "aarch64-apple-darwin",
        archive_ext: ".tar.xz",
    },
    Target {
        os: Os::Windows,
        arch: Arch::X86_64,
        triple: "x86_64-pc-windows-msvc",
        archive_ext: ".zip",
    },
    Target {
        os: Os::Windows,
        arch: Arch::Aarch64,
        triple: "aarch64-pc-windows-msvc",
        archive_ext: ".zip",
    },
];

pub fn supported_targets() -> &'static [Target] {
    SUPPORTED_TARGETS
}

/// Map a platform to its release target.
///
/// Unknown OS values and unknown architectures are both reported with the
/// original, unnormalised values.
#[tracing::instrument]
pub fn resolve_target(platform: &Platform) -> Result<Target> {
    let unsupported = || InstallError::UnsupportedPlatform {
        os: platform.os.clone(),
        arch: platform.arch.clone(),
    };

    let os = Os::parse(&platform.os).ok_or_else(unsupported)?;
    let arch = Arch::parse(&platform.arch).ok_or_else(unsupported)?;

    let target = SUPPORTED_TARGETS
        .iter()
        .find(|t| t.os == os && t.arch == arch)
        .copied()
        .ok_or_else(unsupported)?;

    log::debug!("Resolved {} to {}", platform, target.triple);
    Ok(target)
}
