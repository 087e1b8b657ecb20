//! Platform detection and target resolution
//!
//! This module detects the OS and architecture the installer runs on and maps
//! them to the platform-triple used to name release archives.

mod detection;
mod targets;

pub use detection::Platform;
pub use targets::{Arch, Os, SUPPORTED_TARGETS, Target, resolve_target, supported_targets};
