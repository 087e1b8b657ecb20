//! Install a prebuilt command-line tool from its published release archives.
//!
//! The host OS and architecture are mapped to a platform triple, the archive
//! for that triple is downloaded and unpacked, and the executable is placed
//! into a destination directory. Temporary files never outlive the run.

pub mod archive;
pub mod cancel;
pub mod checksum;
pub mod cleanup;
pub mod config;
pub mod download;
pub mod error;
pub mod http;
pub mod install;
pub mod lock;
pub mod platform;
pub mod release;
pub mod runtime;

pub use config::InstallConfig;
pub use error::InstallError;
pub use install::{install, resolve};
