//! # sp-tools
//!
//! Provisioning for the two external executables streampull drives.
//!
//! This crate provides:
//!
//! - **Tool identity** ([`Tool`]) -- the logical `fetcher` (yt-dlp) and
//!   `transcoder` (ffmpeg) names and their platform executable names.
//! - **Location** ([`BinaryLocator`]) -- override > local install > `PATH`
//!   resolution that never fails, ending in the bare name.
//! - **Extraction** ([`archive`]) -- pull one executable out of a zip or
//!   (compressed) tar without buffering the archive.
//! - **Installation** ([`ReleaseInstaller`]) -- stream a platform release
//!   artifact to disk with progress reporting.
//! - **Coordination** ([`InstallCoordinator`]) -- the process-wide,
//!   run-at-most-once decision about whether to install anything.

pub mod archive;
pub mod catalog;
pub mod coordinator;
pub mod installer;
pub mod locator;
pub mod paths;
pub mod tool;

// ---- Re-exports for convenience ----

pub use archive::ArchiveFormat;
pub use catalog::{Platform, ReleaseSource};
pub use coordinator::{
    CoordinatorState, InstallCoordinator, InstallPolicy, InstallReport, InstallState, SkipReason,
    ToolInfo,
};
pub use installer::{ReleaseInstaller, ToolInstaller};
pub use locator::{BinaryLocator, PathLookup, ToolSource, WhichLookup};
pub use paths::InstallPaths;
pub use tool::Tool;
