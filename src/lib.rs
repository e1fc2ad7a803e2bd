//! streampull - fetch and convert remote media through self-provisioned
//! yt-dlp and ffmpeg binaries.
//!
//! This library crate wires the workspace crates together for the binary and
//! for integration testing.

pub mod config;

use std::sync::Arc;

use sp_av::MediaPipeline;
use sp_core::ProgressSink;
use sp_tools::{
    BinaryLocator, InstallCoordinator, InstallPaths, InstallPolicy, ReleaseInstaller, Tool,
};

use crate::config::Config;

/// Long-lived services shared by every request.
#[derive(Debug, Clone)]
pub struct Services {
    pub installs: Arc<InstallCoordinator>,
    pub pipeline: MediaPipeline,
}

/// Build the install coordinator and media pipeline from configuration.
///
/// `install_progress` observes release downloads if an install runs.
pub fn build_services(config: &Config, install_progress: ProgressSink) -> Services {
    let paths = InstallPaths::resolve(config.tools.home.as_deref());
    tracing::debug!("Tool root: {}", paths.root().display());

    let locator = Arc::new(BinaryLocator::with_system_path(paths.clone()));
    if let Some(path) = &config.tools.fetcher_path {
        locator.set_override(Tool::Fetcher, path);
    }
    if let Some(path) = &config.tools.transcoder_path {
        locator.set_override(Tool::Transcoder, path);
    }

    let installer = Arc::new(ReleaseInstaller::from_config(paths, &config.install));
    let installs = Arc::new(
        InstallCoordinator::new(
            locator,
            installer,
            InstallPolicy::from_config(&config.install),
        )
        .with_progress(install_progress)
        .with_version_timeout(config.install.version_timeout()),
    );

    let pipeline = MediaPipeline::new(installs.clone(), config.download.clone());
    Services { installs, pipeline }
}
