//! Release download and installation.
//!
//! [`ReleaseInstaller`] fetches the platform artifact for a tool into a
//! staging file inside `<root>/bin`, then either renames it into place
//! (standalone executables) or extracts the executable from it (archives).
//! Staging files are scoped to the install call and removed on every exit
//! path.

use async_trait::async_trait;
use futures::StreamExt;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use sp_core::config::InstallConfig;
use sp_core::{DownloadProgress, Error, ProgressSink, Result};

use crate::archive::{self, ArchiveFormat};
use crate::catalog::{self, ReleaseSource};
use crate::paths::InstallPaths;
use crate::tool::Tool;

/// Interval between byte-count progress events.
const PROGRESS_STEP: u64 = 1024 * 1024;

/// Installs a single tool into the local `bin` directory.
#[async_trait]
pub trait ToolInstaller: Send + Sync + fmt::Debug {
    /// Install `tool` and return the path of the installed executable.
    async fn install(&self, tool: Tool, progress: &ProgressSink) -> Result<PathBuf>;
}

/// Installer that downloads official release artifacts.
#[derive(Debug, Clone)]
pub struct ReleaseInstaller {
    client: reqwest::Client,
    paths: InstallPaths,
    sources: HashMap<Tool, ReleaseSource>,
}

impl ReleaseInstaller {
    /// Installer with the default connect and download deadlines.
    pub fn new(paths: InstallPaths) -> Self {
        Self::from_config(paths, &InstallConfig::default())
    }

    /// Installer whose HTTP client is bounded by the configured deadlines.
    pub fn from_config(paths: InstallPaths, config: &InstallConfig) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(concat!("streampull/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(config.connect_timeout())
            .timeout(config.download_timeout())
            .build()
            .unwrap_or_else(|e| {
                warn!("Falling back to a default HTTP client: {e}");
                reqwest::Client::new()
            });
        Self {
            client,
            paths,
            sources: HashMap::new(),
        }
    }

    /// Replace the catalog entry for `tool`.
    pub fn with_source(mut self, tool: Tool, source: ReleaseSource) -> Self {
        self.sources.insert(tool, source);
        self
    }

    /// The artifact that would be installed for `tool` on this platform.
    pub fn source(&self, tool: Tool) -> Option<ReleaseSource> {
        self.sources
            .get(&tool)
            .cloned()
            .or_else(|| catalog::current_source(tool))
    }

    pub fn paths(&self) -> &InstallPaths {
        &self.paths
    }

    /// Stream `url` into `dest`, reporting progress under `label`.
    ///
    /// Returns the number of bytes written.
    pub async fn download(
        &self,
        url: &str,
        dest: &Path,
        label: &str,
        progress: &ProgressSink,
    ) -> Result<u64> {
        info!("Downloading {} to {}", url, dest.display());

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| request_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::download(
                url,
                format!(
                    "HTTP {} {}",
                    status.as_u16(),
                    status.canonical_reason().unwrap_or("Unknown error")
                ),
            ));
        }

        let total_bytes = response.content_length();
        debug!("Content-Length: {:?}", total_bytes);

        let mut file = tokio::fs::File::create(dest).await?;
        let mut stream = response.bytes_stream();
        let mut bytes_downloaded: u64 = 0;
        let mut next_report = PROGRESS_STEP;

        progress.emit(DownloadProgress::bytes(label, 0, total_bytes));

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| request_error(url, e))?;
            file.write_all(&chunk).await?;
            bytes_downloaded += chunk.len() as u64;

            if bytes_downloaded >= next_report {
                progress.emit(DownloadProgress::bytes(label, bytes_downloaded, total_bytes));
                next_report = (bytes_downloaded / PROGRESS_STEP + 1) * PROGRESS_STEP;
            }
        }

        file.flush().await?;
        file.sync_all().await?;

        progress.emit(DownloadProgress::bytes(label, bytes_downloaded, total_bytes));
        info!("Downloaded {} bytes from {}", bytes_downloaded, url);
        Ok(bytes_downloaded)
    }
}

fn request_error(url: &str, e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::download(url, format!("timed out: {e}"))
    } else {
        Error::download(url, e)
    }
}

#[async_trait]
impl ToolInstaller for ReleaseInstaller {
    async fn install(&self, tool: Tool, progress: &ProgressSink) -> Result<PathBuf> {
        let source = self.source(tool).ok_or_else(|| Error::UnsupportedPlatform {
            tool: tool.to_string(),
        })?;

        let bin_dir = self.paths.bin_dir();
        tokio::fs::create_dir_all(&bin_dir).await?;
        let target = self.paths.local_binary(tool);

        let suffix = source.archive.map(ArchiveFormat::suffix).unwrap_or("");
        let staging = tempfile::Builder::new()
            .prefix(".download-")
            .suffix(suffix)
            .tempfile_in(&bin_dir)?
            .into_temp_path();

        let label = format!("Downloading {}", tool.binary_name());
        self.download(&source.url, &staging, &label, progress).await?;

        match source.archive {
            None => {
                staging.persist(&target).map_err(|e| Error::from(e.error))?;
            }
            Some(format) => {
                let name = tool.executable_name();
                let dest_dir = bin_dir.clone();
                let final_path = target.clone();
                // The staging archive moves into the task and is removed when it ends.
                tokio::task::spawn_blocking(move || -> Result<()> {
                    let scratch = tempfile::Builder::new()
                        .prefix(".extract-")
                        .tempdir_in(&dest_dir)?;
                    let extracted = archive::extract(&staging, format, scratch.path(), &name)?;
                    std::fs::rename(&extracted, &final_path)?;
                    Ok(())
                })
                .await
                .map_err(|e| Error::Internal(format!("extraction task failed: {e}")))??;
            }
        }

        archive::make_executable(&target)?;
        if !target.is_file() {
            return Err(Error::InstallVerificationFailed {
                tool: tool.to_string(),
                path: target,
            });
        }

        info!("Installed {} at {}", tool.binary_name(), target.display());
        Ok(target)
    }
}
