//! Application configuration types.
//!
//! The top-level [`Config`] carries the tool, install, and download sections.
//! Every section defaults sensibly so a completely empty file is valid; the
//! binary decides how the file is read and parsed.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Environment variable that disables auto-installation when set to a truthy value.
pub const NO_AUTO_INSTALL_ENV: &str = "STREAMPULL_NO_AUTO_INSTALL";

/// Environment variable overriding the configuration root directory.
pub const HOME_ENV: &str = "STREAMPULL_HOME";

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub tools: ToolsConfig,
    pub install: InstallConfig,
    pub download: DownloadConfig,
}

impl Config {
    /// Apply environment overrides on top of file values.
    pub fn apply_env(&mut self) {
        if env_flag(std::env::var(NO_AUTO_INSTALL_ENV).ok().as_deref()) {
            self.install.auto_install = false;
        }
        if let Some(home) = std::env::var_os(HOME_ENV).filter(|v| !v.is_empty()) {
            self.tools.home = Some(PathBuf::from(home));
        }
    }

    /// Return a list of validation warnings (non-fatal issues).
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        let d = &self.download;

        for (name, secs) in [
            ("download.metadata_timeout_secs", d.metadata_timeout_secs),
            ("download.download_timeout_secs", d.download_timeout_secs),
            ("download.convert_timeout_secs", d.convert_timeout_secs),
            ("install.connect_timeout_secs", self.install.connect_timeout_secs),
            ("install.download_timeout_secs", self.install.download_timeout_secs),
            ("install.version_timeout_secs", self.install.version_timeout_secs),
        ] {
            if secs == 0 {
                warnings.push(format!("{name} is 0; every run will time out"));
            }
        }

        if d.scan_buffer_bytes < 1024 {
            warnings.push(format!(
                "download.scan_buffer_bytes is {}; progress lines longer than that are ignored",
                d.scan_buffer_bytes
            ));
        }

        if d.video_extensions.is_empty() {
            warnings.push("download.video_extensions is empty; video jobs cannot find output".into());
        }
        if d.audio_extensions.is_empty() {
            warnings.push("download.audio_extensions is empty; audio jobs cannot find output".into());
        }

        for (name, path) in [
            ("fetcher_path", &self.tools.fetcher_path),
            ("transcoder_path", &self.tools.transcoder_path),
        ] {
            if let Some(p) = path {
                if p.components().count() > 1 && !p.exists() {
                    warnings.push(format!(
                        "tools.{name} {} does not exist; falling back to auto-detection",
                        p.display()
                    ));
                }
            }
        }

        warnings
    }
}

/// Interpret an opt-out flag value. Accepts `1`, `true`, and `yes`.
pub fn env_flag(value: Option<&str>) -> bool {
    matches!(
        value.map(|v| v.trim().to_ascii_lowercase()).as_deref(),
        Some("1") | Some("true") | Some("yes")
    )
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// Explicit tool locations and the configuration root.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    /// Override for the fetch tool (yt-dlp).
    pub fetcher_path: Option<PathBuf>,
    /// Override for the transcode tool (ffmpeg).
    pub transcoder_path: Option<PathBuf>,
    /// Root holding `bin/` and marker files. Defaults to `~/.streampull`.
    pub home: Option<PathBuf>,
}

/// Auto-installation policy and release download limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallConfig {
    pub auto_install: bool,
    /// Deadline for establishing a connection to a release server.
    pub connect_timeout_secs: u64,
    /// Deadline for a whole release download, body included.
    pub download_timeout_secs: u64,
    /// Deadline for a tool's version command in `check-tools`.
    pub version_timeout_secs: u64,
}

impl Default for InstallConfig {
    fn default() -> Self {
        Self {
            auto_install: true,
            connect_timeout_secs: 30,
            download_timeout_secs: 10 * 60,
            version_timeout_secs: 10,
        }
    }
}

impl InstallConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs)
    }

    pub fn version_timeout(&self) -> Duration {
        Duration::from_secs(self.version_timeout_secs)
    }
}

/// Download/convert defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadConfig {
    /// Default output directory; the working directory when unset.
    pub output_dir: Option<PathBuf>,
    #[serde(default = "default_metadata_timeout")]
    pub metadata_timeout_secs: u64,
    #[serde(default = "default_download_timeout")]
    pub download_timeout_secs: u64,
    #[serde(default = "default_convert_timeout")]
    pub convert_timeout_secs: u64,
    /// Longest output line inspected for progress markers.
    #[serde(default = "default_scan_buffer")]
    pub scan_buffer_bytes: usize,
    #[serde(default = "default_concurrent_fragments")]
    pub concurrent_fragments: u32,
    #[serde(default = "default_retries")]
    pub retries: u32,
    #[serde(default = "default_buffer_size")]
    pub buffer_size: String,
    #[serde(default = "default_video_extensions")]
    pub video_extensions: Vec<String>,
    #[serde(default = "default_audio_extensions")]
    pub audio_extensions: Vec<String>,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            output_dir: None,
            metadata_timeout_secs: default_metadata_timeout(),
            download_timeout_secs: default_download_timeout(),
            convert_timeout_secs: default_convert_timeout(),
            scan_buffer_bytes: default_scan_buffer(),
            concurrent_fragments: default_concurrent_fragments(),
            retries: default_retries(),
            buffer_size: default_buffer_size(),
            video_extensions: default_video_extensions(),
            audio_extensions: default_audio_extensions(),
        }
    }
}

impl DownloadConfig {
    pub fn metadata_timeout(&self) -> Duration {
        Duration::from_secs(self.metadata_timeout_secs)
    }

    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs)
    }

    pub fn convert_timeout(&self) -> Duration {
        Duration::from_secs(self.convert_timeout_secs)
    }
}

fn default_metadata_timeout() -> u64 {
    120
}

fn default_download_timeout() -> u64 {
    30 * 60
}

fn default_convert_timeout() -> u64 {
    20 * 60
}

fn default_scan_buffer() -> usize {
    1024 * 1024
}

fn default_concurrent_fragments() -> u32 {
    3
}

fn default_retries() -> u32 {
    10
}

fn default_buffer_size() -> String {
    "32K".into()
}

fn default_video_extensions() -> Vec<String> {
    ["mkv", "mp4", "webm", "avi", "mov", "flv"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_audio_extensions() -> Vec<String> {
    ["webm", "m4a", "opus", "ogg", "mp3", "aac"]
        .into_iter()
        .map(String::from)
        .collect()
}
