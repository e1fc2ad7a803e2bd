//! Per-request media job description.

use std::fmt;
use std::path::PathBuf;

use sp_core::config::DownloadConfig;
use sp_core::{Error, ProgressSink, Result};
use tokio_util::sync::CancellationToken;

/// What the job produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Video,
    Audio,
}

impl MediaKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MediaKind::Video => "video",
            MediaKind::Audio => "audio",
        }
    }

    pub fn default_format(self) -> &'static str {
        match self {
            MediaKind::Video => "mp4",
            MediaKind::Audio => "mp3",
        }
    }

    pub fn default_codec(self) -> &'static str {
        match self {
            MediaKind::Video => "avc1",
            MediaKind::Audio => "libmp3lame",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub const DEFAULT_RESOLUTION: &str = "720";
pub const DEFAULT_BITRATE: &str = "128k";

/// A single download request. Unset fields take the kind's defaults.
#[derive(Debug, Clone)]
pub struct MediaJob {
    pub url: String,
    pub kind: MediaKind,
    pub format: Option<String>,
    /// Maximum video height, e.g. `720` or `1080p`. Ignored for audio.
    pub resolution: Option<String>,
    pub codec: Option<String>,
    /// Audio bitrate for re-encoding, e.g. `192k`. Ignored for video.
    pub bitrate: Option<String>,
    pub output_dir: Option<PathBuf>,
    /// Extension lookup order; falls back to the configured list.
    pub extensions: Option<Vec<String>>,
    pub progress: ProgressSink,
    pub cancel: Option<CancellationToken>,
}

impl MediaJob {
    pub fn new(kind: MediaKind, url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            kind,
            format: None,
            resolution: None,
            codec: None,
            bitrate: None,
            output_dir: None,
            extensions: None,
            progress: ProgressSink::none(),
            cancel: None,
        }
    }

    pub fn video(url: impl Into<String>) -> Self {
        Self::new(MediaKind::Video, url)
    }

    pub fn audio(url: impl Into<String>) -> Self {
        Self::new(MediaKind::Audio, url)
    }

    pub fn format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    pub fn resolution(mut self, resolution: impl Into<String>) -> Self {
        self.resolution = Some(resolution.into());
        self
    }

    pub fn codec(mut self, codec: impl Into<String>) -> Self {
        self.codec = Some(codec.into());
        self
    }

    pub fn bitrate(mut self, bitrate: impl Into<String>) -> Self {
        self.bitrate = Some(bitrate.into());
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    pub fn extensions<S: Into<String>>(mut self, exts: impl IntoIterator<Item = S>) -> Self {
        self.extensions = Some(exts.into_iter().map(Into::into).collect());
        self
    }

    pub fn progress(mut self, progress: impl Into<ProgressSink>) -> Self {
        self.progress = progress.into();
        self
    }

    pub fn cancel_on(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Fill in defaults and validate.
    pub fn plan(&self, defaults: &DownloadConfig) -> Result<JobPlan> {
        if self.url.trim().is_empty() {
            return Err(Error::Validation("URL is required".into()));
        }

        let format = normalize_ext(self.format.as_deref())
            .unwrap_or_else(|| self.kind.default_format().to_string());
        let codec = non_empty(self.codec.as_deref())
            .unwrap_or(self.kind.default_codec())
            .to_string();
        let bitrate = non_empty(self.bitrate.as_deref())
            .unwrap_or(DEFAULT_BITRATE)
            .to_string();

        let resolution = non_empty(self.resolution.as_deref()).unwrap_or(DEFAULT_RESOLUTION);
        let resolution = resolution
            .trim_end_matches(['p', 'P'])
            .parse::<u32>()
            .map_err(|_| Error::Validation(format!("invalid resolution '{resolution}'")))?;

        let extensions: Vec<String> = self
            .extensions
            .clone()
            .unwrap_or_else(|| match self.kind {
                MediaKind::Video => defaults.video_extensions.clone(),
                MediaKind::Audio => defaults.audio_extensions.clone(),
            })
            .iter()
            .filter_map(|e| normalize_ext(Some(e.as_str())))
            .collect();
        if extensions.is_empty() {
            return Err(Error::Validation(format!(
                "no {} extensions to look for",
                self.kind
            )));
        }

        let output_dir = self
            .output_dir
            .clone()
            .or_else(|| defaults.output_dir.clone())
            .unwrap_or_else(|| PathBuf::from("."));

        Ok(JobPlan {
            kind: self.kind,
            format,
            codec,
            bitrate,
            resolution,
            extensions,
            output_dir,
        })
    }
}

/// A job with every parameter resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobPlan {
    pub kind: MediaKind,
    pub format: String,
    pub codec: String,
    pub bitrate: String,
    pub resolution: u32,
    pub extensions: Vec<String>,
    pub output_dir: PathBuf,
}

impl JobPlan {
    /// Format selector handed to the fetcher.
    pub fn selector(&self) -> String {
        match self.kind {
            MediaKind::Video => format!(
                "bestvideo[height<={}][vcodec*={}]+bestaudio/best",
                self.resolution, self.codec
            ),
            MediaKind::Audio => "bestaudio".to_string(),
        }
    }

    /// Whether a fetched file with extension `ext` must be converted.
    ///
    /// Only the container is compared; codec and bitrate never force a
    /// conversion on their own.
    pub fn needs_transcode(&self, ext: &str) -> bool {
        !self.format.eq_ignore_ascii_case(ext)
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn normalize_ext(value: Option<&str>) -> Option<String> {
    non_empty(value)
        .map(|v| v.trim_start_matches('.').to_ascii_lowercase())
        .filter(|v| !v.is_empty())
}
