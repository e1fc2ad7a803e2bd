//! Fetch and conditional transcode.
//!
//! A job runs in up to two subprocess steps:
//!
//! 1. the fetcher writes `<dir>/<kind>_<id>.<ext>`, choosing `<ext>` itself;
//!    the pipeline finds the file by probing the job's extension list
//! 2. if that extension differs from the requested format, the transcoder
//!    writes `<dir>/<kind>_<id>.<format>` and the fetched file is removed
//!
//! A failed fetch, or one whose output matches none of the expected
//! extensions, removes every file carrying the job's stem. A failed
//! transcode removes its own partial output but keeps the fetched file.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use sp_core::config::DownloadConfig;
use sp_core::{DownloadProgress, Error, Result, Stage};
use sp_tools::{InstallCoordinator, Tool};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::command::ToolCommand;
use crate::job::{JobPlan, MediaJob, MediaKind};

/// Extension placeholder the fetcher substitutes.
pub const EXT_PLACEHOLDER: &str = "%(ext)s";

/// Entry point for metadata lookups and media downloads.
///
/// Cheap to share behind an `Arc`; jobs hold no shared mutable state apart
/// from the install coordinator.
#[derive(Debug, Clone)]
pub struct MediaPipeline {
    installs: Arc<InstallCoordinator>,
    settings: DownloadConfig,
}

impl MediaPipeline {
    pub fn new(installs: Arc<InstallCoordinator>, settings: DownloadConfig) -> Self {
        Self { installs, settings }
    }

    pub fn installs(&self) -> &Arc<InstallCoordinator> {
        &self.installs
    }

    pub fn settings(&self) -> &DownloadConfig {
        &self.settings
    }

    /// Fetch the raw metadata document for `url`.
    pub async fn fetch_metadata(&self, url: &str) -> Result<serde_json::Value> {
        if url.trim().is_empty() {
            return Err(Error::Validation("URL is required".into()));
        }
        self.installs.ensure_installed().await;
        let fetcher = self.installs.require(Tool::Fetcher)?;

        info!("Fetching metadata for {url}");
        let output = ToolCommand::new(fetcher)
            .args(["--dump-json", "--no-playlist", "--no-warnings", url])
            .timeout(self.settings.metadata_timeout())
            .execute(Stage::Metadata)
            .await?;

        serde_json::from_str(output.stdout.trim())
            .map_err(|e| Error::Metadata(format!("fetcher returned invalid JSON: {e}")))
    }

    /// Resolve the direct media URL behind a page URL without downloading.
    ///
    /// The fetcher may print several URLs (separate video and audio
    /// streams); the first one is returned.
    pub async fn resolve_stream_url(&self, url: &str) -> Result<String> {
        if url.trim().is_empty() {
            return Err(Error::Validation("URL is required".into()));
        }
        self.installs.ensure_installed().await;
        let fetcher = self.installs.require(Tool::Fetcher)?;

        info!("Resolving stream URL for {url}");
        let output = ToolCommand::new(fetcher)
            .args(["-g", "-f", "best", url])
            .timeout(self.settings.metadata_timeout())
            .execute(Stage::Metadata)
            .await?;

        output
            .stdout
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .map(str::to_string)
            .ok_or_else(|| Error::Metadata("fetcher printed no stream URL".into()))
    }

    /// Download the job's media and convert it if needed.
    ///
    /// Returns the absolute path of the final file.
    pub async fn download(&self, job: MediaJob) -> Result<PathBuf> {
        self.installs.ensure_installed().await;
        let fetcher = self.installs.require(Tool::Fetcher)?;

        let plan = job.plan(&self.settings)?;
        let dir = &plan.output_dir;
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|source| Error::DirectoryCreateFailed {
                path: dir.clone(),
                source,
            })?;

        let stem = format!("{}_{}", plan.kind, Uuid::new_v4().simple());
        let template = dir.join(format!("{stem}.{EXT_PLACEHOLDER}"));
        info!("Downloading {} from {} to {}", plan.kind, job.url, template.display());

        job.progress.stage(&format!("Downloading {}", plan.kind));
        let mut fetch = self.fetch_command(fetcher, &plan, &template, &job.url);
        if let Some(token) = &job.cancel {
            fetch.cancel_on(token.clone());
        }
        if let Err(e) = fetch.stream(Stage::Download, &job.progress).await {
            remove_partials(dir, &stem).await;
            return Err(e);
        }

        let Some(fetched) = find_output(dir, &stem, &plan.extensions).await else {
            remove_partials(dir, &stem).await;
            return Err(Error::OutputNotFound {
                template: template.display().to_string(),
            });
        };
        let fetched_ext = extension_of(&fetched);
        debug!("Fetcher produced {}", fetched.display());

        let result = if plan.needs_transcode(&fetched_ext) {
            let transcoder = self.installs.require(Tool::Transcoder)?;
            let target = dir.join(format!("{stem}.{}", plan.format));
            info!(
                "Converting {} from {} to {}",
                plan.kind, fetched_ext, plan.format
            );

            job.progress.stage(&format!("Converting {} format", plan.kind));
            let mut convert = self.transcode_command(transcoder, &plan, &fetched, &target);
            if let Some(token) = &job.cancel {
                convert.cancel_on(token.clone());
            }
            if let Err(e) = convert.stream(Stage::Convert, &job.progress).await {
                remove_quietly(&target).await;
                return Err(e);
            }
            if !tokio::fs::try_exists(&target).await.unwrap_or(false) {
                return Err(Error::OutputNotFound {
                    template: target.display().to_string(),
                });
            }
            remove_quietly(&fetched).await;
            target
        } else {
            fetched
        };

        job.progress.emit(DownloadProgress::completed());
        let result = tokio::fs::canonicalize(&result).await?;
        info!("Finished {}", result.display());
        Ok(result)
    }

    fn fetch_command(
        &self,
        fetcher: PathBuf,
        plan: &JobPlan,
        template: &Path,
        url: &str,
    ) -> ToolCommand {
        let s = &self.settings;
        let retries = s.retries.to_string();
        let mut cmd = ToolCommand::new(fetcher);
        cmd.args(["-f", &plan.selector()])
            .arg("-o")
            .arg(template.to_string_lossy())
            .args(["--no-part", "--newline"])
            .args(["--concurrent-fragments", &s.concurrent_fragments.to_string()])
            .args(["--buffer-size", &s.buffer_size])
            .args(["--retries", &retries, "--fragment-retries", &retries])
            .arg(url)
            .timeout(s.download_timeout())
            .scan_buffer(s.scan_buffer_bytes);
        cmd
    }

    fn transcode_command(
        &self,
        transcoder: PathBuf,
        plan: &JobPlan,
        input: &Path,
        output: &Path,
    ) -> ToolCommand {
        let mut cmd = ToolCommand::new(transcoder);
        cmd.arg("-i").arg(input.to_string_lossy());
        match plan.kind {
            MediaKind::Video => {
                cmd.args(["-c", "copy", "-movflags", "+faststart"]);
            }
            MediaKind::Audio => {
                cmd.args(["-vn", "-acodec", &plan.codec, "-ab", &plan.bitrate]);
            }
        }
        cmd.args(["-max_muxing_queue_size", "1024", "-y"])
            .arg(output.to_string_lossy())
            .timeout(self.settings.convert_timeout())
            .scan_buffer(self.settings.scan_buffer_bytes);
        cmd
    }
}

/// First `<dir>/<stem>.<ext>` that exists, in `extensions` order.
async fn find_output(dir: &Path, stem: &str, extensions: &[String]) -> Option<PathBuf> {
    for ext in extensions {
        let candidate = dir.join(format!("{stem}.{ext}"));
        if tokio::fs::try_exists(&candidate).await.unwrap_or(false) {
            return Some(candidate);
        }
    }
    None
}

fn extension_of(path: &Path) -> String {
    path.extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default()
}

/// Remove every file in `dir` whose name starts with `stem`.
async fn remove_partials(dir: &Path, stem: &str) {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Could not scan {} for partial output: {}", dir.display(), e);
            return;
        }
    };
    loop {
        match entries.next_entry().await {
            Ok(Some(entry)) => {
                if entry.file_name().to_string_lossy().starts_with(stem) {
                    remove_quietly(&entry.path()).await;
                }
            }
            Ok(None) => break,
            Err(e) => {
                warn!("Error while scanning {}: {}", dir.display(), e);
                break;
            }
        }
    }
}

async fn remove_quietly(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!("Removed {}", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove {}: {}", path.display(), e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sp_tools::{BinaryLocator, InstallPaths, InstallPolicy, ReleaseInstaller};

    fn pipeline(root: &Path) -> MediaPipeline {
        let paths = InstallPaths::new(root);
        let locator = Arc::new(BinaryLocator::with_system_path(paths.clone()));
        let installer = Arc::new(ReleaseInstaller::new(paths));
        let installs = Arc::new(InstallCoordinator::new(
            locator,
            installer,
            InstallPolicy {
                auto_install: false,
            },
        ));
        MediaPipeline::new(installs, DownloadConfig::default())
    }

    #[test]
    fn fetch_arguments() {
        let dir = tempfile::tempdir().unwrap();
        let p = pipeline(dir.path());
        let plan = MediaJob::video("https://youtu.be/x")
            .plan(p.settings())
            .unwrap();
        let template = Path::new("/out/video_1.%(ext)s");
        let cmd = p.fetch_command(PathBuf::from("yt-dlp"), &plan, template, "https://youtu.be/x");

        assert_eq!(
            cmd.get_args(),
            [
                "-f",
                "bestvideo[height<=720][vcodec*=avc1]+bestaudio/best",
                "-o",
                "/out/video_1.%(ext)s",
                "--no-part",
                "--newline",
                "--concurrent-fragments",
                "3",
                "--buffer-size",
                "32K",
                "--retries",
                "10",
                "--fragment-retries",
                "10",
                "https://youtu.be/x",
            ]
        );
    }

    #[test]
    fn video_transcode_is_a_stream_copy() {
        let dir = tempfile::tempdir().unwrap();
        let p = pipeline(dir.path());
        let plan = MediaJob::video("u").format("mkv").plan(p.settings()).unwrap();
        let cmd = p.transcode_command(
            PathBuf::from("ffmpeg"),
            &plan,
            Path::new("a.webm"),
            Path::new("a.mkv"),
        );
        assert_eq!(
            cmd.get_args(),
            [
                "-i",
                "a.webm",
                "-c",
                "copy",
                "-movflags",
                "+faststart",
                "-max_muxing_queue_size",
                "1024",
                "-y",
                "a.mkv",
            ]
        );
    }

    #[test]
    fn audio_transcode_reencodes() {
        let dir = tempfile::tempdir().unwrap();
        let p = pipeline(dir.path());
        let plan = MediaJob::audio("u").bitrate("192k").plan(p.settings()).unwrap();
        let cmd = p.transcode_command(
            PathBuf::from("ffmpeg"),
            &plan,
            Path::new("a.webm"),
            Path::new("a.mp3"),
        );
        assert_eq!(
            cmd.get_args(),
            [
                "-i",
                "a.webm",
                "-vn",
                "-acodec",
                "libmp3lame",
                "-ab",
                "192k",
                "-max_muxing_queue_size",
                "1024",
                "-y",
                "a.mp3",
            ]
        );
    }

    #[tokio::test]
    async fn output_lookup_respects_order() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("audio_x.m4a"), b"").unwrap();
        std::fs::write(dir.path().join("audio_x.webm"), b"").unwrap();
        let exts: Vec<String> = ["webm", "m4a"].iter().map(|s| s.to_string()).collect();

        let found = find_output(dir.path(), "audio_x", &exts).await.unwrap();
        assert_eq!(extension_of(&found), "webm");
        assert!(find_output(dir.path(), "audio_y", &exts).await.is_none());
    }

    #[tokio::test]
    async fn partial_cleanup_only_touches_the_job_stem() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("video_abc.webm.part"), b"").unwrap();
        std::fs::write(dir.path().join("video_abc.f137.mp4"), b"").unwrap();
        std::fs::write(dir.path().join("video_def.mp4"), b"").unwrap();

        remove_partials(dir.path(), "video_abc").await;

        let left: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(left, vec!["video_def.mp4"]);
    }

    #[tokio::test]
    async fn empty_metadata_url_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let err = pipeline(dir.path()).fetch_metadata(" ").await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        let err = pipeline(dir.path()).resolve_stream_url("").await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }
}
