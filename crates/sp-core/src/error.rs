//! Unified error type for streampull.
//!
//! All crates funnel their failures into [`Error`]. Subprocess failures carry
//! the pipeline [`Stage`] they happened in plus a [`SubprocessError`] cause,
//! so callers can tell a fetch timeout apart from a transcode crash.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Pipeline stage that launched an external process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Metadata lookup through the fetch tool.
    Metadata,
    /// Media download through the fetch tool.
    Download,
    /// Container/codec conversion through the transcode tool.
    Convert,
}

impl Stage {
    /// Label attached to tool-level progress events for this stage.
    pub fn progress_label(self) -> &'static str {
        match self {
            Stage::Metadata => "metadata",
            Stage::Download => "downloading",
            Stage::Convert => "converting",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Metadata => "metadata",
            Stage::Download => "download",
            Stage::Convert => "convert",
        };
        f.write_str(s)
    }
}

/// Why an external process did not complete successfully.
#[derive(Debug, thiserror::Error)]
pub enum SubprocessError {
    /// The process could not be started (missing binary, permissions, ...).
    #[error("failed to launch {program}: {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The process ran but exited unsuccessfully.
    #[error("{program} exited with {status}: {detail}")]
    Exit {
        program: String,
        /// Rendered exit status.
        status: String,
        /// Last diagnostic line and any output-drain error.
        detail: String,
    },

    /// The deadline expired and the process was killed.
    #[error("{program} timed out after {timeout:?}")]
    TimedOut { program: String, timeout: Duration },

    /// The caller cancelled the run and the process was killed.
    #[error("{program} was cancelled")]
    Cancelled { program: String },

    /// Waiting on the process failed.
    #[error("I/O error waiting for {program}: {source}")]
    Wait {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// Unified error type covering all failure modes in streampull.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A required tool is neither installed locally nor resolvable on `PATH`
    /// after the one installation attempt.
    #[error("{tool} is unavailable: {reason}")]
    InstallUnavailable {
        /// Logical tool name.
        tool: String,
        /// Why it is unavailable (usually the install failure message).
        reason: String,
    },

    /// An install completed but the expected executable is not on disk.
    #[error("installation of {tool} could not be verified at {}", .path.display())]
    InstallVerificationFailed { tool: String, path: PathBuf },

    /// No archive entry matched the executable being installed.
    #[error("{target} not found in archive {}", .archive.display())]
    NotFoundInArchive { target: String, archive: PathBuf },

    /// There is no release artifact for this OS/architecture.
    #[error("no release of {tool} is available for this platform")]
    UnsupportedPlatform { tool: String },

    /// A release artifact could not be fetched.
    #[error("download of {url} failed: {message}")]
    DownloadFailed { url: String, message: String },

    /// An external process failed during the given stage.
    #[error("{stage} step failed: {source}")]
    SubprocessFailed {
        stage: Stage,
        #[source]
        source: SubprocessError,
    },

    /// The fetch tool reported success but no file matched the template.
    #[error("no output file matched {template}")]
    OutputNotFound { template: String },

    /// The job's output directory could not be created.
    #[error("failed to create directory {}: {source}", .path.display())]
    DirectoryCreateFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Metadata output could not be interpreted.
    #[error("Metadata error: {0}")]
    Metadata(String),

    /// Caller-supplied data failed validation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// An I/O operation failed.
    #[error("IO error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// Catch-all for unexpected internal errors.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Convenience constructor for [`Error::SubprocessFailed`].
    pub fn subprocess(stage: Stage, source: SubprocessError) -> Self {
        Error::SubprocessFailed { stage, source }
    }

    /// Convenience constructor for [`Error::DownloadFailed`].
    pub fn download(url: impl Into<String>, message: impl fmt::Display) -> Self {
        Error::DownloadFailed {
            url: url.into(),
            message: message.to_string(),
        }
    }

    /// Convenience constructor for [`Error::InstallUnavailable`].
    pub fn unavailable(tool: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::InstallUnavailable {
            tool: tool.into(),
            reason: reason.into(),
        }
    }

    /// Stage of a subprocess failure, if this is one.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Error::SubprocessFailed { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// Whether this error is a subprocess deadline expiry.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Error::SubprocessFailed {
                source: SubprocessError::TimedOut { .. },
                ..
            }
        )
    }

    /// Whether this error is a caller-requested cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(
            self,
            Error::SubprocessFailed {
                source: SubprocessError::Cancelled { .. },
                ..
            }
        )
    }
}

/// Result alias using the crate-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_display() {
        assert_eq!(Stage::Download.to_string(), "download");
        assert_eq!(Stage::Convert.to_string(), "convert");
        assert_eq!(Stage::Metadata.to_string(), "metadata");
        assert_eq!(Stage::Convert.progress_label(), "converting");
    }

    #[test]
    fn subprocess_exit_display() {
        let err = Error::subprocess(
            Stage::Convert,
            SubprocessError::Exit {
                program: "ffmpeg".into(),
                status: "exit status: 1".into(),
                detail: "Invalid data found when processing input".into(),
            },
        );
        assert_eq!(
            err.to_string(),
            "convert step failed: ffmpeg exited with exit status: 1: Invalid data found when processing input"
        );
        assert_eq!(err.stage(), Some(Stage::Convert));
        assert!(!err.is_timeout());
    }

    #[test]
    fn timeout_is_classified() {
        let err = Error::subprocess(
            Stage::Download,
            SubprocessError::TimedOut {
                program: "yt-dlp".into(),
                timeout: Duration::from_secs(2),
            },
        );
        assert!(err.is_timeout());
        assert!(!err.is_cancelled());
        assert_eq!(err.stage(), Some(Stage::Download));
        assert!(err.to_string().contains("timed out"));
    }

    #[test]
    fn source_chain_is_preserved() {
        use std::error::Error as _;

        let err = Error::subprocess(
            Stage::Download,
            SubprocessError::Launch {
                program: "yt-dlp".into(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
            },
        );
        let cause = err.source().expect("subprocess error is the source");
        assert!(cause.to_string().contains("failed to launch yt-dlp"));
        assert!(cause.source().is_some());
    }

    #[test]
    fn not_found_in_archive_display() {
        let err = Error::NotFoundInArchive {
            target: "ffmpeg".into(),
            archive: PathBuf::from("/tmp/pkg.zip"),
        };
        assert_eq!(err.to_string(), "ffmpeg not found in archive /tmp/pkg.zip");
        assert_eq!(err.stage(), None);
    }

    #[test]
    fn io_from_std() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
        let err = Error::from(io_err);
        assert!(matches!(err, Error::Io { .. }));
    }

    #[test]
    fn unavailable_display() {
        let err = Error::unavailable("fetcher", "download of x failed");
        assert_eq!(err.to_string(), "fetcher is unavailable: download of x failed");
    }
}
