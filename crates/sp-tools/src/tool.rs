//! Logical tool identities.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One of the two external executables streampull depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tool {
    /// Media metadata/download tool (yt-dlp).
    Fetcher,
    /// Transcoding tool (ffmpeg).
    Transcoder,
}

impl Tool {
    /// Every tool, in install order.
    pub const ALL: [Tool; 2] = [Tool::Fetcher, Tool::Transcoder];

    /// Logical name used in config and diagnostics.
    pub fn as_str(self) -> &'static str {
        match self {
            Tool::Fetcher => "fetcher",
            Tool::Transcoder => "transcoder",
        }
    }

    /// Executable base name, without any platform suffix.
    pub fn binary_name(self) -> &'static str {
        match self {
            Tool::Fetcher => "yt-dlp",
            Tool::Transcoder => "ffmpeg",
        }
    }

    /// Executable file name on the current platform.
    pub fn executable_name(self) -> String {
        executable_name(self.binary_name())
    }

    /// Argument that prints the tool's version.
    pub fn version_arg(self) -> &'static str {
        match self {
            Tool::Fetcher => "--version",
            Tool::Transcoder => "-version",
        }
    }
}

/// Append `.exe` on Windows.
pub fn executable_name(base: &str) -> String {
    if cfg!(windows) {
        format!("{base}.exe")
    } else {
        base.to_string()
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tool {
    type Err = sp_core::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fetcher" | "yt-dlp" => Ok(Tool::Fetcher),
            "transcoder" | "ffmpeg" => Ok(Tool::Transcoder),
            other => Err(sp_core::Error::Validation(format!("unknown tool '{other}'"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names() {
        assert_eq!(Tool::Fetcher.binary_name(), "yt-dlp");
        assert_eq!(Tool::Transcoder.binary_name(), "ffmpeg");
        assert_eq!(Tool::Transcoder.to_string(), "transcoder");
        if cfg!(windows) {
            assert_eq!(Tool::Fetcher.executable_name(), "yt-dlp.exe");
        } else {
            assert_eq!(Tool::Fetcher.executable_name(), "yt-dlp");
        }
    }

    #[test]
    fn parse_accepts_logical_and_binary_names() {
        assert_eq!("fetcher".parse::<Tool>().unwrap(), Tool::Fetcher);
        assert_eq!("FFmpeg".parse::<Tool>().unwrap(), Tool::Transcoder);
        assert!("mkvmerge".parse::<Tool>().is_err());
    }

    #[test]
    fn serde_lowercase() {
        let json = serde_json::to_string(&Tool::Transcoder).unwrap();
        assert_eq!(json, "\"transcoder\"");
    }
}
