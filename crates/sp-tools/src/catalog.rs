//! Release artifact table.
//!
//! One entry per tool and platform. The fetcher ships as a standalone
//! executable; the transcoder ships inside an archive and has to be
//! extracted.

use crate::archive::ArchiveFormat;
use crate::tool::Tool;

/// Supported OS/architecture pairs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    LinuxX64,
    LinuxArm64,
    MacosX64,
    MacosArm64,
    WindowsX64,
}

impl Platform {
    /// Detects the current platform at compile time.
    ///
    /// Returns `None` if the platform is unsupported.
    pub fn detect() -> Option<Self> {
        #[cfg(all(target_os = "linux", target_arch = "x86_64"))]
        {
            Some(Platform::LinuxX64)
        }
        #[cfg(all(target_os = "linux", target_arch = "aarch64"))]
        {
            Some(Platform::LinuxArm64)
        }
        #[cfg(all(target_os = "macos", target_arch = "x86_64"))]
        {
            Some(Platform::MacosX64)
        }
        #[cfg(all(target_os = "macos", target_arch = "aarch64"))]
        {
            Some(Platform::MacosArm64)
        }
        #[cfg(all(target_os = "windows", target_arch = "x86_64"))]
        {
            Some(Platform::WindowsX64)
        }
        #[cfg(not(any(
            all(target_os = "linux", target_arch = "x86_64"),
            all(target_os = "linux", target_arch = "aarch64"),
            all(target_os = "macos", target_arch = "x86_64"),
            all(target_os = "macos", target_arch = "aarch64"),
            all(target_os = "windows", target_arch = "x86_64"),
        )))]
        {
            None
        }
    }
}

/// Where to download a tool and how to unpack it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseSource {
    pub url: String,
    /// `None` for a directly executable artifact.
    pub archive: Option<ArchiveFormat>,
}

impl ReleaseSource {
    /// A directly executable artifact.
    pub fn executable(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            archive: None,
        }
    }

    /// An archive that contains the executable.
    pub fn archive(url: impl Into<String>, format: ArchiveFormat) -> Self {
        Self {
            url: url.into(),
            archive: Some(format),
        }
    }
}

const YTDLP_BASE: &str = "https://github.com/yt-dlp/yt-dlp/releases/latest/download";

/// The release artifact for `tool` on `platform`.
pub fn source_for(tool: Tool, platform: Platform) -> Option<ReleaseSource> {
    let source = match (tool, platform) {
        (Tool::Fetcher, Platform::LinuxX64) => {
            ReleaseSource::executable(format!("{YTDLP_BASE}/yt-dlp_linux"))
        }
        (Tool::Fetcher, Platform::LinuxArm64) => {
            ReleaseSource::executable(format!("{YTDLP_BASE}/yt-dlp_linux_aarch64"))
        }
        (Tool::Fetcher, Platform::MacosX64 | Platform::MacosArm64) => {
            ReleaseSource::executable(format!("{YTDLP_BASE}/yt-dlp_macos"))
        }
        (Tool::Fetcher, Platform::WindowsX64) => {
            ReleaseSource::executable(format!("{YTDLP_BASE}/yt-dlp.exe"))
        }
        (Tool::Transcoder, Platform::LinuxX64) => ReleaseSource::archive(
            "https://johnvansickle.com/ffmpeg/releases/ffmpeg-release-amd64-static.tar.xz",
            ArchiveFormat::TarXz,
        ),
        (Tool::Transcoder, Platform::LinuxArm64) => ReleaseSource::archive(
            "https://johnvansickle.com/ffmpeg/releases/ffmpeg-release-arm64-static.tar.xz",
            ArchiveFormat::TarXz,
        ),
        // The evermeet URL has no file suffix, so the format is explicit.
        (Tool::Transcoder, Platform::MacosX64 | Platform::MacosArm64) => ReleaseSource::archive(
            "https://evermeet.cx/ffmpeg/getrelease/ffmpeg/zip",
            ArchiveFormat::Zip,
        ),
        (Tool::Transcoder, Platform::WindowsX64) => ReleaseSource::archive(
            "https://github.com/BtbN/FFmpeg-Builds/releases/download/latest/ffmpeg-master-latest-win64-gpl.zip",
            ArchiveFormat::Zip,
        ),
    };
    Some(source)
}

/// The release artifact for `tool` on the running platform.
pub fn current_source(tool: Tool) -> Option<ReleaseSource> {
    Platform::detect().and_then(|p| source_for(tool, p))
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_PLATFORMS: [Platform; 5] = [
        Platform::LinuxX64,
        Platform::LinuxArm64,
        Platform::MacosX64,
        Platform::MacosArm64,
        Platform::WindowsX64,
    ];

    #[test]
    fn fetcher_is_always_a_direct_executable() {
        for platform in ALL_PLATFORMS {
            let src = source_for(Tool::Fetcher, platform).unwrap();
            assert!(src.archive.is_none(), "{platform:?}");
            assert!(src.url.starts_with("https://"));
        }
    }

    #[test]
    fn transcoder_is_always_an_archive() {
        for platform in ALL_PLATFORMS {
            let src = source_for(Tool::Transcoder, platform).unwrap();
            assert!(src.archive.is_some(), "{platform:?}");
        }
    }

    #[test]
    fn suffix_inference_agrees_with_table() {
        for platform in ALL_PLATFORMS {
            let src = source_for(Tool::Transcoder, platform).unwrap();
            if let Some(inferred) = ArchiveFormat::from_name(&src.url) {
                assert_eq!(Some(inferred), src.archive);
            }
        }
    }

    #[test]
    fn windows_fetcher_is_exe() {
        let src = source_for(Tool::Fetcher, Platform::WindowsX64).unwrap();
        assert!(src.url.ends_with(".exe"));
    }
}
