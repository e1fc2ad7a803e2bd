use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "streampull")]
#[command(author, version, about = "Fetch and convert remote media with yt-dlp and ffmpeg")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the metadata document for a URL
    Metadata {
        /// Video page URL
        url: String,

        /// Print compact JSON instead of pretty-printed
        #[arg(long)]
        raw: bool,
    },

    /// Print the direct media stream URL for a page URL
    Url {
        /// Video page URL
        url: String,
    },

    /// Download a video
    Video {
        /// Video page URL
        url: String,

        /// Container format (default: mp4)
        #[arg(short, long)]
        format: Option<String>,

        /// Maximum height, e.g. 720 or 1080p (default: 720)
        #[arg(short, long)]
        resolution: Option<String>,

        /// Preferred video codec (default: avc1)
        #[arg(long)]
        codec: Option<String>,

        /// Directory to write into (default: config or current directory)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },

    /// Download audio only
    Audio {
        /// Video page URL
        url: String,

        /// Audio format (default: mp3)
        #[arg(short, long)]
        format: Option<String>,

        /// Audio encoder used when converting (default: libmp3lame)
        #[arg(long)]
        codec: Option<String>,

        /// Bitrate used when converting (default: 128k)
        #[arg(short, long)]
        bitrate: Option<String>,

        /// Directory to write into (default: config or current directory)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },

    /// Install yt-dlp and ffmpeg into the local tool directory
    Setup,

    /// Check that required external tools are available
    CheckTools,
}
