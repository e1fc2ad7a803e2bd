mod cli;

use streampull::{build_services, config, Services};

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use sp_av::url::is_supported_url;
use sp_av::MediaJob;
use sp_core::{DownloadProgress, ProgressSink};
use sp_tools::{InstallState, ToolSource};
use std::sync::Mutex;
use tokio_util::sync::CancellationToken;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "streampull=trace,sp_av=trace,sp_tools=debug,sp_core=debug".to_string()
        } else {
            "streampull=info,sp_av=info,sp_tools=info,sp_core=warn".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    let config = config::load_config_or_default(cli.config.as_deref())?;

    match cli.command {
        Commands::Metadata { url, raw } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(show_metadata(&config, &url, raw))
        }
        Commands::Url { url } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(show_stream_url(&config, &url))
        }
        Commands::Video {
            url,
            format,
            resolution,
            codec,
            output_dir,
        } => {
            let mut job = MediaJob::video(url);
            job.format = format;
            job.resolution = resolution;
            job.codec = codec;
            job.output_dir = output_dir;
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(download(&config, job))
        }
        Commands::Audio {
            url,
            format,
            codec,
            bitrate,
            output_dir,
        } => {
            let mut job = MediaJob::audio(url);
            job.format = format;
            job.codec = codec;
            job.bitrate = bitrate;
            job.output_dir = output_dir;
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(download(&config, job))
        }
        Commands::Setup => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(setup(&config))
        }
        Commands::CheckTools => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(check_tools(&config))
        }
    }
}

fn ensure_supported(url: &str) -> Result<()> {
    if !is_supported_url(url) {
        anyhow::bail!("Unsupported URL: {}", url);
    }
    Ok(())
}

async fn show_metadata(config: &config::Config, url: &str, raw: bool) -> Result<()> {
    ensure_supported(url)?;
    let Services { pipeline, .. } = build_services(config, install_printer());

    let metadata = pipeline.fetch_metadata(url).await?;
    if raw {
        println!("{}", serde_json::to_string(&metadata)?);
    } else {
        println!("{}", serde_json::to_string_pretty(&metadata)?);
    }
    Ok(())
}

async fn show_stream_url(config: &config::Config, url: &str) -> Result<()> {
    ensure_supported(url)?;
    let Services { pipeline, .. } = build_services(config, install_printer());

    println!("{}", pipeline.resolve_stream_url(url).await?);
    Ok(())
}

async fn download(config: &config::Config, job: MediaJob) -> Result<()> {
    ensure_supported(&job.url)?;
    let Services { pipeline, .. } = build_services(config, install_printer());

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted; stopping");
            trigger.cancel();
        }
    });

    let job = job.progress(stage_printer()).cancel_on(cancel);
    let path = pipeline.download(job).await?;
    println!("{}", path.display());
    Ok(())
}

async fn setup(config: &config::Config) -> Result<()> {
    let Services { installs, .. } = build_services(config, install_printer());

    println!(
        "Installing tools into {}\n",
        installs.locator().paths().bin_dir().display()
    );
    let report = installs.run_setup().await?;

    for tool in &report.installed {
        println!("✓ {} - {}", tool.binary_name(), installs.tool_path(*tool).display());
    }
    for (tool, reason) in &report.failed {
        println!("✗ {} - {}", tool.binary_name(), reason);
    }

    println!();
    if report.is_complete() {
        println!("Setup complete!");
        Ok(())
    } else {
        anyhow::bail!("{} tool(s) failed to install", report.failed.len())
    }
}

async fn check_tools(config: &config::Config) -> Result<()> {
    println!("Checking external tools...\n");

    let Services { installs, .. } = build_services(config, ProgressSink::none());
    let mut all_ok = true;

    for info in installs.check_all().await {
        let status = if info.available {
            "✓"
        } else {
            all_ok = false;
            "✗"
        };

        print!("{} {}", status, info.tool.binary_name());

        if let Some(ref version) = info.version {
            print!(" ({})", version);
        }

        if info.source != ToolSource::Unresolved {
            print!(" - {} [{}]", info.path.display(), info.source);
        }

        if info.state == InstallState::ManualSetupExpected {
            print!(" (missing since manual setup)");
        }

        println!();
    }

    println!();
    if all_ok {
        println!("All required tools are available!");
    } else {
        println!("Some tools are missing. Run `streampull setup` to install them.");
    }

    Ok(())
}

/// Print stage changes and percentages to stderr, skipping repeats.
fn stage_printer() -> ProgressSink {
    let last = Mutex::new(String::new());
    ProgressSink::new(move |p: DownloadProgress| {
        let line = match p.percentage {
            Some(pct) => format!("{} ({:.0}%)", p.stage, pct),
            None => p.stage,
        };
        if let Ok(mut last) = last.lock() {
            if *last != line {
                eprintln!("{line}");
                *last = line;
            }
        }
    })
}

/// Print release download progress in whole percent steps.
fn install_printer() -> ProgressSink {
    let last = Mutex::new(None::<u64>);
    ProgressSink::new(move |p: DownloadProgress| {
        let Ok(mut last) = last.lock() else {
            return;
        };
        match p.percentage {
            Some(pct) => {
                let step = pct as u64 / 10;
                if *last != Some(step) {
                    eprintln!("{}: {:.0}%", p.stage, pct);
                    *last = Some(step);
                }
            }
            None if *last != Some(p.bytes_downloaded / (1024 * 1024)) => {
                eprintln!("{}: {} MiB", p.stage, p.bytes_downloaded / (1024 * 1024));
                *last = Some(p.bytes_downloaded / (1024 * 1024));
            }
            None => {}
        }
    })
}
