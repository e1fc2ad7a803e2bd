//! Configuration file loading.
//!
//! The types live in [`sp_core::config`]; this module finds, reads and
//! post-processes the TOML file.

pub use sp_core::config::*;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let mut config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    finish(&mut config);
    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    // Try default locations
    let default_paths = [
        "./streampull.toml",
        "~/.config/streampull/config.toml",
        "/etc/streampull/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            return load_config(path);
        }
    }

    let mut config = Config::default();
    finish(&mut config);
    Ok(config)
}

/// Environment overrides, `~` expansion, and non-fatal validation.
fn finish(config: &mut Config) {
    config.apply_env();

    for path in [
        &mut config.tools.fetcher_path,
        &mut config.tools.transcoder_path,
        &mut config.tools.home,
        &mut config.download.output_dir,
    ]
    .into_iter()
    .flatten()
    {
        *path = expand_tilde(path);
    }

    for warning in config.validate() {
        tracing::warn!("Config: {}", warning);
    }
}

fn expand_tilde(path: &Path) -> PathBuf {
    match path.to_str() {
        Some(s) => PathBuf::from(shellexpand::tilde(s).as_ref()),
        None => path.to_path_buf(),
    }
}
