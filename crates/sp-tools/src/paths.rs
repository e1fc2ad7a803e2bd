//! On-disk layout of the configuration root.
//!
//! ```text
//! <root>/
//!   bin/               locally installed executables
//!   .manual_setup      written by `streampull setup`
//!   .auto_installed    written after an automatic install
//! ```

use std::path::{Path, PathBuf};

use crate::tool::Tool;

const ROOT_DIR_NAME: &str = ".streampull";
const MANUAL_MARKER: &str = ".manual_setup";
const AUTO_MARKER: &str = ".auto_installed";

/// Paths derived from a configuration root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallPaths {
    root: PathBuf,
}

impl InstallPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// `~/.streampull`, or `./.streampull` when no home directory is known.
    pub fn default_root() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(ROOT_DIR_NAME)
    }

    /// Use `root` when given, the default location otherwise.
    pub fn resolve(root: Option<&Path>) -> Self {
        match root {
            Some(root) => Self::new(root),
            None => Self::new(Self::default_root()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn bin_dir(&self) -> PathBuf {
        self.root.join("bin")
    }

    /// Where a locally installed copy of `tool` lives.
    pub fn local_binary(&self, tool: Tool) -> PathBuf {
        self.bin_dir().join(tool.executable_name())
    }

    pub fn manual_marker(&self) -> PathBuf {
        self.root.join(MANUAL_MARKER)
    }

    pub fn auto_marker(&self) -> PathBuf {
        self.root.join(AUTO_MARKER)
    }
}
