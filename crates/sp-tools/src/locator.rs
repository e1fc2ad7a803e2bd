//! Binary location.
//!
//! [`BinaryLocator`] turns a logical [`Tool`] into something a process
//! launcher can execute. Candidates are tried in priority order:
//!
//! 1. an explicit override set by the caller,
//! 2. `<root>/bin/<tool>[.exe]` if it exists,
//! 3. the bare executable name, left for the launcher to resolve on `PATH`.
//!
//! Resolution never fails. A bare name that nothing resolves surfaces later
//! as a launch error from the process that tries to run it.

use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use crate::paths::InstallPaths;
use crate::tool::Tool;

/// System `PATH` lookup, injectable for tests.
pub trait PathLookup: Send + Sync + fmt::Debug {
    /// Absolute path of `name` on the search path, if any.
    fn find(&self, name: &str) -> Option<PathBuf>;
}

/// [`PathLookup`] backed by [`which::which`].
#[derive(Debug, Default, Clone, Copy)]
pub struct WhichLookup;

impl PathLookup for WhichLookup {
    fn find(&self, name: &str) -> Option<PathBuf> {
        which::which(name).ok()
    }
}

/// Where a resolved tool path came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolSource {
    Override,
    Local,
    System,
    Unresolved,
}

impl fmt::Display for ToolSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ToolSource::Override => "override",
            ToolSource::Local => "local",
            ToolSource::System => "system",
            ToolSource::Unresolved => "unresolved",
        };
        f.write_str(s)
    }
}

/// Resolves tool names to executable paths.
#[derive(Debug)]
pub struct BinaryLocator {
    paths: InstallPaths,
    overrides: RwLock<HashMap<Tool, PathBuf>>,
    lookup: Arc<dyn PathLookup>,
}

impl BinaryLocator {
    pub fn new(paths: InstallPaths, lookup: Arc<dyn PathLookup>) -> Self {
        Self {
            paths,
            overrides: RwLock::new(HashMap::new()),
            lookup,
        }
    }

    /// Locator that searches the real system `PATH`.
    pub fn with_system_path(paths: InstallPaths) -> Self {
        Self::new(paths, Arc::new(WhichLookup))
    }

    pub fn paths(&self) -> &InstallPaths {
        &self.paths
    }

    pub fn set_override(&self, tool: Tool, path: impl Into<PathBuf>) {
        self.overrides.write().insert(tool, path.into());
    }

    pub fn clear_overrides(&self) {
        self.overrides.write().clear();
    }

    pub fn override_for(&self, tool: Tool) -> Option<PathBuf> {
        self.overrides.read().get(&tool).cloned()
    }

    /// All candidate locations for `tool`, highest priority first.
    pub fn candidates(&self, tool: Tool) -> Vec<(ToolSource, PathBuf)> {
        let mut out = Vec::with_capacity(3);
        if let Some(p) = self.override_for(tool) {
            out.push((ToolSource::Override, p));
        }
        out.push((ToolSource::Local, self.paths.local_binary(tool)));
        out.push((ToolSource::System, PathBuf::from(tool.binary_name())));
        out
    }

    /// Pick the path to execute for `tool`.
    ///
    /// An override that does not resolve falls through to the next
    /// candidate. The local install only needs to exist. The bare name is
    /// returned unconditionally as the last resort.
    pub fn resolve(&self, tool: Tool) -> PathBuf {
        for (source, path) in self.candidates(tool) {
            match source {
                ToolSource::Override => {
                    if self.is_available(&path) {
                        return path;
                    }
                    tracing::warn!(
                        "{tool} override {} does not resolve; falling back",
                        path.display()
                    );
                }
                ToolSource::Local => {
                    if path.is_file() {
                        return path;
                    }
                }
                _ => return path,
            }
        }
        PathBuf::from(tool.binary_name())
    }

    /// Describe where `path` (as returned by [`resolve`](Self::resolve))
    /// comes from.
    pub fn classify(&self, tool: Tool, path: &Path) -> ToolSource {
        if self.override_for(tool).as_deref() == Some(path) {
            ToolSource::Override
        } else if path == self.paths.local_binary(tool) {
            ToolSource::Local
        } else if is_bare_name(path) && self.lookup.find(&path.to_string_lossy()).is_some() {
            ToolSource::System
        } else if !is_bare_name(path) && is_executable_file(path) {
            ToolSource::Override
        } else {
            ToolSource::Unresolved
        }
    }

    /// Whether `path` would launch: bare names are looked up on `PATH`,
    /// anything else must be an executable regular file.
    pub fn is_available(&self, path: &Path) -> bool {
        if is_bare_name(path) {
            self.lookup.find(&path.to_string_lossy()).is_some()
        } else {
            is_executable_file(path)
        }
    }
}

/// A path with a single plain component, e.g. `yt-dlp`.
pub fn is_bare_name(path: &Path) -> bool {
    let mut components = path.components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

/// Regular file with an executable bit (or an `.exe` suffix on Windows).
pub fn is_executable_file(path: &Path) -> bool {
    let Ok(meta) = std::fs::metadata(path) else {
        return false;
    };
    if !meta.is_file() {
        return false;
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        meta.permissions().mode() & 0o111 != 0
    }

    #[cfg(not(unix))]
    {
        path.extension()
            .map(|ext| ext.eq_ignore_ascii_case("exe"))
            .unwrap_or(false)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::HashSet;

    /// Lookup that only knows the names it was given.
    #[derive(Debug, Default)]
    pub(crate) struct FixedLookup {
        pub known: HashSet<String>,
    }

    impl FixedLookup {
        pub(crate) fn with(names: &[&str]) -> Self {
            Self {
                known: names.iter().map(|s| s.to_string()).collect(),
            }
        }
    }

    impl PathLookup for FixedLookup {
        fn find(&self, name: &str) -> Option<PathBuf> {
            self.known
                .contains(name)
                .then(|| PathBuf::from("/usr/bin").join(name))
        }
    }

    pub(crate) fn write_executable(path: &Path) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, b"#!/bin/sh\nexit 0\n").unwrap();
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).unwrap();
        }
    }

    fn locator(root: &Path, lookup: FixedLookup) -> BinaryLocator {
        BinaryLocator::new(InstallPaths::new(root), Arc::new(lookup))
    }

    #[test]
    fn falls_back_to_bare_name() {
        let dir = tempfile::tempdir().unwrap();
        let loc = locator(dir.path(), FixedLookup::default());
        assert_eq!(loc.resolve(Tool::Fetcher), PathBuf::from("yt-dlp"));
        assert_eq!(loc.resolve(Tool::Transcoder), PathBuf::from("ffmpeg"));
        assert_eq!(
            loc.classify(Tool::Fetcher, Path::new("yt-dlp")),
            ToolSource::Unresolved
        );
    }

    #[test]
    fn prefers_local_install() {
        let dir = tempfile::tempdir().unwrap();
        let loc = locator(dir.path(), FixedLookup::with(&["ffmpeg"]));
        let local = loc.paths().local_binary(Tool::Transcoder);
        write_executable(&local);

        assert_eq!(loc.resolve(Tool::Transcoder), local);
        assert_eq!(loc.classify(Tool::Transcoder, &local), ToolSource::Local);
    }

    #[test]
    fn override_wins_when_it_exists() {
        let dir = tempfile::tempdir().unwrap();
        let loc = locator(dir.path(), FixedLookup::default());
        write_executable(&loc.paths().local_binary(Tool::Fetcher));
        let custom = dir.path().join("custom").join("yt-dlp");
        write_executable(&custom);

        loc.set_override(Tool::Fetcher, &custom);
        assert_eq!(loc.resolve(Tool::Fetcher), custom);
        assert_eq!(loc.classify(Tool::Fetcher, &custom), ToolSource::Override);

        loc.clear_overrides();
        assert_eq!(
            loc.resolve(Tool::Fetcher),
            loc.paths().local_binary(Tool::Fetcher)
        );
    }

    #[test]
    fn missing_override_falls_through() {
        let dir = tempfile::tempdir().unwrap();
        let loc = locator(dir.path(), FixedLookup::default());
        loc.set_override(Tool::Fetcher, dir.path().join("nope/yt-dlp"));
        assert_eq!(loc.resolve(Tool::Fetcher), PathBuf::from("yt-dlp"));
    }

    #[test]
    fn bare_override_resolves_through_lookup() {
        let dir = tempfile::tempdir().unwrap();
        let loc = locator(dir.path(), FixedLookup::with(&["yt-dlp-nightly"]));
        loc.set_override(Tool::Fetcher, "yt-dlp-nightly");
        assert_eq!(loc.resolve(Tool::Fetcher), PathBuf::from("yt-dlp-nightly"));
    }

    #[test]
    fn candidates_are_ordered() {
        let dir = tempfile::tempdir().unwrap();
        let loc = locator(dir.path(), FixedLookup::default());
        loc.set_override(Tool::Transcoder, "/opt/ffmpeg/bin/ffmpeg");
        let sources: Vec<ToolSource> = loc
            .candidates(Tool::Transcoder)
            .into_iter()
            .map(|(s, _)| s)
            .collect();
        assert_eq!(
            sources,
            vec![ToolSource::Override, ToolSource::Local, ToolSource::System]
        );
    }

    #[test]
    fn availability() {
        let dir = tempfile::tempdir().unwrap();
        let loc = locator(dir.path(), FixedLookup::with(&["ffmpeg"]));
        assert!(loc.is_available(Path::new("ffmpeg")));
        assert!(!loc.is_available(Path::new("yt-dlp")));
        assert!(!loc.is_available(&dir.path().join("missing")));
        assert!(!loc.is_available(dir.path()));
    }

    #[cfg(unix)]
    #[test]
    fn non_executable_file_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let loc = locator(dir.path(), FixedLookup::default());
        let plain = dir.path().join("plain");
        std::fs::write(&plain, b"data").unwrap();
        assert!(!loc.is_available(&plain));
    }

    #[test]
    fn bare_name_detection() {
        assert!(is_bare_name(Path::new("ffmpeg")));
        assert!(!is_bare_name(Path::new("./ffmpeg")));
        assert!(!is_bare_name(Path::new("/usr/bin/ffmpeg")));
        assert!(!is_bare_name(Path::new("bin/ffmpeg")));
    }
}
