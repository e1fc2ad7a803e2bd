//! Process-wide install coordination.
//!
//! [`InstallCoordinator`] owns the one-shot install latch. The first caller
//! of [`ensure_installed`](InstallCoordinator::ensure_installed) evaluates
//! the decision rules and, if needed, runs the installer; every concurrent
//! caller blocks on the latch and then observes the same outcome.
//!
//! Decision rules, in order:
//!
//! 1. auto-install disabled (config or `STREAMPULL_NO_AUTO_INSTALL`) → skip
//! 2. both tools bound to existing executables → skip
//! 3. both tools resolvable through the system `PATH` → skip
//! 4. manual setup marker present but a tool missing → skip, with a warning
//! 5. otherwise install each missing tool independently and rebind
//!
//! Rules 2-4 read the per-tool [`InstallState`] from
//! [`classify_install`](InstallCoordinator::classify_install).

use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use sp_core::config::{env_flag, InstallConfig, NO_AUTO_INSTALL_ENV};
use sp_core::{Error, ProgressSink, Result};

use crate::installer::ToolInstaller;
use crate::locator::{is_bare_name, BinaryLocator, ToolSource};
use crate::tool::Tool;

/// Whether automatic installation may run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstallPolicy {
    pub auto_install: bool,
}

impl InstallPolicy {
    /// Policy from the install config section, with the opt-out environment
    /// flag taking precedence.
    pub fn from_config(config: &InstallConfig) -> Self {
        let env_opt_out = env_flag(std::env::var(NO_AUTO_INSTALL_ENV).ok().as_deref());
        Self {
            auto_install: config.auto_install && !env_opt_out,
        }
    }
}

impl Default for InstallPolicy {
    fn default() -> Self {
        Self { auto_install: true }
    }
}

/// Default deadline for a tool's version command.
const DEFAULT_VERSION_TIMEOUT: Duration = Duration::from_secs(10);

/// Install status of one tool, derived from the filesystem on every call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InstallState {
    /// The bound path launches.
    Present,
    /// Missing, and nothing stops an automatic install.
    AutoInstallable,
    /// Missing although manual setup already ran.
    ManualSetupExpected,
}

/// Why the install step was skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    OptedOut,
    AlreadyPresent,
    SystemInstall,
    ManualSetupBroken,
}

/// Outcome of an install run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InstallReport {
    pub installed: Vec<Tool>,
    pub failed: Vec<(Tool, String)>,
}

impl InstallReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoordinatorState {
    NotChecked,
    Checking,
    Installing,
    Skipped(SkipReason),
    Done(InstallReport),
}

/// Availability report for one tool, returned by
/// [`InstallCoordinator::check_all`].
#[derive(Debug, Clone, Serialize)]
pub struct ToolInfo {
    pub tool: Tool,
    /// Path the tool is currently bound to (may be a bare name).
    pub path: PathBuf,
    pub source: ToolSource,
    pub available: bool,
    pub state: InstallState,
    /// First line of the tool's version output, if it ran.
    pub version: Option<String>,
}

/// Gatekeeper for the first use of the external tools.
#[derive(Debug)]
pub struct InstallCoordinator {
    locator: Arc<BinaryLocator>,
    installer: Arc<dyn ToolInstaller>,
    policy: InstallPolicy,
    /// `true` once the install decision has run.
    latch: tokio::sync::Mutex<bool>,
    state: RwLock<CoordinatorState>,
    bound: RwLock<HashMap<Tool, PathBuf>>,
    failures: RwLock<HashMap<Tool, String>>,
    progress: ProgressSink,
    version_timeout: Duration,
}

impl InstallCoordinator {
    pub fn new(
        locator: Arc<BinaryLocator>,
        installer: Arc<dyn ToolInstaller>,
        policy: InstallPolicy,
    ) -> Self {
        let coordinator = Self {
            locator,
            installer,
            policy,
            latch: tokio::sync::Mutex::new(false),
            state: RwLock::new(CoordinatorState::NotChecked),
            bound: RwLock::new(HashMap::new()),
            failures: RwLock::new(HashMap::new()),
            progress: ProgressSink::none(),
            version_timeout: DEFAULT_VERSION_TIMEOUT,
        };
        coordinator.rebind();
        coordinator
    }

    /// Observer for installer download progress.
    pub fn with_progress(mut self, progress: ProgressSink) -> Self {
        self.progress = progress;
        self
    }

    /// Deadline for the version commands run by [`check_all`](Self::check_all).
    pub fn with_version_timeout(mut self, timeout: Duration) -> Self {
        self.version_timeout = timeout;
        self
    }

    pub fn locator(&self) -> &BinaryLocator {
        &self.locator
    }

    pub fn state(&self) -> CoordinatorState {
        self.state.read().clone()
    }

    /// Run the install decision once per process.
    ///
    /// Callers arriving while another caller holds the latch wait for it and
    /// then return the state that run produced.
    pub async fn ensure_installed(&self) -> CoordinatorState {
        let mut attempted = self.latch.lock().await;
        if *attempted {
            return self.state();
        }
        *attempted = true;

        self.set_state(CoordinatorState::Checking);
        let outcome = self.decide_and_install().await;
        self.set_state(outcome.clone());
        outcome
    }

    async fn decide_and_install(&self) -> CoordinatorState {
        self.rebind();

        if !self.policy.auto_install {
            info!("Automatic tool installation disabled");
            return CoordinatorState::Skipped(SkipReason::OptedOut);
        }

        let states: Vec<(Tool, PathBuf, InstallState)> = Tool::ALL
            .iter()
            .map(|&t| (t, self.tool_path(t), self.classify_install(t)))
            .collect();

        if states
            .iter()
            .all(|(_, p, state)| *state == InstallState::Present && !is_bare_name(p))
        {
            debug!("All tools already installed");
            return CoordinatorState::Skipped(SkipReason::AlreadyPresent);
        }

        if states.iter().all(|(_, _, state)| *state == InstallState::Present) {
            debug!("All tools found on the system PATH");
            return CoordinatorState::Skipped(SkipReason::SystemInstall);
        }

        let missing: Vec<Tool> = states
            .iter()
            .filter(|(_, _, state)| *state != InstallState::Present)
            .map(|(t, _, _)| *t)
            .collect();

        if states
            .iter()
            .any(|(_, _, state)| *state == InstallState::ManualSetupExpected)
        {
            let paths = self.locator.paths();
            let names: Vec<&str> = missing.iter().map(|t| t.binary_name()).collect();
            warn!(
                "Manual setup was completed before ({}), but {} could not be found.\n  \
                 Run `streampull setup` again to reinstall into {},\n  \
                 or install the tools system-wide so they are on PATH.",
                paths.manual_marker().display(),
                names.join(", "),
                paths.bin_dir().display()
            );
            return CoordinatorState::Skipped(SkipReason::ManualSetupBroken);
        }

        self.set_state(CoordinatorState::Installing);
        info!("Installing missing tools: {:?}", missing);
        let report = self.install_each(&missing).await;
        self.rebind();
        self.write_auto_marker();

        CoordinatorState::Done(report)
    }

    async fn install_each(&self, tools: &[Tool]) -> InstallReport {
        let mut report = InstallReport::default();
        for &tool in tools {
            match self.installer.install(tool, &self.progress).await {
                Ok(path) => {
                    info!("{} ready at {}", tool.binary_name(), path.display());
                    self.failures.write().remove(&tool);
                    report.installed.push(tool);
                }
                Err(e) => {
                    warn!("Failed to install {}: {}", tool.binary_name(), e);
                    self.failures.write().insert(tool, e.to_string());
                    report.failed.push((tool, e.to_string()));
                }
            }
        }
        report
    }

    fn write_auto_marker(&self) {
        let marker = self.locator.paths().auto_marker();
        let stamp = chrono::Utc::now().to_rfc3339();
        let written = std::fs::create_dir_all(self.locator.paths().root())
            .and_then(|_| std::fs::write(&marker, stamp));
        if let Err(e) = written {
            warn!("Could not write {}: {}", marker.display(), e);
        }
    }

    /// Install every tool into the local bin directory, whatever is already
    /// present, and record that manual setup ran.
    ///
    /// Afterwards the automatic install decision is considered done for this
    /// process.
    pub async fn run_setup(&self) -> Result<InstallReport> {
        let mut attempted = self.latch.lock().await;
        *attempted = true;

        self.set_state(CoordinatorState::Installing);
        let report = self.install_each(&Tool::ALL).await;
        self.rebind();

        let paths = self.locator.paths();
        std::fs::create_dir_all(paths.root())?;
        std::fs::write(paths.manual_marker(), chrono::Utc::now().to_rfc3339())?;

        self.set_state(CoordinatorState::Done(report.clone()));
        Ok(report)
    }

    /// The path to launch for `tool`.
    ///
    /// Fails only when this process tried to install the tool, the install
    /// failed, and nothing else resolves it. Otherwise the bound path is
    /// returned even if it is a bare name nobody has verified.
    pub fn require(&self, tool: Tool) -> Result<PathBuf> {
        let path = self.tool_path(tool);
        if !self.locator.is_available(&path) {
            if let Some(reason) = self.failures.read().get(&tool) {
                return Err(Error::unavailable(tool.to_string(), reason.clone()));
            }
        }
        Ok(path)
    }

    /// Where `tool` stands right now: present, or missing with or without a
    /// prior manual setup.
    pub fn classify_install(&self, tool: Tool) -> InstallState {
        if self.locator.is_available(&self.tool_path(tool)) {
            InstallState::Present
        } else if self.locator.paths().manual_marker().exists() {
            InstallState::ManualSetupExpected
        } else {
            InstallState::AutoInstallable
        }
    }

    /// Currently bound path for `tool`.
    pub fn tool_path(&self, tool: Tool) -> PathBuf {
        self.bound
            .read()
            .get(&tool)
            .cloned()
            .unwrap_or_else(|| self.locator.resolve(tool))
    }

    pub fn set_override(&self, tool: Tool, path: impl Into<PathBuf>) {
        self.locator.set_override(tool, path);
        self.rebind();
    }

    /// Drop all overrides and go back to auto-detected paths.
    pub fn clear_overrides(&self) {
        self.locator.clear_overrides();
        self.rebind();
    }

    /// Resolve every tool again and store the results.
    pub fn rebind(&self) {
        let resolved: HashMap<Tool, PathBuf> = Tool::ALL
            .iter()
            .map(|&t| (t, self.locator.resolve(t)))
            .collect();
        *self.bound.write() = resolved;
    }

    /// Check all tools and return availability information.
    ///
    /// Each version command is bounded by the version timeout; a tool that
    /// does not answer in time is reported without a version.
    pub async fn check_all(&self) -> Vec<ToolInfo> {
        let mut infos = Vec::with_capacity(Tool::ALL.len());
        for tool in Tool::ALL {
            let path = self.tool_path(tool);
            let available = self.locator.is_available(&path);
            let version = if available {
                detect_version(tool, &path, self.version_timeout).await
            } else {
                None
            };
            infos.push(ToolInfo {
                tool,
                source: self.locator.classify(tool, &path),
                state: self.classify_install(tool),
                path,
                available,
                version,
            });
        }
        infos
    }

    fn set_state(&self, state: CoordinatorState) {
        *self.state.write() = state;
    }
}

/// Run the tool's version command and return the first line of stdout.
async fn detect_version(tool: Tool, path: &Path, deadline: Duration) -> Option<String> {
    let child = tokio::process::Command::new(path)
        .arg(tool.version_arg())
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn()
        .ok()?;

    // Dropping the wait future on expiry drops the child, which kills it.
    let output = match tokio::time::timeout(deadline, child.wait_with_output()).await {
        Ok(res) => res.ok()?,
        Err(_) => {
            warn!(
                "{} {} did not finish within {:?}",
                path.display(),
                tool.version_arg(),
                deadline
            );
            return None;
        }
    };

    if !output.status.success() {
        return None;
    }

    String::from_utf8_lossy(&output.stdout)
        .lines()
        .next()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locator::tests::{write_executable, FixedLookup};
    use crate::paths::InstallPaths;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use serial_test::serial;
    use std::collections::HashSet;

    /// Installer that counts calls and drops a script into `bin/`.
    #[derive(Debug)]
    struct CountingInstaller {
        paths: InstallPaths,
        calls: Mutex<HashMap<Tool, usize>>,
        failing: HashSet<Tool>,
    }

    impl CountingInstaller {
        fn new(paths: InstallPaths) -> Self {
            Self {
                paths,
                calls: Mutex::new(HashMap::new()),
                failing: HashSet::new(),
            }
        }

        fn failing(mut self, tool: Tool) -> Self {
            self.failing.insert(tool);
            self
        }

        fn calls(&self, tool: Tool) -> usize {
            self.calls.lock().get(&tool).copied().unwrap_or(0)
        }
    }

    #[async_trait]
    impl ToolInstaller for CountingInstaller {
        async fn install(&self, tool: Tool, _progress: &ProgressSink) -> Result<PathBuf> {
            *self.calls.lock().entry(tool).or_default() += 1;
            tokio::time::sleep(Duration::from_millis(20)).await;
            if self.failing.contains(&tool) {
                return Err(Error::download("http://stub/", "connection reset"));
            }
            let path = self.paths.local_binary(tool);
            write_executable(&path);
            Ok(path)
        }
    }

    fn setup(
        root: &Path,
        lookup: FixedLookup,
        installer: CountingInstaller,
        policy: InstallPolicy,
    ) -> (Arc<InstallCoordinator>, Arc<CountingInstaller>) {
        let locator = Arc::new(BinaryLocator::new(InstallPaths::new(root), Arc::new(lookup)));
        let installer = Arc::new(installer);
        let coordinator = Arc::new(InstallCoordinator::new(
            locator,
            installer.clone(),
            policy,
        ));
        (coordinator, installer)
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_callers_install_once() {
        let dir = tempfile::tempdir().unwrap();
        let paths = InstallPaths::new(dir.path());
        let (coord, installer) = setup(
            dir.path(),
            FixedLookup::default(),
            CountingInstaller::new(paths.clone()),
            InstallPolicy::default(),
        );

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let coord = coord.clone();
                tokio::spawn(async move { coord.ensure_installed().await })
            })
            .collect();
        let mut outcomes = Vec::new();
        for h in handles {
            outcomes.push(h.await.unwrap());
        }

        assert_eq!(installer.calls(Tool::Fetcher), 1);
        assert_eq!(installer.calls(Tool::Transcoder), 1);
        let expected = CoordinatorState::Done(InstallReport {
            installed: vec![Tool::Fetcher, Tool::Transcoder],
            failed: vec![],
        });
        assert!(outcomes.iter().all(|o| *o == expected));

        for tool in Tool::ALL {
            assert_eq!(coord.require(tool).unwrap(), paths.local_binary(tool));
        }
        let stamp = std::fs::read_to_string(paths.auto_marker()).unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(&stamp).is_ok());
    }

    #[tokio::test]
    async fn opt_out_never_installs() {
        let dir = tempfile::tempdir().unwrap();
        let (coord, installer) = setup(
            dir.path(),
            FixedLookup::default(),
            CountingInstaller::new(InstallPaths::new(dir.path())),
            InstallPolicy {
                auto_install: false,
            },
        );

        assert_eq!(
            coord.ensure_installed().await,
            CoordinatorState::Skipped(SkipReason::OptedOut)
        );
        assert_eq!(installer.calls(Tool::Fetcher), 0);
        assert_eq!(installer.calls(Tool::Transcoder), 0);
        // Unattempted tools fall back to bare names instead of erroring.
        assert_eq!(coord.require(Tool::Fetcher).unwrap(), PathBuf::from("yt-dlp"));
    }

    #[test]
    #[serial]
    fn env_flag_overrides_config() {
        std::env::set_var(NO_AUTO_INSTALL_ENV, "true");
        let policy = InstallPolicy::from_config(&InstallConfig {
            auto_install: true,
            ..Default::default()
        });
        std::env::remove_var(NO_AUTO_INSTALL_ENV);
        assert!(!policy.auto_install);

        let policy = InstallPolicy::from_config(&InstallConfig {
            auto_install: true,
            ..Default::default()
        });
        assert!(policy.auto_install);
    }

    #[tokio::test]
    async fn system_path_tools_are_respected() {
        let dir = tempfile::tempdir().unwrap();
        let (coord, installer) = setup(
            dir.path(),
            FixedLookup::with(&["yt-dlp", "ffmpeg"]),
            CountingInstaller::new(InstallPaths::new(dir.path())),
            InstallPolicy::default(),
        );

        assert_eq!(
            coord.ensure_installed().await,
            CoordinatorState::Skipped(SkipReason::SystemInstall)
        );
        assert_eq!(installer.calls(Tool::Fetcher), 0);
        assert!(!dir.path().join("bin").exists());
    }

    #[tokio::test]
    async fn local_tools_are_already_present() {
        let dir = tempfile::tempdir().unwrap();
        let paths = InstallPaths::new(dir.path());
        for tool in Tool::ALL {
            write_executable(&paths.local_binary(tool));
        }
        let (coord, installer) = setup(
            dir.path(),
            FixedLookup::default(),
            CountingInstaller::new(paths),
            InstallPolicy::default(),
        );

        assert_eq!(
            coord.ensure_installed().await,
            CoordinatorState::Skipped(SkipReason::AlreadyPresent)
        );
        assert_eq!(installer.calls(Tool::Transcoder), 0);
    }

    #[tokio::test]
    async fn broken_manual_setup_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let paths = InstallPaths::new(dir.path());
        std::fs::write(paths.manual_marker(), "2025-01-01T00:00:00Z").unwrap();
        let (coord, installer) = setup(
            dir.path(),
            FixedLookup::with(&["ffmpeg"]),
            CountingInstaller::new(paths.clone()),
            InstallPolicy::default(),
        );

        assert_eq!(
            coord.ensure_installed().await,
            CoordinatorState::Skipped(SkipReason::ManualSetupBroken)
        );
        assert_eq!(installer.calls(Tool::Fetcher), 0);
        assert!(!paths.auto_marker().exists());
    }

    #[tokio::test]
    async fn only_missing_tools_are_installed() {
        let dir = tempfile::tempdir().unwrap();
        let paths = InstallPaths::new(dir.path());
        let (coord, installer) = setup(
            dir.path(),
            FixedLookup::with(&["yt-dlp"]),
            CountingInstaller::new(paths.clone()),
            InstallPolicy::default(),
        );

        coord.ensure_installed().await;
        assert_eq!(installer.calls(Tool::Fetcher), 0);
        assert_eq!(installer.calls(Tool::Transcoder), 1);
        assert_eq!(coord.require(Tool::Fetcher).unwrap(), PathBuf::from("yt-dlp"));
        assert_eq!(
            coord.require(Tool::Transcoder).unwrap(),
            paths.local_binary(Tool::Transcoder)
        );
    }

    #[tokio::test]
    async fn one_failure_does_not_block_the_other() {
        let dir = tempfile::tempdir().unwrap();
        let paths = InstallPaths::new(dir.path());
        let (coord, installer) = setup(
            dir.path(),
            FixedLookup::default(),
            CountingInstaller::new(paths.clone()).failing(Tool::Fetcher),
            InstallPolicy::default(),
        );

        let state = coord.ensure_installed().await;
        let CoordinatorState::Done(report) = state else {
            panic!("unexpected state {state:?}");
        };
        assert_eq!(report.installed, vec![Tool::Transcoder]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(installer.calls(Tool::Fetcher), 1);

        assert_eq!(
            coord.require(Tool::Transcoder).unwrap(),
            paths.local_binary(Tool::Transcoder)
        );
        match coord.require(Tool::Fetcher) {
            Err(Error::InstallUnavailable { tool, reason }) => {
                assert_eq!(tool, "fetcher");
                assert!(reason.contains("connection reset"));
            }
            other => panic!("unexpected result {other:?}"),
        }
        assert!(paths.auto_marker().exists());

        // The latch never resets.
        coord.ensure_installed().await;
        assert_eq!(installer.calls(Tool::Fetcher), 1);
    }

    #[tokio::test]
    async fn setup_installs_everything_and_writes_marker() {
        let dir = tempfile::tempdir().unwrap();
        let paths = InstallPaths::new(dir.path());
        let (coord, installer) = setup(
            dir.path(),
            FixedLookup::with(&["yt-dlp", "ffmpeg"]),
            CountingInstaller::new(paths.clone()),
            InstallPolicy::default(),
        );

        let report = coord.run_setup().await.unwrap();
        assert!(report.is_complete());
        assert_eq!(installer.calls(Tool::Fetcher), 1);
        assert_eq!(installer.calls(Tool::Transcoder), 1);
        assert!(paths.manual_marker().exists());
        assert_eq!(coord.tool_path(Tool::Fetcher), paths.local_binary(Tool::Fetcher));

        // Automatic install does not run again afterwards.
        coord.ensure_installed().await;
        assert_eq!(installer.calls(Tool::Fetcher), 1);
    }

    #[tokio::test]
    async fn overrides_rebind_paths() {
        let dir = tempfile::tempdir().unwrap();
        let (coord, _) = setup(
            dir.path(),
            FixedLookup::default(),
            CountingInstaller::new(InstallPaths::new(dir.path())),
            InstallPolicy::default(),
        );
        let custom = dir.path().join("opt").join("ffmpeg");
        write_executable(&custom);

        coord.set_override(Tool::Transcoder, &custom);
        assert_eq!(coord.tool_path(Tool::Transcoder), custom);

        coord.clear_overrides();
        assert_eq!(coord.tool_path(Tool::Transcoder), PathBuf::from("ffmpeg"));
    }

    #[tokio::test]
    async fn install_state_follows_filesystem_and_marker() {
        let dir = tempfile::tempdir().unwrap();
        let paths = InstallPaths::new(dir.path());
        let (coord, _) = setup(
            dir.path(),
            FixedLookup::with(&["ffmpeg"]),
            CountingInstaller::new(paths.clone()),
            InstallPolicy::default(),
        );

        assert_eq!(coord.classify_install(Tool::Transcoder), InstallState::Present);
        assert_eq!(
            coord.classify_install(Tool::Fetcher),
            InstallState::AutoInstallable
        );

        std::fs::write(paths.manual_marker(), "2025-01-01T00:00:00Z").unwrap();
        assert_eq!(
            coord.classify_install(Tool::Fetcher),
            InstallState::ManualSetupExpected
        );
        assert_eq!(coord.classify_install(Tool::Transcoder), InstallState::Present);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn hung_version_command_is_bounded() {
        let dir = tempfile::tempdir().unwrap();
        let paths = InstallPaths::new(dir.path());
        let local = paths.local_binary(Tool::Fetcher);
        write_executable(&local);
        std::fs::write(&local, "#!/bin/sh\nexec sleep 30\n").unwrap();

        let locator = Arc::new(BinaryLocator::new(
            paths.clone(),
            Arc::new(FixedLookup::default()),
        ));
        let coord = InstallCoordinator::new(
            locator,
            Arc::new(CountingInstaller::new(paths)),
            InstallPolicy::default(),
        )
        .with_version_timeout(Duration::from_millis(200));

        let infos = tokio::time::timeout(Duration::from_secs(10), coord.check_all())
            .await
            .expect("version check ignored its deadline");

        let fetcher = &infos[0];
        assert!(fetcher.available);
        assert_eq!(fetcher.state, InstallState::Present);
        assert_eq!(fetcher.version, None);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn check_all_reports_source_and_version() {
        let dir = tempfile::tempdir().unwrap();
        let paths = InstallPaths::new(dir.path());
        let local = paths.local_binary(Tool::Fetcher);
        write_executable(&local);
        std::fs::write(&local, "#!/bin/sh\necho 2025.01.15\n").unwrap();

        let (coord, _) = setup(
            dir.path(),
            FixedLookup::default(),
            CountingInstaller::new(paths),
            InstallPolicy::default(),
        );

        let infos = coord.check_all().await;
        assert_eq!(infos.len(), 2);

        let fetcher = &infos[0];
        assert_eq!(fetcher.tool, Tool::Fetcher);
        assert_eq!(fetcher.source, ToolSource::Local);
        assert!(fetcher.available);
        assert_eq!(fetcher.version.as_deref(), Some("2025.01.15"));

        let transcoder = &infos[1];
        assert_eq!(transcoder.source, ToolSource::Unresolved);
        assert_eq!(transcoder.state, InstallState::AutoInstallable);
        assert!(!transcoder.available);
        assert_eq!(transcoder.version, None);
    }
}
