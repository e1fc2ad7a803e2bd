//! Builder for executing external tool commands with deadlines, cancellation
//! and streamed output.
//!
//! [`ToolCommand::execute`] captures everything, for short commands with
//! small output. [`ToolCommand::stream`] drains both pipes concurrently
//! through a bounded line scanner and never holds more than one line (capped
//! at the scan buffer size) per pipe in memory.

use std::io;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use sp_core::{Error, ProgressSink, Result, Stage, SubprocessError};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

/// Default command timeout: 5 minutes.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Default longest line inspected by [`ToolCommand::stream`].
const DEFAULT_SCAN_BUFFER: usize = 1024 * 1024;

/// Read size for the pipe readers.
const READ_CHUNK: usize = 64 * 1024;

/// Output captured from a tool execution.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    /// Process exit status.
    pub status: ExitStatus,
    /// Captured standard output (lossy UTF-8).
    pub stdout: String,
    /// Captured standard error (lossy UTF-8).
    pub stderr: String,
}

/// A builder for constructing and executing external tool invocations.
///
/// # Example
///
/// ```no_run
/// use sp_av::ToolCommand;
/// use sp_core::{ProgressSink, Stage};
/// use std::path::PathBuf;
/// use std::time::Duration;
///
/// # async fn example() -> sp_core::Result<()> {
/// ToolCommand::new(PathBuf::from("ffmpeg"))
///     .args(["-i", "in.webm", "-vn", "-y", "out.mp3"])
///     .timeout(Duration::from_secs(1200))
///     .stream(Stage::Convert, &ProgressSink::none())
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ToolCommand {
    program: PathBuf,
    args: Vec<String>,
    timeout: Duration,
    cancel: Option<CancellationToken>,
    scan_buffer: usize,
}

enum Outcome<T> {
    Finished(T),
    TimedOut,
    Cancelled,
}

impl ToolCommand {
    /// Create a new command for the given program path.
    pub fn new(program: PathBuf) -> Self {
        Self {
            program,
            args: Vec::new(),
            timeout: DEFAULT_TIMEOUT,
            cancel: None,
            scan_buffer: DEFAULT_SCAN_BUFFER,
        }
    }

    /// Append a single argument.
    pub fn arg(&mut self, s: impl Into<String>) -> &mut Self {
        self.args.push(s.into());
        self
    }

    /// Append multiple arguments.
    pub fn args(&mut self, iter: impl IntoIterator<Item = impl Into<String>>) -> &mut Self {
        self.args.extend(iter.into_iter().map(Into::into));
        self
    }

    /// Set the maximum execution time.
    pub fn timeout(&mut self, d: Duration) -> &mut Self {
        self.timeout = d;
        self
    }

    /// Kill the process when `token` is cancelled.
    pub fn cancel_on(&mut self, token: CancellationToken) -> &mut Self {
        self.cancel = Some(token);
        self
    }

    /// Longest output line that is inspected; longer lines are skipped.
    pub fn scan_buffer(&mut self, bytes: usize) -> &mut Self {
        self.scan_buffer = bytes.max(1);
        self
    }

    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    fn program_name(&self) -> String {
        self.program
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.program.to_string_lossy().to_string())
    }

    fn spawn(&self, stage: Stage) -> Result<Child> {
        debug!(
            "Running {} {}",
            self.program.display(),
            self.args.join(" ")
        );

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        cmd.spawn().map_err(|source| {
            Error::subprocess(
                stage,
                SubprocessError::Launch {
                    program: self.program_name(),
                    source,
                },
            )
        })
    }

    /// Execute the command, capturing stdout and stderr.
    ///
    /// # Errors
    ///
    /// [`Error::SubprocessFailed`] tagged with `stage` when the process cannot
    /// be launched, exits unsuccessfully (detail is the trimmed stderr), runs
    /// past its deadline, or is cancelled.
    pub async fn execute(&self, stage: Stage) -> Result<ToolOutput> {
        let program = self.program_name();
        let child = self.spawn(stage)?;

        // Dropping the wait future on timeout or cancel drops the child,
        // which kills it.
        let outcome = tokio::select! {
            res = tokio::time::timeout(self.timeout, child.wait_with_output()) => match res {
                Ok(res) => Outcome::Finished(res),
                Err(_) => Outcome::TimedOut,
            },
            _ = cancelled(self.cancel.as_ref()) => Outcome::Cancelled,
        };

        let output = match outcome {
            Outcome::Finished(res) => res.map_err(|source| {
                Error::subprocess(
                    stage,
                    SubprocessError::Wait {
                        program: program.clone(),
                        source,
                    },
                )
            })?,
            Outcome::TimedOut => return Err(self.timed_out(stage)),
            Outcome::Cancelled => return Err(self.cancelled_error(stage)),
        };

        let tool_output = ToolOutput {
            status: output.status,
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        };

        if !output.status.success() {
            return Err(Error::subprocess(
                stage,
                SubprocessError::Exit {
                    program,
                    status: output.status.to_string(),
                    detail: tool_output.stderr.trim().to_string(),
                },
            ));
        }

        Ok(tool_output)
    }

    /// Run the command while streaming its output.
    ///
    /// Both pipes are drained concurrently. Lines on stdout that look like
    /// progress (`%` or `ETA`) emit a stage-only event labelled with
    /// [`Stage::progress_label`]. Stderr is discarded apart from its last
    /// line, which becomes the failure detail. Both drains finish before the
    /// exit status is collected.
    ///
    /// A drain error is folded into the failure detail on a non-zero exit and
    /// only logged on success.
    pub async fn stream(&self, stage: Stage, progress: &ProgressSink) -> Result<()> {
        let program = self.program_name();
        let mut child = self.spawn(stage)?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::Internal(format!("{program}: stdout was not captured")))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| Error::Internal(format!("{program}: stderr was not captured")))?;

        let label = stage.progress_label();
        let limit = self.scan_buffer;
        let mut last_diagnostic: Option<String> = None;

        let outcome = {
            let run = async {
                let drain_stdout = scan_lines(stdout, limit, |line| {
                    if is_progress_line(line) {
                        progress.stage(label);
                    }
                });
                let drain_stderr = scan_lines(stderr, limit, |line| {
                    let text = String::from_utf8_lossy(line);
                    let text = text.trim();
                    if !text.is_empty() {
                        trace!("{program}: {text}");
                        last_diagnostic = Some(text.to_string());
                    }
                });
                let (out_res, err_res) = tokio::join!(drain_stdout, drain_stderr);
                let status = child.wait().await;
                (out_res.err().or(err_res.err()), status)
            };

            tokio::select! {
                res = run => Outcome::Finished(res),
                _ = tokio::time::sleep(self.timeout) => Outcome::TimedOut,
                _ = cancelled(self.cancel.as_ref()) => Outcome::Cancelled,
            }
        };

        let (drain_error, status) = match outcome {
            Outcome::Finished(res) => res,
            Outcome::TimedOut => {
                warn!("{program} exceeded {:?}; killing", self.timeout);
                kill_and_reap(&mut child).await;
                return Err(self.timed_out(stage));
            }
            Outcome::Cancelled => {
                debug!("{program} cancelled; killing");
                kill_and_reap(&mut child).await;
                return Err(self.cancelled_error(stage));
            }
        };

        let status = status.map_err(|source| {
            Error::subprocess(
                stage,
                SubprocessError::Wait {
                    program: program.clone(),
                    source,
                },
            )
        })?;

        if !status.success() {
            let mut detail = last_diagnostic.unwrap_or_else(|| "no diagnostic output".to_string());
            if let Some(e) = drain_error {
                detail.push_str(&format!("; output drain failed: {e}"));
            }
            return Err(Error::subprocess(
                stage,
                SubprocessError::Exit {
                    program,
                    status: status.to_string(),
                    detail,
                },
            ));
        }

        if let Some(e) = drain_error {
            warn!("{program} succeeded but reading its output failed: {e}");
        }
        Ok(())
    }

    fn timed_out(&self, stage: Stage) -> Error {
        Error::subprocess(
            stage,
            SubprocessError::TimedOut {
                program: self.program_name(),
                timeout: self.timeout,
            },
        )
    }

    fn cancelled_error(&self, stage: Stage) -> Error {
        Error::subprocess(
            stage,
            SubprocessError::Cancelled {
                program: self.program_name(),
            },
        )
    }
}

async fn cancelled(token: Option<&CancellationToken>) {
    match token {
        Some(token) => token.cancelled().await,
        None => std::future::pending().await,
    }
}

async fn kill_and_reap(child: &mut Child) {
    if let Err(e) = child.start_kill() {
        debug!("kill failed: {e}");
    }
    if let Err(e) = child.wait().await {
        debug!("reaping killed process failed: {e}");
    }
}

/// Whether a fetcher output line reports download progress.
pub fn is_progress_line(line: &[u8]) -> bool {
    line.contains(&b'%') || line.windows(3).any(|w| w == b"ETA")
}

/// Read `reader` to the end, calling `on_line` for every line of at most
/// `limit` bytes. Longer lines are dropped without being buffered.
pub async fn scan_lines<R, F>(reader: R, limit: usize, mut on_line: F) -> io::Result<()>
where
    R: AsyncRead + Unpin,
    F: FnMut(&[u8]),
{
    let mut reader = BufReader::with_capacity(READ_CHUNK, reader);
    let mut line: Vec<u8> = Vec::new();
    let mut overlong = false;
    let mut skipped = 0usize;

    loop {
        let buf = reader.fill_buf().await?;
        if buf.is_empty() {
            break;
        }

        let newline = buf.iter().position(|&b| b == b'\n');
        let (take, consumed) = match newline {
            Some(i) => (i, i + 1),
            None => (buf.len(), buf.len()),
        };

        if !overlong {
            if line.len() + take > limit {
                overlong = true;
                line.clear();
            } else {
                line.extend_from_slice(&buf[..take]);
            }
        }
        reader.consume(consumed);

        if newline.is_some() {
            if overlong {
                skipped += 1;
            } else {
                on_line(strip_cr(&line));
            }
            line.clear();
            overlong = false;
        }
    }

    if overlong {
        skipped += 1;
    } else if !line.is_empty() {
        on_line(strip_cr(&line));
    }
    if skipped > 0 {
        debug!("Skipped {skipped} output line(s) longer than {limit} bytes");
    }
    Ok(())
}

fn strip_cr(line: &[u8]) -> &[u8] {
    line.strip_suffix(b"\r").unwrap_or(line)
}
