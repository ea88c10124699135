//! Builder for executing external tool commands with timeout and
//! cancellation support.
//!
//! Unlike a plain wait-with-timeout, a [`ToolCommand`] that is stopped (by
//! its timeout or its [`CancellationToken`]) kills the child process and
//! reaps it before returning, so no encoder keeps running after the caller
//! has been told it stopped.

use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio_util::sync::CancellationToken;

/// Default command timeout: 5 minutes.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

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

/// Ways a tool invocation can fail.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    /// The executable does not exist.
    #[error("{tool} not found; is it installed and in PATH?")]
    NotFound { tool: String },

    /// The process could not be started.
    #[error("failed to spawn {tool}: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    /// The process ran and exited unsuccessfully.
    #[error("{tool} exited with status {status}: {stderr}")]
    Failed {
        tool: String,
        status: ExitStatus,
        stderr: String,
    },

    /// The timeout elapsed; the process was killed.
    #[error("{tool} timed out after {timeout:?}")]
    TimedOut { tool: String, timeout: Duration },

    /// The cancellation token fired; the process was killed.
    #[error("{tool} was cancelled")]
    Cancelled { tool: String },

    /// Waiting on the process failed.
    #[error("I/O error waiting for {tool}: {source}")]
    Io {
        tool: String,
        #[source]
        source: std::io::Error,
    },
}

enum Stop {
    TimedOut,
    Cancelled,
}

/// A builder for constructing and executing external tool invocations.
///
/// # Example
///
/// ```no_run
/// use sv_av::ToolCommand;
/// use std::path::PathBuf;
///
/// # async fn example() -> Result<(), sv_av::CommandError> {
/// let output = ToolCommand::new(PathBuf::from("ffprobe"))
///     .args(["-v", "error", "-show_entries", "format=duration"])
///     .arg("/path/to/video.mp4")
///     .execute()
///     .await?;
/// println!("{}", output.stdout);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ToolCommand {
    program: PathBuf,
    args: Vec<String>,
    timeout: Option<Duration>,
    cancel: Option<CancellationToken>,
}

impl ToolCommand {
    /// Create a new command for the given program path.
    pub fn new(program: PathBuf) -> Self {
        Self {
            program,
            args: Vec::new(),
            timeout: Some(DEFAULT_TIMEOUT),
            cancel: None,
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
        self.timeout = Some(d);
        self
    }

    /// Run without a built-in timeout; the caller bounds the run through
    /// [`ToolCommand::cancel_on`].
    pub fn without_timeout(&mut self) -> &mut Self {
        self.timeout = None;
        self
    }

    /// Kill the process as soon as `token` is cancelled.
    pub fn cancel_on(&mut self, token: CancellationToken) -> &mut Self {
        self.cancel = Some(token);
        self
    }

    fn program_name(&self) -> String {
        self.program
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.program.to_string_lossy().to_string())
    }

    /// Execute the command, capturing stdout and stderr.
    ///
    /// # Errors
    ///
    /// - [`CommandError::NotFound`] / [`CommandError::Spawn`] if the process
    ///   cannot be started.
    /// - [`CommandError::TimedOut`] / [`CommandError::Cancelled`] if it was
    ///   stopped; the child has been killed and reaped by then.
    /// - [`CommandError::Failed`] on a non-zero exit (carries stderr).
    pub async fn execute(&self) -> Result<ToolOutput, CommandError> {
        let tool = self.program_name();

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                CommandError::NotFound { tool: tool.clone() }
            } else {
                CommandError::Spawn {
                    tool: tool.clone(),
                    source: e,
                }
            }
        })?;

        tracing::debug!(tool = %tool, pid = ?child.id(), "Spawned {}", tool);

        // Drain both pipes concurrently so a chatty child never blocks on a
        // full pipe while we wait on it.
        let stdout_task = tokio::spawn(read_pipe(child.stdout.take()));
        let stderr_task = tokio::spawn(read_pipe(child.stderr.take()));

        let cancel = self.cancel.clone().unwrap_or_else(CancellationToken::new);
        let timeout = self.timeout;

        let waited = tokio::select! {
            status = child.wait() => Ok(status),
            _ = sleep_or_pending(timeout) => Err(Stop::TimedOut),
            _ = cancel.cancelled() => Err(Stop::Cancelled),
        };

        let status = match waited {
            Ok(Ok(status)) => status,
            Ok(Err(e)) => return Err(CommandError::Io { tool, source: e }),
            Err(stop) => {
                terminate(&mut child, &tool).await;
                stdout_task.abort();
                stderr_task.abort();
                return Err(match stop {
                    Stop::TimedOut => CommandError::TimedOut {
                        tool,
                        timeout: timeout.unwrap_or_default(),
                    },
                    Stop::Cancelled => CommandError::Cancelled { tool },
                });
            }
        };

        let stdout = stdout_task.await.unwrap_or_default();
        let stderr = stderr_task.await.unwrap_or_default();

        let output = ToolOutput {
            status,
            stdout: String::from_utf8_lossy(&stdout).to_string(),
            stderr: String::from_utf8_lossy(&stderr).to_string(),
        };

        if !status.success() {
            return Err(CommandError::Failed {
                tool,
                status,
                stderr: output.stderr.trim().to_string(),
            });
        }

        Ok(output)
    }
}

async fn read_pipe<R: AsyncRead + Unpin>(pipe: Option<R>) -> Vec<u8> {
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        let _ = pipe.read_to_end(&mut buf).await;
    }
    buf
}

async fn sleep_or_pending(timeout: Option<Duration>) {
    match timeout {
        Some(d) => tokio::time::sleep(d).await,
        None => std::future::pending::<()>().await,
    }
}

/// Kill the child and wait for it so it is reaped before we return.
async fn terminate(child: &mut Child, tool: &str) {
    let pid = child.id();
    match child.kill().await {
        Ok(()) => tracing::warn!(tool, ?pid, "Killed {tool}"),
        Err(e) => tracing::error!(tool, ?pid, "Failed to kill {tool}: {e}"),
    }
}
