use crate::error::ExecutionFailure;
use std::collections::BTreeMap;
use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;

const READ_CHUNK: usize = 8 * 1024;

/// What a bounded child process left behind.
#[derive(Debug, Default)]
pub(crate) struct ProcessOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
    pub duration: Duration,
    pub timed_out: bool,
    pub truncated: bool,
}

/// One command to run inside a workspace.
pub(crate) struct BoundedCommand<'a> {
    pub program: &'a str,
    pub args: &'a [String],
    pub cwd: &'a Path,
    /// The complete child environment; nothing is inherited
    pub env: &'a BTreeMap<String, String>,
    pub timeout: Duration,
    pub max_output_bytes: usize,
}

impl BoundedCommand<'_> {
    pub fn display(&self) -> String {
        std::iter::once(self.program)
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Default)]
struct Capture {
    bytes: Vec<u8>,
    limit: usize,
    truncated: bool,
}

impl Capture {
    fn new(limit: usize) -> Self {
        Self {
            limit,
            ..Default::default()
        }
    }

    /// Keeps the first `limit` bytes and drains the rest so the child never
    /// blocks on a full pipe.
    async fn read_from<R: AsyncRead + Unpin>(&mut self, reader: Option<R>) {
        let Some(mut reader) = reader else {
            return;
        };
        let mut chunk = [0u8; READ_CHUNK];
        loop {
            match reader.read(&mut chunk).await {
                Ok(0) => break,
                Ok(n) => {
                    let room = self.limit.saturating_sub(self.bytes.len());
                    if n > room {
                        self.truncated = true;
                    }
                    self.bytes.extend_from_slice(&chunk[..n.min(room)]);
                }
                Err(e) => {
                    log::warn!("Failed to read child output: {}", e);
                    break;
                }
            }
        }
    }

    fn into_string(self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }
}

/// Runs a command with a wall-clock bound, capturing bounded output.
///
/// The child gets its own process group, an empty stdin and exactly the
/// environment in `cmd.env`. When the bound elapses the whole group is killed
/// and the child reaped before this returns, so nothing it spawned outlives
/// the call.
///
/// # Errors
///
/// Returns [`ExecutionFailure::Launch`] if the process cannot be started.
/// Timeouts and non-zero exits are reported through [`ProcessOutput`].
pub(crate) async fn run_bounded(cmd: &BoundedCommand<'_>) -> Result<ProcessOutput, ExecutionFailure> {
    let mut command = Command::new(cmd.program);
    command
        .args(cmd.args)
        .current_dir(cmd.cwd)
        .env_clear()
        .envs(cmd.env)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    #[cfg(unix)]
    command.process_group(0);

    log::debug!("Running `{}` in {}", cmd.display(), cmd.cwd.display());

    let start = Instant::now();
    let mut child = command.spawn().map_err(|source| ExecutionFailure::Launch {
        command: cmd.display(),
        source,
    })?;
    let pid = child.id();
    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    let mut out = Capture::new(cmd.max_output_bytes);
    let mut err = Capture::new(cmd.max_output_bytes);

    let waited = tokio::time::timeout(cmd.timeout, async {
        let (status, _, _) = futures::join!(child.wait(), out.read_from(stdout), err.read_from(stderr));
        status
    })
    .await;

    let (exit_code, timed_out) = match waited {
        Ok(Ok(status)) => (status.code(), false),
        Ok(Err(e)) => {
            log::warn!("Failed to wait for `{}`: {}", cmd.display(), e);
            (None, false)
        }
        Err(_) => {
            log::warn!(
                "`{}` exceeded {}s, killing process group",
                cmd.display(),
                cmd.timeout.as_secs_f64()
            );
            kill_group(pid);
            if let Err(e) = child.kill().await {
                log::warn!("Failed to kill `{}`: {}", cmd.display(), e);
            }
            (None, true)
        }
    };

    Ok(ProcessOutput {
        truncated: out.truncated || err.truncated,
        stdout: out.into_string(),
        stderr: err.into_string(),
        exit_code,
        duration: start.elapsed(),
        timed_out,
    })
}

#[cfg(unix)]
fn kill_group(pid: Option<u32>) {
    let Some(pid) = pid else {
        return;
    };
    // SAFETY: killpg has no memory-safety preconditions. The child leads its
    // own group (process_group(0)) and has not been reaped yet, so the id
    // cannot have been reused.
    let rc = unsafe { libc::killpg(pid as libc::pid_t, libc::SIGKILL) };
    if rc != 0 {
        log::debug!(
            "killpg({}) failed: {}",
            pid,
            std::io::Error::last_os_error()
        );
    }
}

#[cfg(not(unix))]
fn kill_group(_pid: Option<u32>) {}
