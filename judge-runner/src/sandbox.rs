use async_trait::async_trait;
use nix::errno::Errno;
use nix::sys::resource::{setrlimit, Resource};
use nix::sys::signal::{killpg, Signal};
use nix::unistd::Pid;
use std::ffi::OsString;
use std::os::unix::process::{CommandExt, ExitStatusExt};
use std::path::Path;
use std::process::Stdio;
use std::time::Instant;
use tokio::{
    io::{AsyncRead, AsyncReadExt},
    process::Command,
    task::JoinHandle,
    time::{self, Duration},
};
use tracing::{debug, warn};

use crate::{error::Error, languages::CommandSpec, types::ResourceLimits};

/// How long to wait for the output pipes to close once the process is gone
const PIPE_DRAIN_GRACE: Duration = Duration::from_secs(2);

const FALLBACK_PATH: &str = "/usr/local/bin:/usr/bin:/bin";

/// Which half of a build-then-run chain a process belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Build,
    Run,
}

/// Captured outcome of one child process
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcessOutput {
    pub exit_code: Option<i32>,
    pub signal: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    /// Killed for exceeding the wall-clock or CPU budget
    pub timed_out: bool,
    /// stdout or stderr exceeded the capture cap
    pub truncated: bool,
    pub elapsed: Duration,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        !self.timed_out && self.exit_code == Some(0)
    }

    /// Text explaining a failed process: stderr, else stdout, else the exit
    /// status itself.
    pub fn diagnostic(&self) -> String {
        if !self.stderr.trim().is_empty() {
            return self.stderr.clone();
        }
        if !self.stdout.trim().is_empty() {
            return self.stdout.clone();
        }
        match (self.exit_code, self.signal) {
            (Some(code), _) => format!("process exited with status {}", code),
            (None, Some(signal)) => format!("process terminated by signal {}", signal),
            (None, None) => "process failed without output".to_string(),
        }
    }
}

/// Launches a resolved command and captures its output.
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    async fn execute(
        &self,
        command: &CommandSpec,
        stdin: &Path,
        timeout: Duration,
        stage: Stage,
    ) -> Result<ProcessOutput, Error>;
}

/// Runs each command as the leader of a fresh process group so that a
/// timeout can take down everything it spawned.
#[derive(Debug, Clone, Default)]
pub struct Sandbox {
    limits: ResourceLimits,
}

impl Sandbox {
    pub fn new(limits: ResourceLimits) -> Self {
        Self { limits }
    }

    fn command(&self, spec: &CommandSpec, stdin: &Path, stage: Stage) -> Result<Command, Error> {
        let stdin = std::fs::File::open(stdin).map_err(|e| {
            Error::Sandbox(format!("Failed to open stdin file {}: {}", stdin.display(), e))
        })?;

        let mut command = std::process::Command::new(&spec.program);
        command
            .args(&spec.args)
            .current_dir(&spec.current_dir)
            .env_clear()
            .env("PATH", host_path())
            .env("HOME", &spec.current_dir)
            .env("LANG", "C.UTF-8")
            .stdin(Stdio::from(stdin))
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .process_group(0);

        if stage == Stage::Run {
            let cpu_time = self.limits.cpu_time;
            let file_size = self.limits.file_size;
            // SAFETY: setrlimit is async-signal-safe and nothing is allocated.
            // The hard CPU limit sits one second above the soft one so the
            // kernel delivers SIGXCPU rather than SIGKILL.
            unsafe {
                command.pre_exec(move || {
                    setrlimit(Resource::RLIMIT_CPU, cpu_time, cpu_time.saturating_add(1))?;
                    setrlimit(Resource::RLIMIT_FSIZE, file_size, file_size)?;
                    Ok(())
                });
            }
        }

        let mut command = Command::from(command);
        command.kill_on_drop(true);
        Ok(command)
    }
}

#[async_trait]
impl ProcessRunner for Sandbox {
    async fn execute(
        &self,
        spec: &CommandSpec,
        stdin: &Path,
        timeout: Duration,
        stage: Stage,
    ) -> Result<ProcessOutput, Error> {
        debug!(?stage, "Sandbox execute - Command: {}", spec.program.display());
        debug!("Sandbox execute - Args: {:?}", spec.args);
        debug!("Sandbox execute - Dir: {}", spec.current_dir.display());

        let mut command = self.command(spec, stdin, stage)?;
        let start = Instant::now();
        let mut child = command.spawn().map_err(|e| {
            Error::Sandbox(format!(
                "Failed to spawn {}: {}",
                spec.program.display(),
                e
            ))
        })?;
        let mut group = child.id().map(ProcessGroup::new);

        let cap = self.limits.max_output_bytes;
        let stdout = spawn_capture(child.stdout.take(), cap);
        let stderr = spawn_capture(child.stderr.take(), cap);

        let (status, mut timed_out) = match time::timeout(timeout, child.wait()).await {
            Ok(status) => {
                let status =
                    status.map_err(|e| Error::Sandbox(format!("Process error: {}", e)))?;
                (Some(status), false)
            }
            Err(_) => {
                warn!(
                    ?stage,
                    "{} exceeded {} ms, killing process group",
                    spec.program.display(),
                    timeout.as_millis()
                );
                (None, true)
            }
        };
        let elapsed = start.elapsed();

        // Also sweeps up background processes left by a program that exited
        if let Some(group) = group.as_mut() {
            group.kill();
        }
        let status = match status {
            Some(status) => status,
            None => {
                if let Err(e) = child.kill().await {
                    debug!("Child already gone after group kill: {}", e);
                }
                child
                    .wait()
                    .await
                    .map_err(|e| Error::Sandbox(format!("Failed to reap process: {}", e)))?
            }
        };

        let signal = status.signal();
        if signal == Some(Signal::SIGXCPU as i32) {
            timed_out = true;
        }

        let (stdout, stdout_truncated) = collect_capture(stdout).await;
        let (stderr, stderr_truncated) = collect_capture(stderr).await;

        debug!(
            ?stage,
            exit_code = ?status.code(),
            ?signal,
            timed_out,
            "Process finished in {} ms",
            elapsed.as_millis()
        );

        Ok(ProcessOutput {
            exit_code: status.code(),
            signal,
            stdout,
            stderr,
            timed_out,
            truncated: stdout_truncated || stderr_truncated,
            elapsed,
        })
    }
}

fn host_path() -> OsString {
    std::env::var_os("PATH").unwrap_or_else(|| FALLBACK_PATH.into())
}

/// Kills the child's process group when dropped, so a cancelled request
/// takes its descendants down with it and not just the group leader.
struct ProcessGroup {
    pgid: u32,
    killed: bool,
}

impl ProcessGroup {
    fn new(pgid: u32) -> Self {
        Self {
            pgid,
            killed: false,
        }
    }

    fn kill(&mut self) {
        if !self.killed {
            self.killed = true;
            kill_process_group(self.pgid);
        }
    }
}

impl Drop for ProcessGroup {
    fn drop(&mut self) {
        if !self.killed {
            debug!("Execution cancelled, killing process group {}", self.pgid);
            self.kill();
        }
    }
}

fn kill_process_group(pid: u32) {
    match killpg(Pid::from_raw(pid as i32), Signal::SIGKILL) {
        Ok(()) | Err(Errno::ESRCH) => {}
        Err(e) => warn!("Failed to kill process group {}: {}", pid, e),
    }
}

type Capture = JoinHandle<std::io::Result<(Vec<u8>, bool)>>;

fn spawn_capture<R>(reader: Option<R>, cap: usize) -> Option<Capture>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    reader.map(|reader| tokio::spawn(read_capped(reader, cap)))
}

/// Read to EOF keeping at most `cap` bytes; the rest is drained so the
/// writer never blocks on a full pipe.
async fn read_capped<R: AsyncRead + Unpin>(
    mut reader: R,
    cap: usize,
) -> std::io::Result<(Vec<u8>, bool)> {
    let mut captured = Vec::new();
    let mut truncated = false;
    let mut chunk = [0u8; 8192];

    loop {
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        let room = cap.saturating_sub(captured.len());
        if n > room {
            truncated = true;
        }
        captured.extend_from_slice(&chunk[..n.min(room)]);
    }

    Ok((captured, truncated))
}

async fn collect_capture(capture: Option<Capture>) -> (String, bool) {
    let Some(mut capture) = capture else {
        return (String::new(), false);
    };

    match time::timeout(PIPE_DRAIN_GRACE, &mut capture).await {
        Ok(Ok(Ok((bytes, truncated)))) => (String::from_utf8_lossy(&bytes).into_owned(), truncated),
        Ok(Ok(Err(e))) => {
            warn!("Failed to read process output: {}", e);
            (String::new(), false)
        }
        Ok(Err(e)) => {
            warn!("Output capture task failed: {}", e);
            (String::new(), false)
        }
        Err(_) => {
            // A descendant escaped the process group and still holds the pipe
            capture.abort();
            warn!("Output pipe still open after process exit, giving up on it");
            (String::new(), true)
        }
    }
}
