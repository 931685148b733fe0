//! Process management layer
//!
//! Narrow abstraction over an OS child process: spawn it with piped
//! stdin/stdout, query liveness, hand out its streams and ask it to
//! terminate. Connection logic sits on top of these traits so it can be
//! exercised against a fake process.

use std::io;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tracing::{trace, warn};

// ============================================================================
// Stop Mode
// ============================================================================

/// How to stop a process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopMode {
    /// Ask the process to exit (SIGTERM), without waiting for it
    Graceful,
    /// Force kill immediately (SIGKILL)
    Force,
}

// ============================================================================
// Launch Request
// ============================================================================

/// Fully resolved description of a process to spawn
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchRequest {
    /// Executable to run
    pub program: String,

    /// Arguments passed to the executable
    pub args: Vec<String>,

    /// Directory the process is spawned in
    pub working_directory: PathBuf,

    /// Kill the process if its handle is dropped while it still runs
    pub kill_on_drop: bool,
}

// ============================================================================
// Process Traits
// ============================================================================

/// Handle to a spawned process and its stdio pipes
pub trait ProcessHandle: Send {
    /// Reader over the process's stdout
    type Stdout: AsyncRead + Unpin + Send;

    /// Writer into the process's stdin
    type Stdin: AsyncWrite + Unpin + Send;

    /// OS process id, if the process has not been reaped yet
    fn id(&self) -> Option<u32>;

    /// Whether the process is still executing
    fn is_alive(&mut self) -> bool;

    /// The process's stdout
    fn stdout(&mut self) -> &mut Self::Stdout;

    /// The process's stdin, `None` once it was taken
    fn stdin(&mut self) -> Option<&mut Self::Stdin>;

    /// Take ownership of stdin; dropping it closes the pipe
    fn take_stdin(&mut self) -> Option<Self::Stdin>;

    /// Both pipes at once, for concurrent reading and writing
    fn stdio(&mut self) -> (&mut Self::Stdout, Option<&mut Self::Stdin>);

    /// Request termination. Does not wait for the process to exit.
    fn terminate(&mut self, mode: StopMode);
}

/// Spawns processes from a [`LaunchRequest`]
pub trait ProcessLauncher: Send + Sync {
    type Process: ProcessHandle;

    /// Spawn the process described by `request`
    fn launch(&self, request: &LaunchRequest) -> io::Result<Self::Process>;
}

// ============================================================================
// Tokio Implementation
// ============================================================================

/// Launcher backed by `tokio::process`
///
/// Must be used from within a Tokio runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioProcessLauncher;

impl ProcessLauncher for TokioProcessLauncher {
    type Process = ChildProcess;

    fn launch(&self, request: &LaunchRequest) -> io::Result<ChildProcess> {
        let mut command = Command::new(&request.program);
        command
            .args(&request.args)
            .current_dir(&request.working_directory)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(request.kill_on_drop);

        let mut child = command.spawn()?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| io::Error::other("stdin not available"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| io::Error::other("stdout not available"))?;

        Ok(ChildProcess {
            child,
            stdin: Some(stdin),
            stdout,
        })
    }
}

/// A child process spawned by [`TokioProcessLauncher`]
#[derive(Debug)]
pub struct ChildProcess {
    child: Child,
    stdin: Option<ChildStdin>,
    stdout: ChildStdout,
}

impl ProcessHandle for ChildProcess {
    type Stdout = ChildStdout;
    type Stdin = ChildStdin;

    fn id(&self) -> Option<u32> {
        self.child.id()
    }

    fn is_alive(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }

    fn stdout(&mut self) -> &mut ChildStdout {
        &mut self.stdout
    }

    fn stdin(&mut self) -> Option<&mut ChildStdin> {
        self.stdin.as_mut()
    }

    fn take_stdin(&mut self) -> Option<ChildStdin> {
        self.stdin.take()
    }

    fn stdio(&mut self) -> (&mut ChildStdout, Option<&mut ChildStdin>) {
        (&mut self.stdout, self.stdin.as_mut())
    }

    fn terminate(&mut self, mode: StopMode) {
        let Some(pid) = self.child.id() else {
            trace!("ChildProcess: already reaped, nothing to terminate");
            return;
        };

        #[cfg(unix)]
        {
            let signal = match mode {
                StopMode::Graceful => libc::SIGTERM,
                StopMode::Force => libc::SIGKILL,
            };
            // SAFETY: kill(2) has no memory-safety preconditions; the pid came
            // from a child we have not reaped yet.
            let rc = unsafe { libc::kill(pid as libc::pid_t, signal) };
            if rc == 0 {
                trace!("Sent {:?} termination signal to process {}", mode, pid);
            } else {
                warn!(
                    "Failed to signal process {}: {}",
                    pid,
                    io::Error::last_os_error()
                );
            }
        }

        #[cfg(not(unix))]
        {
            // No graceful signal outside unix; both modes kill.
            let _ = mode;
            if let Err(e) = self.child.start_kill() {
                warn!("Failed to kill process {}: {}", pid, e);
            }
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    fn request(program: &str, args: &[&str]) -> LaunchRequest {
        LaunchRequest {
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
            working_directory: std::env::temp_dir(),
            kill_on_drop: true,
        }
    }

    #[tokio::test]
    async fn test_launch_and_talk_over_pipes() {
        let mut process = TokioProcessLauncher
            .launch(&request("cat", &[]))
            .unwrap();

        assert!(process.is_alive());
        assert!(process.id().is_some());

        let stdin = process.stdin().unwrap();
        stdin.write_all(b"ping\n").await.unwrap();
        stdin.flush().await.unwrap();

        let mut buf = [0u8; 5];
        process.stdout().read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"ping\n");

        process.terminate(StopMode::Graceful);
    }

    #[tokio::test]
    async fn test_stderr_is_not_captured() {
        let mut process = TokioProcessLauncher
            .launch(&request("sh", &["-c", "echo err >&2; echo out"]))
            .unwrap();

        let mut out = Vec::new();
        process.stdout().read_to_end(&mut out).await.unwrap();
        assert_eq!(out, b"out\n");
    }

    #[tokio::test]
    async fn test_dropping_stdin_closes_pipe() {
        let mut process = TokioProcessLauncher
            .launch(&request("cat", &[]))
            .unwrap();

        let mut stdin = process.take_stdin().unwrap();
        stdin.write_all(b"last words").await.unwrap();
        drop(stdin);
        assert!(process.stdin().is_none());

        let mut out = Vec::new();
        process.stdout().read_to_end(&mut out).await.unwrap();
        assert_eq!(out, b"last words");
    }

    #[tokio::test]
    async fn test_launch_missing_executable() {
        let result = TokioProcessLauncher.launch(&request("/definitely/not/a/real/binary", &[]));
        let err = result.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_force_terminate_ends_process() {
        let mut process = TokioProcessLauncher
            .launch(&request("sleep", &["30"]))
            .unwrap();
        assert!(process.is_alive());

        process.terminate(StopMode::Force);

        let mut rest = Vec::new();
        process.stdout().read_to_end(&mut rest).await.unwrap();

        let mut alive = true;
        for _ in 0..100 {
            if !process.is_alive() {
                alive = false;
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        }
        assert!(!alive, "process should exit after SIGKILL");
    }
}
