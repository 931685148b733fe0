//! Process-backed stream connection
//!
//! [`ProcessConnectionProvider`] launches a server process once and exposes
//! its stdout/stdin as the input/output streams of a connection. Protocol
//! framing happens elsewhere; this type only owns the process lifecycle:
//!
//! ```text
//! Unstarted --start--> Running --stop--> Stopped
//!     |                                     ^
//!     +------- start (spawn failed) --------+
//! ```
//!
//! A provider is never restarted. Owners that need a fresh process create a
//! new provider.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::io;

use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, info, trace};

use crate::connection::error::ConnectionError;
use crate::connection::spec::LaunchSpec;
use crate::io::{ProcessHandle, ProcessLauncher, StopMode, TokioProcessLauncher};

// ============================================================================
// Connection Provider Trait
// ============================================================================

/// A source of a bidirectional byte stream for a protocol client
pub trait StreamConnectionProvider: Send {
    /// Bytes coming from the server
    type Input: AsyncRead + Unpin + Send;

    /// Bytes going to the server
    type Output: AsyncWrite + Unpin + Send;

    /// Establish the connection
    fn start(&mut self) -> Result<(), ConnectionError>;

    /// Stream to read from, `None` when no connection is active
    fn input_stream(&mut self) -> Option<&mut Self::Input>;

    /// Stream to write to, `None` when no connection is active
    fn output_stream(&mut self) -> Option<&mut Self::Output>;

    /// Both streams at once, `None` when no connection is active
    fn streams(&mut self) -> Option<(&mut Self::Input, &mut Self::Output)>;

    /// Take ownership of the output stream; dropping it signals end of input
    /// to the server. Later calls and `output_stream` return `None`.
    fn take_output_stream(&mut self) -> Option<Self::Output>;

    /// Close the output stream, leaving the input stream readable
    fn close_output(&mut self);

    /// Tear the connection down. Safe to call at any time, any number of times.
    fn stop(&mut self);
}

// ============================================================================
// Connection State
// ============================================================================

/// Lifecycle state holding the live process, if any
enum ConnectionState<P> {
    Unstarted,
    Running(P),
    Stopped,
}

/// Observable lifecycle status of a provider
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    /// `start` has not succeeded or failed yet
    Unstarted,
    /// The process was alive when started and has not been stopped
    Running { pid: Option<u32> },
    /// The provider was stopped or failed to spawn its process
    Stopped,
}

impl ConnectionStatus {
    /// Process id while running
    pub fn pid(&self) -> Option<u32> {
        match self {
            ConnectionStatus::Running { pid } => *pid,
            _ => None,
        }
    }

    /// Whether the provider is running
    pub fn is_running(&self) -> bool {
        matches!(self, ConnectionStatus::Running { .. })
    }
}

// ============================================================================
// Process Connection Provider
// ============================================================================

/// Connection over the stdio of a launched process
pub struct ProcessConnectionProvider<L: ProcessLauncher = TokioProcessLauncher> {
    spec: LaunchSpec,
    launcher: L,
    state: ConnectionState<L::Process>,
}

impl ProcessConnectionProvider {
    /// Create a provider that spawns through `tokio::process`
    ///
    /// Nothing is validated or spawned until [`start`](Self::start).
    pub fn new(spec: LaunchSpec) -> Self {
        Self::with_launcher(spec, TokioProcessLauncher)
    }
}

impl<L: ProcessLauncher> ProcessConnectionProvider<L> {
    /// Create a provider that spawns through a custom launcher
    pub fn with_launcher(spec: LaunchSpec, launcher: L) -> Self {
        Self {
            spec,
            launcher,
            state: ConnectionState::Unstarted,
        }
    }

    /// The launch spec this provider was created with
    pub fn launch_spec(&self) -> &LaunchSpec {
        &self.spec
    }

    /// Current lifecycle status
    pub fn status(&self) -> ConnectionStatus {
        match &self.state {
            ConnectionState::Unstarted => ConnectionStatus::Unstarted,
            ConnectionState::Running(process) => ConnectionStatus::Running { pid: process.id() },
            ConnectionState::Stopped => ConnectionStatus::Stopped,
        }
    }

    /// Whether the provider holds a started process
    pub fn is_running(&self) -> bool {
        matches!(self.state, ConnectionState::Running(_))
    }

    /// Process id of the running server
    pub fn pid(&self) -> Option<u32> {
        self.status().pid()
    }

    /// Validate the spec, spawn the process and confirm it is alive
    ///
    /// With the default launcher this must run inside a Tokio runtime.
    pub fn start(&mut self) -> Result<(), ConnectionError> {
        if !matches!(self.state, ConnectionState::Unstarted) {
            return Err(ConnectionError::AlreadyStarted);
        }

        let request = self.spec.to_launch_request()?;

        info!(
            "Starting server process with command {:?} and working directory {}",
            std::iter::once(&request.program)
                .chain(&request.args)
                .collect::<Vec<_>>(),
            request.working_directory.display()
        );

        let mut process = match self.launcher.launch(&request) {
            Ok(process) => process,
            Err(source) => {
                self.state = ConnectionState::Stopped;
                return Err(self.spawn_failed(source));
            }
        };

        if !process.is_alive() {
            self.state = ConnectionState::Stopped;
            return Err(self.spawn_failed(io::Error::other(
                "process exited immediately after spawn",
            )));
        }

        info!("Server process started with PID: {:?}", process.id());
        self.state = ConnectionState::Running(process);
        Ok(())
    }

    /// Server stdout, `None` unless running
    pub fn input_stream(&mut self) -> Option<&mut <L::Process as ProcessHandle>::Stdout> {
        match &mut self.state {
            ConnectionState::Running(process) => Some(process.stdout()),
            _ => None,
        }
    }

    /// Server stdin, `None` unless running with stdin still open
    pub fn output_stream(&mut self) -> Option<&mut <L::Process as ProcessHandle>::Stdin> {
        match &mut self.state {
            ConnectionState::Running(process) => process.stdin(),
            _ => None,
        }
    }

    /// Take ownership of the server's stdin
    ///
    /// Dropping the returned writer closes the pipe, which is how a server
    /// reading until end of input is told to finish.
    pub fn take_output_stream(&mut self) -> Option<<L::Process as ProcessHandle>::Stdin> {
        match &mut self.state {
            ConnectionState::Running(process) => process.take_stdin(),
            _ => None,
        }
    }

    /// Close the server's stdin; its stdout stays readable
    pub fn close_output(&mut self) {
        if self.take_output_stream().is_some() {
            debug!("Closed stdin of server process {:?}", self.pid());
        }
    }

    /// Server stdout and stdin together, `None` unless running
    #[allow(clippy::type_complexity)]
    pub fn streams(
        &mut self,
    ) -> Option<(
        &mut <L::Process as ProcessHandle>::Stdout,
        &mut <L::Process as ProcessHandle>::Stdin,
    )> {
        match &mut self.state {
            ConnectionState::Running(process) => match process.stdio() {
                (input, Some(output)) => Some((input, output)),
                (_, None) => None,
            },
            _ => None,
        }
    }

    /// Ask the server to terminate and release it
    ///
    /// Idempotent; a provider that never started or is already stopped is
    /// left untouched. Does not wait for the process to exit.
    pub fn stop(&mut self) {
        self.stop_with(StopMode::Graceful);
    }

    /// Like [`stop`](Self::stop), choosing how the process is signalled
    pub fn stop_with(&mut self, mode: StopMode) {
        match std::mem::replace(&mut self.state, ConnectionState::Stopped) {
            ConnectionState::Running(mut process) => {
                debug!("Stopping server process {:?} ({:?})", process.id(), mode);
                process.terminate(mode);
            }
            ConnectionState::Unstarted => {
                trace!("stop() on a provider that was never started");
                self.state = ConnectionState::Unstarted;
            }
            ConnectionState::Stopped => {
                trace!("stop() on an already stopped provider");
            }
        }
    }

    fn spawn_failed(&self, source: io::Error) -> ConnectionError {
        ConnectionError::ProcessSpawnFailed {
            spec: self.spec.to_string(),
            source,
        }
    }
}

impl<L: ProcessLauncher> StreamConnectionProvider for ProcessConnectionProvider<L> {
    type Input = <L::Process as ProcessHandle>::Stdout;
    type Output = <L::Process as ProcessHandle>::Stdin;

    fn start(&mut self) -> Result<(), ConnectionError> {
        ProcessConnectionProvider::start(self)
    }

    fn input_stream(&mut self) -> Option<&mut Self::Input> {
        ProcessConnectionProvider::input_stream(self)
    }

    fn output_stream(&mut self) -> Option<&mut Self::Output> {
        ProcessConnectionProvider::output_stream(self)
    }

    fn streams(&mut self) -> Option<(&mut Self::Input, &mut Self::Output)> {
        ProcessConnectionProvider::streams(self)
    }

    fn take_output_stream(&mut self) -> Option<Self::Output> {
        ProcessConnectionProvider::take_output_stream(self)
    }

    fn close_output(&mut self) {
        ProcessConnectionProvider::close_output(self)
    }

    fn stop(&mut self) {
        ProcessConnectionProvider::stop(self)
    }
}

// Identity is the launch spec; launcher and runtime state are ignored.
impl<L: ProcessLauncher> PartialEq for ProcessConnectionProvider<L> {
    fn eq(&self, other: &Self) -> bool {
        self.spec == other.spec
    }
}

impl<L: ProcessLauncher> Eq for ProcessConnectionProvider<L> {}

impl<L: ProcessLauncher> Hash for ProcessConnectionProvider<L> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.spec.hash(state);
    }
}

impl<L: ProcessLauncher> fmt::Debug for ProcessConnectionProvider<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessConnectionProvider")
            .field("spec", &self.spec)
            .field("status", &self.status())
            .finish()
    }
}

impl<L: ProcessLauncher> fmt::Display for ProcessConnectionProvider<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ProcessConnectionProvider({})", self.spec)
    }
}
