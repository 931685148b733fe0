//! Test doubles for process connections
//!
//! [`FakeLauncher`] hands out a single [`FakeProcess`] whose stdio is backed
//! by in-memory duplex pipes, so provider logic can be tested without
//! spawning anything.

use std::io;
use std::sync::{Arc, Mutex};

use tokio::io::{DuplexStream, duplex};

use crate::io::{LaunchRequest, ProcessHandle, ProcessLauncher, StopMode};

const PIPE_CAPACITY: usize = 64 * 1024;

/// Test side of a fake process's pipes
pub struct FakePeer {
    /// Write here to feed the provider's input stream
    pub stdout: DuplexStream,
    /// Read here to see what the provider wrote
    pub stdin: DuplexStream,
}

/// In-memory process
pub struct FakeProcess {
    alive: bool,
    stdout: DuplexStream,
    stdin: Option<DuplexStream>,
    terminations: Arc<Mutex<Vec<StopMode>>>,
}

impl FakeProcess {
    pub const PID: u32 = 4242;
}

impl ProcessHandle for FakeProcess {
    type Stdout = DuplexStream;
    type Stdin = DuplexStream;

    fn id(&self) -> Option<u32> {
        Some(Self::PID)
    }

    fn is_alive(&mut self) -> bool {
        self.alive
    }

    fn stdout(&mut self) -> &mut DuplexStream {
        &mut self.stdout
    }

    fn stdin(&mut self) -> Option<&mut DuplexStream> {
        self.stdin.as_mut()
    }

    fn take_stdin(&mut self) -> Option<DuplexStream> {
        self.stdin.take()
    }

    fn stdio(&mut self) -> (&mut DuplexStream, Option<&mut DuplexStream>) {
        (&mut self.stdout, self.stdin.as_mut())
    }

    fn terminate(&mut self, mode: StopMode) {
        self.alive = false;
        self.terminations.lock().unwrap().push(mode);
    }
}

enum Outcome {
    Alive,
    Dead,
    Fail,
}

/// Launcher producing [`FakeProcess`]es and recording every request
pub struct FakeLauncher {
    outcome: Outcome,
    launches: Arc<Mutex<Vec<LaunchRequest>>>,
    terminations: Arc<Mutex<Vec<StopMode>>>,
    peer: Arc<Mutex<Option<FakePeer>>>,
}

impl FakeLauncher {
    fn with_outcome(outcome: Outcome) -> Self {
        Self {
            outcome,
            launches: Arc::new(Mutex::new(Vec::new())),
            terminations: Arc::new(Mutex::new(Vec::new())),
            peer: Arc::new(Mutex::new(None)),
        }
    }

    /// Spawns a process that stays alive
    pub fn alive() -> Self {
        Self::with_outcome(Outcome::Alive)
    }

    /// Spawns a process that has already exited
    pub fn dead() -> Self {
        Self::with_outcome(Outcome::Dead)
    }

    /// Fails to spawn with `NotFound`
    pub fn failing() -> Self {
        Self::with_outcome(Outcome::Fail)
    }

    /// Requests received so far
    pub fn launches(&self) -> Arc<Mutex<Vec<LaunchRequest>>> {
        Arc::clone(&self.launches)
    }

    /// Termination requests received by spawned processes
    pub fn terminations(&self) -> Arc<Mutex<Vec<StopMode>>> {
        Arc::clone(&self.terminations)
    }

    /// Test side of the last spawned process's pipes
    pub fn peer(&self) -> Arc<Mutex<Option<FakePeer>>> {
        Arc::clone(&self.peer)
    }
}

impl ProcessLauncher for FakeLauncher {
    type Process = FakeProcess;

    fn launch(&self, request: &LaunchRequest) -> io::Result<FakeProcess> {
        self.launches.lock().unwrap().push(request.clone());

        let alive = match self.outcome {
            Outcome::Alive => true,
            Outcome::Dead => false,
            Outcome::Fail => {
                return Err(io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("{}: not found", request.program),
                ));
            }
        };

        let (process_stdout, peer_stdout) = duplex(PIPE_CAPACITY);
        let (process_stdin, peer_stdin) = duplex(PIPE_CAPACITY);
        *self.peer.lock().unwrap() = Some(FakePeer {
            stdout: peer_stdout,
            stdin: peer_stdin,
        });

        Ok(FakeProcess {
            alive,
            stdout: process_stdout,
            stdin: Some(process_stdin),
            terminations: Arc::clone(&self.terminations),
        })
    }
}
