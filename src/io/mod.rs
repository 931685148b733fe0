//! I/O layer - Generic abstractions for process management
//!
//! Spawning, liveness and termination of external processes with their
//! stdin/stdout exposed as async streams. Nothing here knows about the
//! protocol spoken over those streams.

pub mod process;

pub use process::{
    ChildProcess, LaunchRequest, ProcessHandle, ProcessLauncher, StopMode, TokioProcessLauncher,
};
