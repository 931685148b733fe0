//! Stream connections to external server processes
//!
//! - **Spec**: what to launch and where, plus connection identity
//! - **Provider**: single-use process lifecycle exposing stdout/stdin
//! - **Error**: startup failures

pub mod error;
pub mod provider;
pub mod spec;

#[cfg(test)]
pub mod testing;

pub use error::{ConnectionError, LaunchSpecField};
pub use provider::{ConnectionStatus, ProcessConnectionProvider, StreamConnectionProvider};
pub use spec::{LaunchOptions, LaunchSpec, LaunchSpecBuilder};
