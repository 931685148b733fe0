//! Launch an external process and use its stdio as a connection.
//!
//! ```no_run
//! use procstream::{LaunchSpec, ProcessConnectionProvider};
//!
//! # async fn run() -> Result<(), procstream::ConnectionError> {
//! let mut provider = ProcessConnectionProvider::new(LaunchSpec::new(
//!     ["clangd", "--log=error"],
//!     "/path/to/project",
//! ));
//! provider.start()?;
//! if let Some((from_server, to_server)) = provider.streams() {
//!     // hand the streams to a protocol client
//!     let _ = (from_server, to_server);
//! }
//! provider.stop();
//! # Ok(())
//! # }
//! ```

pub mod bridge;
pub mod connection;
pub mod io;
pub mod logging;

#[cfg(test)]
mod test_utils;

pub use connection::{
    ConnectionError, ConnectionStatus, LaunchOptions, LaunchSpec, LaunchSpecBuilder,
    LaunchSpecField, ProcessConnectionProvider, StreamConnectionProvider,
};
pub use io::StopMode;
