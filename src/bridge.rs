//! Byte relay between a local reader/writer pair and a stream connection
//!
//! Used by the `procstream` binary to wire its own stdin/stdout to a server
//! process. Local input is copied to the server until it ends, at which
//! point the server's input is closed; server output is copied back until
//! the server closes it.

use std::future::Future;
use std::io;

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};

use crate::connection::StreamConnectionProvider;

/// Why a relay finished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayOutcome {
    /// The server closed its output after sending `bytes`
    ServerClosed { bytes: u64 },
    /// The interrupt future completed first
    Interrupted,
}

/// Relay between `input`/`output` and a running connection
///
/// Takes ownership of the connection's output stream so it can be closed
/// when `input` ends. Fails with `NotConnected` if the provider is not
/// running or its output was already taken.
pub async fn bridge<P, I, O, S>(
    provider: &mut P,
    input: I,
    output: O,
    interrupt: S,
) -> io::Result<RelayOutcome>
where
    P: StreamConnectionProvider,
    I: AsyncRead + Unpin,
    O: AsyncWrite + Unpin,
    S: Future<Output = ()>,
{
    let to_server = provider.take_output_stream().ok_or_else(not_connected)?;
    let from_server = provider.input_stream().ok_or_else(not_connected)?;

    relay(from_server, to_server, input, output, interrupt).await
}

/// Copy `input` into `to_server` and `from_server` into `output`
///
/// `to_server` is dropped as soon as `input` ends or fails, so the peer sees
/// end of input. Returns when `from_server` reaches end of stream or
/// `interrupt` completes.
pub async fn relay<R, W, I, O, S>(
    from_server: &mut R,
    to_server: W,
    input: I,
    mut output: O,
    interrupt: S,
) -> io::Result<RelayOutcome>
where
    R: AsyncRead + Unpin + ?Sized,
    W: AsyncWrite + Unpin,
    I: AsyncRead + Unpin,
    O: AsyncWrite + Unpin,
    S: Future<Output = ()>,
{
    let forward_input = async move {
        let mut input = input;
        let mut to_server = to_server;
        let copied = tokio::io::copy(&mut input, &mut to_server).await?;
        to_server.shutdown().await?;
        Ok::<u64, io::Error>(copied)
    };
    let forward_output = async {
        let copied = tokio::io::copy(from_server, &mut output).await?;
        output.flush().await?;
        Ok::<u64, io::Error>(copied)
    };
    tokio::pin!(forward_input);
    tokio::pin!(forward_output);
    tokio::pin!(interrupt);

    let mut input_open = true;
    loop {
        tokio::select! {
            result = &mut forward_input, if input_open => {
                input_open = false;
                match result {
                    Ok(bytes) => debug!("Input closed after {} bytes, closed server input", bytes),
                    Err(e) => warn!("Failed to forward input: {}", e),
                }
            }
            result = &mut forward_output => {
                let bytes = result?;
                info!("Server closed its output after {} bytes", bytes);
                return Ok(RelayOutcome::ServerClosed { bytes });
            }
            _ = &mut interrupt => {
                info!("Relay interrupted");
                return Ok(RelayOutcome::Interrupted);
            }
        }
    }
}

fn not_connected() -> io::Error {
    io::Error::new(io::ErrorKind::NotConnected, "connection not available")
}
