use clap::Parser;
use procstream::logging::{LogConfig, init_logging};
use procstream::bridge::{RelayOutcome, bridge};
use procstream::{LaunchSpec, ProcessConnectionProvider};

use std::path::PathBuf;
use tracing::{error, info};

/// Relay this process's stdin/stdout to a launched server process
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Working directory for the server process (defaults to current directory)
    #[arg(long, value_name = "DIR")]
    working_dir: Option<PathBuf>,

    /// Remove single quotes from command tokens before launching
    #[arg(long)]
    strip_single_quotes: bool,

    /// Kill the server if the bridge exits without stopping it
    #[arg(long)]
    kill_on_drop: bool,

    /// Log level (overrides RUST_LOG env var)
    #[arg(long, value_name = "LEVEL")]
    log_level: Option<String>,

    /// Log file path (overrides PROCSTREAM_LOG_FILE env var)
    #[arg(long, value_name = "FILE")]
    log_file: Option<PathBuf>,

    /// Server command and its arguments
    #[arg(required = true, trailing_var_arg = true, value_name = "COMMAND")]
    command: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let log_config = LogConfig::from_env().with_overrides(args.log_level, args.log_file);

    if let Err(e) = init_logging(log_config) {
        eprintln!("Failed to initialize logging: {e}");
        std::process::exit(1);
    }

    let working_dir = match args.working_dir {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };

    let spec = LaunchSpec::builder()
        .args(args.command)
        .working_directory(working_dir)
        .strip_single_quotes(args.strip_single_quotes)
        .kill_on_drop(args.kill_on_drop)
        .build();

    let mut provider = ProcessConnectionProvider::new(spec);
    provider.start()?;

    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };
    let result = bridge(
        &mut provider,
        tokio::io::stdin(),
        tokio::io::stdout(),
        interrupt,
    )
    .await;
    provider.stop();

    match result {
        Ok(RelayOutcome::ServerClosed { .. }) => info!("Server finished"),
        Ok(RelayOutcome::Interrupted) => info!("Interrupted, server stopped"),
        Err(e) => {
            error!("Relay failed: {}", e);
            std::process::exit(1);
        }
    }

    // A pending stdin read would otherwise keep the runtime alive.
    std::process::exit(0);
}
