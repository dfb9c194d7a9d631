mod commands;
pub mod core;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::commands::Cli;

pub fn run() {
    let cli = Cli::parse();

    // Initialize structured logging; stdout stays free for command output.
    let default_filter = if cli.verbose {
        "info,modsync_lib=debug"
    } else {
        "warn,modsync_lib=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!("modsync {} starting...", env!("CARGO_PKG_VERSION"));

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("error: could not start async runtime: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = runtime.block_on(commands::execute(cli)) {
        tracing::error!("{}", e);
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
