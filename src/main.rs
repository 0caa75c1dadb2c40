//! nlq-rs binary entry point.

use std::io::Write;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use nlq_rs::cli::{Cli, execute};

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let output = execute(&cli)?;
    if !output.is_empty() {
        std::io::stdout().lock().write_all(output.as_bytes())?;
    }
    Ok(())
}
