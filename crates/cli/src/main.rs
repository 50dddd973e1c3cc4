//! anypath - one path for local files, S3 buckets and Azure blob containers
//!
//! Copies, lists, checks and removes files and directories with the same
//! commands whatever storage backs them.

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod commands;
mod exit_code;
mod output;

use commands::Cli;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Logs go to stderr so stdout stays parseable in JSON mode
    let filter = if cli.debug {
        EnvFilter::new("debug")
    } else {
        let fallback = if cli.command.is_verbose() { "info" } else { "warn" };
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback))
    };
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(!cli.no_color),
        )
        .with(filter)
        .init();

    let exit_code = commands::execute(cli).await;

    std::process::exit(exit_code.as_i32());
}
