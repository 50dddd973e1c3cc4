//! CLI command definitions and execution
//!
//! Every command except `completions` loads the configuration, builds the
//! handler registry from it and works on [`AnyPath`](ap_core::AnyPath) values.

use std::sync::Arc;

use clap::{Parser, Subcommand};

use ap_core::{ConfigManager, Error, HandlerRegistry};

use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig};

mod backend;
mod completions;
mod copy;
mod exists;
mod listdir;
mod remove;

pub use backend::build_registry;

/// anypath - one path for local files, S3 buckets and Azure blob containers
///
/// Addresses are classified by shape: `s3://bucket/key` and
/// `https://bucket.s3.amazonaws.com/key` are S3 paths,
/// `https://account.blob.core.windows.net/container/blob` is an Azure path,
/// anything else is a local path.
#[derive(Parser, Debug)]
#[command(name = "anypath")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format: human-readable or JSON
    #[arg(long, global = true, default_value = "false")]
    pub json: bool,

    /// Disable colored output
    #[arg(long, global = true, default_value = "false")]
    pub no_color: bool,

    /// Disable progress spinner
    #[arg(long, global = true, default_value = "false")]
    pub no_progress: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true, default_value = "false")]
    pub quiet: bool,

    /// Enable debug logging
    #[arg(long, global = true, default_value = "false")]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Copy a file or directory between any two locations
    Copy(copy::CopyArgs),

    /// Print whether a path exists
    Exists(exists::ExistsArgs),

    /// List the immediate children of a directory
    #[command(visible_alias = "iterdir")]
    Listdir(listdir::ListdirArgs),

    /// Remove a file or directory tree
    Remove(remove::RemoveArgs),

    /// Generate shell completion scripts
    Completions(completions::CompletionsArgs),
}

impl Commands {
    /// Whether the command asked for per-object transfer logging
    pub fn is_verbose(&self) -> bool {
        matches!(self, Commands::Copy(args) if args.verbose)
    }
}

/// Execute the CLI command and return an exit code
pub async fn execute(cli: Cli) -> ExitCode {
    let mut output_config = OutputConfig {
        json: cli.json,
        no_color: cli.no_color,
        no_progress: cli.no_progress,
        quiet: cli.quiet,
    };

    if let Commands::Completions(args) = cli.command {
        return completions::execute(args);
    }

    let config = match ConfigManager::new().and_then(|manager| manager.load()) {
        Ok(config) => config,
        Err(e) => return report_error(&Formatter::new(output_config), &e),
    };
    if !config.defaults.progress {
        output_config.no_progress = true;
    }

    let formatter = Formatter::new(output_config);
    let registry = Arc::new(build_registry(&config));

    match cli.command {
        Commands::Copy(args) => copy::execute(args, &registry, &formatter).await,
        Commands::Exists(args) => exists::execute(args, &registry, &formatter).await,
        Commands::Listdir(args) => listdir::execute(args, &registry, &formatter).await,
        Commands::Remove(args) => remove::execute(args, &registry, &formatter).await,
        Commands::Completions(args) => completions::execute(args),
    }
}

/// Print an error and pick the exit code for it
pub(crate) fn report_error(formatter: &Formatter, error: &Error) -> ExitCode {
    formatter.error(error);
    ExitCode::from_error(error)
}
