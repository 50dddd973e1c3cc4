//! copy command - Copy a file or directory between any two locations
//!
//! Without `--output` the source is copied into the local cache and the
//! cache location is printed.

use std::sync::Arc;

use clap::Args;
use ap_core::HandlerRegistry;

use super::report_error;
use crate::exit_code::ExitCode;
use crate::output::{Formatter, ProgressBar, Report};

/// Copy a file or directory
#[derive(Args, Debug)]
pub struct CopyArgs {
    /// Source address (local path, s3://bucket/key or Azure blob URL)
    #[arg(short, long)]
    pub input: String,

    /// Destination address; defaults to a location in the local cache
    #[arg(short, long)]
    pub output: Option<String>,

    /// Log every object as it is transferred
    #[arg(short, long)]
    pub verbose: bool,

    /// Replace existing local destination files (default)
    #[arg(short, long, overrides_with = "no_force")]
    pub force: bool,

    /// Keep existing local destination files
    #[arg(long, overrides_with = "force")]
    pub no_force: bool,
}

/// Execute the copy command
pub async fn execute(
    args: CopyArgs,
    registry: &Arc<HandlerRegistry>,
    formatter: &Formatter,
) -> ExitCode {
    let source = match registry.path(&args.input) {
        Ok(path) => path,
        Err(e) => return report_error(formatter, &e),
    };
    let target = match args.output.as_deref().map(|o| registry.path(o)).transpose() {
        Ok(target) => target,
        Err(e) => return report_error(formatter, &e),
    };

    let options = registry
        .transfer_options()
        .clone()
        .force_overwrite(!args.no_force)
        .verbose(args.verbose);

    let spinner = ProgressBar::spinner(formatter.config(), &format!("Copying {source}"));
    let result = source.copy_with(target.as_ref(), &options).await;
    spinner.finish_and_clear();

    match result {
        Ok(destination) => {
            formatter.report(&Report::Copied {
                source: &source,
                destination: &destination,
            });
            ExitCode::Success
        }
        Err(e) => report_error(formatter, &e),
    }
}
