//! remove command - Remove a file or directory tree
//!
//! Removing a path that does not exist succeeds unless `--strict` is given.

use std::sync::Arc;

use clap::Args;
use ap_core::HandlerRegistry;

use super::report_error;
use crate::exit_code::ExitCode;
use crate::output::{Formatter, Report};

/// Remove a path
#[derive(Args, Debug)]
pub struct RemoveArgs {
    /// Address to remove
    #[arg(short, long)]
    pub path: String,

    /// Fail when the path does not exist
    #[arg(long)]
    pub strict: bool,
}

/// Execute the remove command
pub async fn execute(
    args: RemoveArgs,
    registry: &Arc<HandlerRegistry>,
    formatter: &Formatter,
) -> ExitCode {
    let path = match registry.path(&args.path) {
        Ok(path) => path,
        Err(e) => return report_error(formatter, &e),
    };

    if let Err(e) = path.remove(args.strict).await {
        return report_error(formatter, &e);
    }

    formatter.report(&Report::Removed { path: &path });
    ExitCode::Success
}
