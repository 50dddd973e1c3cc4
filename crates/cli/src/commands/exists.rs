//! exists command - Print whether a path exists

use std::sync::Arc;

use clap::Args;
use ap_core::HandlerRegistry;

use super::report_error;
use crate::exit_code::ExitCode;
use crate::output::{Formatter, Report};

/// Check whether a path exists
#[derive(Args, Debug)]
pub struct ExistsArgs {
    /// Address to check
    #[arg(short, long)]
    pub path: String,
}

/// Execute the exists command
///
/// A missing path is a successful answer, not an error.
pub async fn execute(
    args: ExistsArgs,
    registry: &Arc<HandlerRegistry>,
    formatter: &Formatter,
) -> ExitCode {
    let path = match registry.path(&args.path) {
        Ok(path) => path,
        Err(e) => return report_error(formatter, &e),
    };

    match path.exists().await {
        Ok(exists) => {
            formatter.report(&Report::Exists {
                path: &path,
                exists,
            });
            ExitCode::Success
        }
        Err(e) => report_error(formatter, &e),
    }
}
