//! listdir command - List the immediate children of a directory

use std::sync::Arc;

use clap::Args;
use ap_core::HandlerRegistry;

use super::report_error;
use crate::exit_code::ExitCode;
use crate::output::{Formatter, Report};

/// List a directory
#[derive(Args, Debug)]
pub struct ListdirArgs {
    /// Directory address
    #[arg(short, long)]
    pub path: String,
}

/// Execute the listdir command
pub async fn execute(
    args: ListdirArgs,
    registry: &Arc<HandlerRegistry>,
    formatter: &Formatter,
) -> ExitCode {
    let path = match registry.path(&args.path) {
        Ok(path) => path,
        Err(e) => return report_error(formatter, &e),
    };

    let children = match path.list_children().await {
        Ok(children) => children,
        Err(e) => return report_error(formatter, &e),
    };

    formatter.report(&Report::Listing {
        path: &path,
        children: &children,
    });

    ExitCode::Success
}
