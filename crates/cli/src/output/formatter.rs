//! Rendering of command results and errors
//!
//! Every successful command ends in one [`Report`]. JSON mode prints it as a
//! single pretty-printed object on stdout; human mode prints one line per
//! address so results pipe into other tools.

use ap_core::{AnyPath, Error, TransferFailure};
use serde_json::{Value, json};

use super::OutputConfig;

/// Outcome of a successful command
#[derive(Debug)]
pub enum Report<'a> {
    Copied {
        source: &'a AnyPath,
        destination: &'a AnyPath,
    },
    Exists {
        path: &'a AnyPath,
        exists: bool,
    },
    Listing {
        path: &'a AnyPath,
        children: &'a [AnyPath],
    },
    Removed {
        path: &'a AnyPath,
    },
}

impl Report<'_> {
    fn to_json(&self) -> Value {
        match self {
            Report::Copied {
                source,
                destination,
            } => json!({
                "status": "success",
                "source": source.address(),
                "destination": destination.address(),
            }),
            Report::Exists { path, exists } => json!({
                "path": path.address(),
                "exists": exists,
            }),
            Report::Listing { path, children } => json!({
                "path": path.address(),
                "children": children.iter().map(AnyPath::address).collect::<Vec<_>>(),
            }),
            Report::Removed { path } => json!({
                "status": "success",
                "path": path.address(),
            }),
        }
    }

    fn to_lines(&self, colors: bool) -> Vec<String> {
        match self {
            Report::Copied { destination, .. } => vec![destination.address().to_string()],
            Report::Exists { exists, .. } => vec![exists.to_string()],
            Report::Listing { children, .. } => children
                .iter()
                .map(|child| child.address().to_string())
                .collect(),
            Report::Removed { path } => vec![mark(colors, "32", "✓", &format!("Removed {path}"))],
        }
    }
}

fn mark(colors: bool, color: &str, symbol: &str, message: &str) -> String {
    if colors {
        format!("\x1b[{color}m{symbol}\x1b[0m {message}")
    } else {
        format!("{symbol} {message}")
    }
}

/// Prints reports to stdout and errors to stderr
#[derive(Debug, Clone, Default)]
pub struct Formatter {
    config: OutputConfig,
}

impl Formatter {
    pub fn new(config: OutputConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &OutputConfig {
        &self.config
    }

    /// Text for a report; `None` in quiet mode or for an empty human listing
    pub fn render(&self, report: &Report<'_>) -> Option<String> {
        if self.config.quiet {
            return None;
        }
        if self.config.json {
            return serde_json::to_string_pretty(&report.to_json()).ok();
        }
        let lines = report.to_lines(self.config.colors_enabled());
        (!lines.is_empty()).then(|| lines.join("\n"))
    }

    pub fn report(&self, report: &Report<'_>) {
        if let Some(text) = self.render(report) {
            println!("{text}");
        }
    }

    /// Text for a failed command
    ///
    /// Quiet mode never hides errors. A partial transfer lists every failed
    /// object under the summary.
    pub fn render_error(&self, error: &Error) -> String {
        let failures: &[TransferFailure] = match error {
            Error::PartialTransfer { failures, .. } => failures.as_slice(),
            _ => &[],
        };

        if self.config.json {
            let value = json!({
                "error": error.to_string(),
                "code": error.exit_code(),
                "failures": failures
                    .iter()
                    .map(|f| json!({ "source": f.source, "error": f.error.to_string() }))
                    .collect::<Vec<_>>(),
            });
            return serde_json::to_string_pretty(&value).unwrap_or_else(|_| error.to_string());
        }

        let mut lines = vec![mark(
            self.config.colors_enabled(),
            "31",
            "✗",
            &error.to_string(),
        )];
        lines.extend(failures.iter().map(|failure| format!("  {failure}")));
        lines.join("\n")
    }

    pub fn error(&self, error: &Error) {
        eprintln!("{}", self.render_error(error));
    }
}
