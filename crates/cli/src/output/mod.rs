//! Terminal output for anypath commands
//!
//! Results go to stdout, errors to stderr, and the copy spinner is drawn
//! only on an interactive, human-mode run.

mod formatter;
mod progress;

pub use formatter::{Formatter, Report};
pub use progress::ProgressBar;

/// Output switches from the global CLI flags and the config file
#[derive(Debug, Clone, Default)]
pub struct OutputConfig {
    pub json: bool,
    pub no_color: bool,
    pub no_progress: bool,
    /// Suppress results; errors are still printed
    pub quiet: bool,
}

impl OutputConfig {
    /// ANSI colors only for human output
    pub fn colors_enabled(&self) -> bool {
        !self.no_color && !self.json
    }

    /// Whether the copy spinner should be drawn
    pub fn shows_progress(&self) -> bool {
        !(self.quiet || self.json || self.no_progress)
    }
}
