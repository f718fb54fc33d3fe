//! Human-readable output
//!
//! Formats finished files and the run summary. The engine never prints; the
//! binary feeds results through an [`Output`] instead.

use crate::cli::VerbosityLevel;
use crate::report::ValidationResults;
use crate::task::{Diagnostic, FileTask};

/// Output formatter for human-readable results
pub struct Output {
    verbosity: VerbosityLevel,
    show_colors: bool,
}

impl Output {
    pub fn new(verbosity: VerbosityLevel) -> Self {
        Self {
            verbosity,
            show_colors: atty::is(atty::Stream::Stdout),
        }
    }

    /// Formatter that never emits ANSI colours
    pub fn plain(verbosity: VerbosityLevel) -> Self {
        Self {
            verbosity,
            show_colors: false,
        }
    }

    fn colorize(&self, text: &str, color: &str) -> String {
        if self.show_colors {
            format!("\x1b[{}m{}\x1b[0m", color, text)
        } else {
            text.to_string()
        }
    }

    /// Lines for one finished file, or `None` when nothing should be shown
    pub fn format_task(&self, task: &FileTask) -> Option<String> {
        if task.succeeded() {
            return (self.verbosity == VerbosityLevel::Verbose).then(|| {
                format!(
                    "Validating {} ...{}",
                    task.path.display(),
                    self.colorize("OK", "32")
                )
            });
        }

        let mut output = format!(
            "Validating {} ...{}",
            task.path.display(),
            self.colorize("ERROR", "31")
        );
        if self.verbosity != VerbosityLevel::Quiet {
            for diagnostic in task.diagnostics() {
                output.push('\n');
                output.push_str(&self.format_diagnostic(diagnostic));
            }
        }
        Some(output)
    }

    pub fn format_diagnostic(&self, diagnostic: &Diagnostic) -> String {
        if diagnostic.is_whole_file() {
            format!("{} {}", self.colorize("[file]", "33"), diagnostic.message)
        } else {
            let location = format!("[L{}:C{}]", diagnostic.line, diagnostic.column);
            format!("{} {}", self.colorize(&location, "33"), diagnostic.message)
        }
    }

    /// Final verdict line
    pub fn format_summary(&self, results: &ValidationResults) -> String {
        if results.success() {
            let passed = results.files_succeeded();
            self.colorize(&format!("{} files passed validation", passed), "32")
        } else {
            let failed = results.failed().count();
            self.colorize(
                &format!(
                    "{} of {} files failed validation",
                    failed,
                    results.files_checked()
                ),
                "31",
            )
        }
    }
}
