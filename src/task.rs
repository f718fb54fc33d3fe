//! Per-file validation state.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Message recorded when a file could not be validated at all
pub const UNABLE_TO_VALIDATE: &str = "Unable to validate file";

/// A single conformance-checker finding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub line: u32,
    pub column: u32,
    pub message: String,
}

impl Diagnostic {
    pub fn new(line: u32, column: u32, message: impl Into<String>) -> Self {
        Self {
            line,
            column,
            message: message.into(),
        }
    }

    /// Synthetic diagnostic for a file the checker never produced a result for
    pub fn unable_to_validate() -> Self {
        Self::new(0, 0, UNABLE_TO_VALIDATE)
    }

    /// Diagnostics at line 0, column 0 describe the whole file rather than a position in it
    pub fn is_whole_file(&self) -> bool {
        self.line == 0 && self.column == 0
    }
}

/// One input file and the outcome of validating it.
///
/// A task is moved into exactly one validation future; nothing else writes to
/// it while that future runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileTask {
    pub path: PathBuf,
    pub is_template: bool,
    /// Checker calls made so far
    pub attempts: u32,
    /// Filtered diagnostics, set once validation has finished
    pub diagnostics: Option<Vec<Diagnostic>>,
}

impl FileTask {
    pub fn new(path: impl Into<PathBuf>, is_template: bool) -> Self {
        Self {
            path: path.into(),
            is_template,
            attempts: 0,
            diagnostics: None,
        }
    }

    /// Build a task, flagging it as a template when its name ends with `template_suffix`
    pub fn from_path(path: &Path, template_suffix: &str) -> Self {
        let is_template = has_suffix(&path.to_string_lossy(), template_suffix);
        Self::new(path, is_template)
    }

    pub fn is_complete(&self) -> bool {
        self.diagnostics.is_some()
    }

    /// Passed iff validation finished and nothing survived filtering
    pub fn succeeded(&self) -> bool {
        matches!(&self.diagnostics, Some(diagnostics) if diagnostics.is_empty())
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        self.diagnostics.as_deref().unwrap_or(&[])
    }
}

pub fn has_suffix(s: &str, suffix: &str) -> bool {
    s.ends_with(suffix)
}
