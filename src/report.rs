//! Result aggregation and the JSON report

use std::path::Path;

use chrono::{DateTime, Utc};
use log::info;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ValidationError};
use crate::task::{Diagnostic, FileTask};

/// Aggregated outcome of one run, in task registration order
#[derive(Debug, Clone)]
pub struct ValidationResults {
    pub started_at: DateTime<Utc>,
    pub tasks: Vec<FileTask>,
}

impl ValidationResults {
    pub fn new(started_at: DateTime<Utc>, tasks: Vec<FileTask>) -> Self {
        Self { started_at, tasks }
    }

    pub fn files_checked(&self) -> usize {
        self.tasks.len()
    }

    pub fn files_succeeded(&self) -> usize {
        self.tasks.iter().filter(|t| t.succeeded()).count()
    }

    pub fn failed(&self) -> impl Iterator<Item = &FileTask> {
        self.tasks.iter().filter(|t| !t.succeeded())
    }

    /// True when every file came through filtering clean; vacuously true for no files
    pub fn success(&self) -> bool {
        self.tasks.iter().all(FileTask::succeeded)
    }

    pub fn report(&self) -> ValidationReport {
        ValidationReport::from_results(self)
    }
}

/// Serialized report, matching the historical `html-angular-validate-report.json` layout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub datetime: DateTime<Utc>,
    pub fileschecked: usize,
    pub filessucceeded: usize,
    pub failed: Vec<FailedFile>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedFile {
    pub filepath: String,
    pub numerrs: usize,
    pub errors: Vec<ReportedError>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportedError {
    pub line: u32,
    pub col: u32,
    pub msg: String,
}

impl From<&Diagnostic> for ReportedError {
    fn from(diagnostic: &Diagnostic) -> Self {
        Self {
            line: diagnostic.line,
            col: diagnostic.column,
            msg: diagnostic.message.clone(),
        }
    }
}

impl ValidationReport {
    pub fn from_results(results: &ValidationResults) -> Self {
        let failed: Vec<FailedFile> = results
            .failed()
            .map(|task| {
                let errors: Vec<ReportedError> =
                    task.diagnostics().iter().map(ReportedError::from).collect();
                FailedFile {
                    filepath: task.path.to_string_lossy().into_owned(),
                    numerrs: errors.len(),
                    errors,
                }
            })
            .collect();

        Self {
            datetime: results.started_at,
            fileschecked: results.files_checked(),
            filessucceeded: results.files_succeeded(),
            failed,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Write the report, creating parent directories as needed
    pub async fn write(&self, path: &Path) -> Result<()> {
        let report_error = |details: String| ValidationError::Report {
            path: path.to_path_buf(),
            details,
        };

        let json = self.to_json().map_err(|e| report_error(e.to_string()))?;
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| report_error(e.to_string()))?;
        }
        tokio::fs::write(path, json)
            .await
            .map_err(|e| report_error(e.to_string()))?;

        info!("Wrote validation report to {}", path.display());
        Ok(())
    }
}

/// Remove a report left over from an earlier run, if there is one
pub async fn remove_stale_report(path: &Path) -> Result<()> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(ValidationError::Report {
            path: path.to_path_buf(),
            details: e.to_string(),
        }),
    }
}
