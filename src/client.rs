//! Single-file validation with bounded retry
//!
//! A [`ValidationClient`] takes one [`FileTask`] through its whole attempt
//! chain: staging a wrapped copy for templates, calling the checker until it
//! answers or the attempt budget runs out, then relocating and filtering the
//! diagnostics.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, warn};
use tempfile::NamedTempFile;
use tokio::time::sleep;

use crate::checker::{CheckRequest, HtmlChecker, OutputShape};
use crate::error::{Result, ValidationError};
use crate::rules::SuppressionRules;
use crate::task::{Diagnostic, FileTask};
use crate::template::{WrappingRules, relocate};

/// Configuration for a validation client
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub doctype: String,
    pub charset: String,
    pub proxy: Option<String>,
    /// Total checker calls allowed per file
    pub max_attempts: u32,
    /// Initial retry delay in milliseconds
    pub retry_delay_ms: u64,
    /// Maximum retry delay in milliseconds (for exponential backoff cap)
    pub max_retry_delay_ms: u64,
}

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            doctype: "HTML5".to_string(),
            charset: "utf-8".to_string(),
            proxy: None,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_delay_ms: 500,
            max_retry_delay_ms: 8000,
        }
    }
}

/// Validates one file at a time against a checker, sharing compiled rules read-only
pub struct ValidationClient {
    checker: Arc<dyn HtmlChecker>,
    suppression: Arc<SuppressionRules>,
    wrapping: Arc<WrappingRules>,
    config: ClientConfig,
}

impl ValidationClient {
    pub fn new(
        checker: Arc<dyn HtmlChecker>,
        suppression: Arc<SuppressionRules>,
        wrapping: Arc<WrappingRules>,
        config: ClientConfig,
    ) -> Self {
        Self {
            checker,
            suppression,
            wrapping,
            config,
        }
    }

    /// Run the full attempt chain for `task` and record its filtered diagnostics
    pub async fn validate(&self, mut task: FileTask) -> FileTask {
        let diagnostics = match self.check_task(&mut task).await {
            Ok(raw) => {
                let raw = if task.is_template {
                    raw.into_iter().map(relocate).collect()
                } else {
                    raw
                };
                self.suppression.filter(raw)
            }
            Err(e) => {
                warn!("Unable to validate {}: {}", task.path.display(), e);
                vec![Diagnostic::unable_to_validate()]
            }
        };

        task.diagnostics = Some(diagnostics);
        task
    }

    /// Raw checker diagnostics for `task`, staging a wrapped copy first for templates
    async fn check_task(&self, task: &mut FileTask) -> Result<Vec<Diagnostic>> {
        if !task.is_template {
            let path = task.path.clone();
            return self.check_with_retry(task, &path).await;
        }

        // Removed when the guard drops, whichever way this returns
        let staged = self.stage_template(&task.path).await?;
        debug!(
            "Staged template {} as {}",
            task.path.display(),
            staged.path().display()
        );
        self.check_with_retry(task, staged.path()).await
    }

    async fn stage_template(&self, source: &Path) -> Result<NamedTempFile> {
        let staging_error = |e: std::io::Error| ValidationError::TemplateStaging {
            file: source.to_path_buf(),
            details: e.to_string(),
        };

        let fragment = tokio::fs::read_to_string(source)
            .await
            .map_err(staging_error)?;
        let document = self.wrapping.wrap(&fragment);

        let staged = tempfile::Builder::new()
            .prefix("html-angular-validate-")
            .suffix(".html")
            .tempfile()
            .map_err(staging_error)?;
        tokio::fs::write(staged.path(), document)
            .await
            .map_err(staging_error)?;

        Ok(staged)
    }

    /// Call the checker until it answers or the attempt budget is spent
    async fn check_with_retry(&self, task: &mut FileTask, target: &Path) -> Result<Vec<Diagnostic>> {
        let request = CheckRequest {
            file: target.to_path_buf(),
            output: OutputShape::Json,
            doctype: self.config.doctype.clone(),
            charset: self.config.charset.clone(),
            proxy: self.config.proxy.clone(),
        };

        loop {
            task.attempts += 1;
            match self.checker.check(&request).await {
                Ok(diagnostics) => return Ok(diagnostics),
                Err(error) => {
                    if error.is_transient() && task.attempts < self.config.max_attempts {
                        debug!(
                            "Checker unavailable for {} (attempt {}/{}): {}",
                            task.path.display(),
                            task.attempts,
                            self.config.max_attempts,
                            error
                        );
                        self.wait_before_retry(task.attempts - 1).await;
                        continue;
                    }
                    return Err(error);
                }
            }
        }
    }

    /// Wait before retry with exponential backoff
    async fn wait_before_retry(&self, attempt: u32) {
        let delay = self.retry_delay(attempt);
        if !delay.is_zero() {
            sleep(delay).await;
        }
    }

    fn retry_delay(&self, attempt: u32) -> Duration {
        let delay_ms = self
            .config
            .retry_delay_ms
            .saturating_mul(2_u64.saturating_pow(attempt));
        Duration::from_millis(delay_ms.min(self.config.max_retry_delay_ms))
    }
}
