//! Bounded-concurrency validation engine
//!
//! The engine owns the whole run: it clears a stale report, expands the
//! configured patterns into tasks, fans them out over a [`ValidationClient`]
//! with at most `concurrency` checks in flight, and aggregates the finished
//! tasks into [`ValidationResults`] in registration order.
//!
//! Each task is moved into exactly one spawned worker and moved back out when
//! the worker finishes, so no per-file state is shared between workers. The
//! compiled rules live behind `Arc`s inside the client and are read-only.

use futures::future::try_join_all;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::Utc;
use log::{info, warn};

use crate::checker::HtmlChecker;
use crate::client::ValidationClient;
use crate::config::{Config, DEFAULT_TEMPLATE_SUFFIX};
use crate::error::{Result, ValidationError};
use crate::file_discovery::FileDiscovery;
use crate::report::{ValidationResults, remove_stale_report};
use crate::rules::SuppressionRules;
use crate::task::FileTask;
use crate::template::WrappingRules;

/// Engine configuration
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Maximum number of files validated at once
    pub concurrency: usize,
    /// Suffix marking template fragments
    pub template_suffix: String,
    /// Report location; `None` disables the report
    pub report_path: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            concurrency: 1,
            template_suffix: DEFAULT_TEMPLATE_SUFFIX.to_string(),
            report_path: None,
        }
    }
}

/// Progress update, sent once per finished file
#[derive(Debug, Clone)]
pub struct ValidationProgress {
    /// The task that just finished, with its diagnostics recorded
    pub task: FileTask,
    /// Number of files completed so far
    pub completed: usize,
    /// Total number of files scheduled
    pub total: usize,
}

/// Progress callback type for validation updates
pub type ProgressCallback = Arc<dyn Fn(ValidationProgress) + Send + Sync>;

pub struct ValidationEngine {
    client: Arc<ValidationClient>,
    discovery: FileDiscovery,
    config: EngineConfig,
}

impl ValidationEngine {
    /// Create a new validation engine
    pub fn new(client: ValidationClient, config: EngineConfig) -> Self {
        let discovery = FileDiscovery::new(config.template_suffix.clone());
        Self {
            client: Arc::new(client),
            discovery,
            config,
        }
    }

    /// Build an engine from loaded configuration, compiling its rules once
    pub fn from_config(config: &Config, checker: Arc<dyn HtmlChecker>) -> Result<Self> {
        let suppression = SuppressionRules::compile(&config.rule_spec())?;
        let wrapping = WrappingRules::compile(&config.rules.wrapping)?;
        let client = ValidationClient::new(
            checker,
            Arc::new(suppression),
            Arc::new(wrapping),
            config.client_config(),
        );

        Ok(Self::new(
            client,
            EngineConfig {
                concurrency: config.validation.concurrency,
                template_suffix: config.files.template_suffix.clone(),
                report_path: config.report_path().map(PathBuf::from),
            },
        ))
    }

    /// Validate everything `patterns` expands to
    pub async fn run(&self, patterns: &[String]) -> Result<ValidationResults> {
        self.run_with_progress(patterns, None).await
    }

    /// Validate everything `patterns` expands to, reporting each finished file
    pub async fn run_with_progress(
        &self,
        patterns: &[String],
        progress_callback: Option<ProgressCallback>,
    ) -> Result<ValidationResults> {
        let started_at = Utc::now();

        if let Some(report_path) = &self.config.report_path {
            remove_stale_report(report_path).await?;
        }

        let discovery = self.discovery.discover(patterns).await?;
        let stats = discovery.stats();
        info!(
            "Found {} files ({} templates, {} missing)",
            stats.files_found, stats.templates, stats.missing
        );

        if discovery.tasks.is_empty() {
            warn!("No source files were found");
            return Ok(ValidationResults::new(started_at, Vec::new()));
        }

        let tasks = self
            .schedule_with_progress(discovery.tasks, progress_callback)
            .await?;
        let results = ValidationResults::new(started_at, tasks);

        if let Some(report_path) = &self.config.report_path {
            results.report().write(report_path).await?;
        }

        Ok(results)
    }

    /// Validate `tasks` with bounded concurrency; results keep the input order
    pub async fn schedule(&self, tasks: Vec<FileTask>) -> Result<Vec<FileTask>> {
        self.schedule_with_progress(tasks, None).await
    }

    /// Validate `tasks` with bounded concurrency and per-file progress
    pub async fn schedule_with_progress(
        &self,
        tasks: Vec<FileTask>,
        progress_callback: Option<ProgressCallback>,
    ) -> Result<Vec<FileTask>> {
        if tasks.is_empty() {
            return Ok(Vec::new());
        }

        let total_files = tasks.len();
        let completed = Arc::new(AtomicUsize::new(0));

        // Create a semaphore to limit concurrent validations
        let semaphore = Arc::new(tokio::sync::Semaphore::new(self.config.concurrency.max(1)));

        let workers: Vec<_> = tasks
            .into_iter()
            .map(|task| {
                let client = Arc::clone(&self.client);
                let semaphore = Arc::clone(&semaphore);
                let progress_callback = progress_callback.clone();
                let completed = Arc::clone(&completed);

                tokio::spawn(async move {
                    let _permit = semaphore.acquire().await.map_err(|_| {
                        ValidationError::Concurrency {
                            details: "Failed to acquire validation semaphore".to_string(),
                        }
                    })?;

                    let task = client.validate(task).await;

                    let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                    if let Some(ref callback) = progress_callback {
                        callback(ValidationProgress {
                            task: task.clone(),
                            completed: done,
                            total: total_files,
                        });
                    }

                    Ok::<FileTask, ValidationError>(task)
                })
            })
            .collect();

        let joined = try_join_all(workers)
            .await
            .map_err(|e| ValidationError::Concurrency {
                details: format!("Task join error: {}", e),
            })?;

        joined.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checker::CheckRequest;
    use crate::client::ClientConfig;
    use crate::rules::RuleSpec;
    use crate::task::Diagnostic;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::Duration;
    use tempfile::TempDir;

    /// Reports one error for files whose name contains "bad", tracking peak parallelism
    #[derive(Default)]
    struct CountingChecker {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl HtmlChecker for CountingChecker {
        async fn check(
            &self,
            request: &CheckRequest,
        ) -> std::result::Result<Vec<Diagnostic>, ValidationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(10)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            let name = request.file.file_name().unwrap_or_default().to_string_lossy();
            if name.contains("bad") {
                Ok(vec![Diagnostic::new(1, 1, "Stray end tag “div”.")])
            } else {
                Ok(vec![])
            }
        }
    }

    fn engine(checker: Arc<CountingChecker>, config: EngineConfig) -> ValidationEngine {
        let client = ValidationClient::new(
            checker,
            Arc::new(SuppressionRules::compile(&RuleSpec::default()).unwrap()),
            Arc::new(WrappingRules::default()),
            ClientConfig {
                retry_delay_ms: 0,
                ..Default::default()
            },
        );
        ValidationEngine::new(client, config)
    }

    async fn write_files(dir: &TempDir, names: &[&str]) -> Vec<FileTask> {
        let mut tasks = Vec::new();
        for name in names {
            let path = dir.path().join(name);
            tokio::fs::write(&path, "<!DOCTYPE html><title>t</title>")
                .await
                .unwrap();
            tasks.push(FileTask::new(path, false));
        }
        tasks
    }

    #[tokio::test]
    async fn test_schedule_empty_list() {
        let checker = Arc::new(CountingChecker::default());
        let engine = engine(checker.clone(), EngineConfig::default());

        let results = engine.schedule(Vec::new()).await.unwrap();
        assert!(results.is_empty());
        assert_eq!(checker.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded_and_order_kept() {
        let temp_dir = TempDir::new().unwrap();
        let names = ["a.html", "bad1.html", "c.html", "d.html", "bad2.html", "f.html", "g.html", "h.html"];
        let tasks = write_files(&temp_dir, &names).await;
        let expected: Vec<PathBuf> = tasks.iter().map(|t| t.path.clone()).collect();

        let checker = Arc::new(CountingChecker::default());
        let engine = engine(
            checker.clone(),
            EngineConfig {
                concurrency: 3,
                ..Default::default()
            },
        );

        let results = engine.schedule(tasks).await.unwrap();

        let peak = checker.peak.load(Ordering::SeqCst);
        assert!(peak > 1 && peak <= 3, "peak in flight was {}", peak);
        assert_eq!(
            results.iter().map(|t| t.path.clone()).collect::<Vec<_>>(),
            expected
        );
        assert!(results.iter().all(FileTask::is_complete));
        assert_eq!(results.iter().filter(|t| !t.succeeded()).count(), 2);
    }

    #[tokio::test]
    async fn test_sequential_by_default() {
        let temp_dir = TempDir::new().unwrap();
        let tasks = write_files(&temp_dir, &["a.html", "b.html", "c.html"]).await;

        let checker = Arc::new(CountingChecker::default());
        let engine = engine(checker.clone(), EngineConfig::default());
        engine.schedule(tasks).await.unwrap();

        assert_eq!(checker.peak.load(Ordering::SeqCst), 1);
        assert_eq!(checker.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_progress_reported_per_file() {
        let temp_dir = TempDir::new().unwrap();
        let tasks = write_files(&temp_dir, &["a.html", "bad.html"]).await;

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let callback: ProgressCallback = Arc::new(move |progress: ValidationProgress| {
            sink.lock()
                .unwrap()
                .push((progress.completed, progress.total, progress.task.succeeded()));
        });

        let engine = engine(Arc::new(CountingChecker::default()), EngineConfig::default());
        engine
            .schedule_with_progress(tasks, Some(callback))
            .await
            .unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(*seen, vec![(1, 2, true), (2, 2, false)]);
    }

    #[tokio::test]
    async fn test_run_writes_report_and_clears_stale_one() {
        let temp_dir = TempDir::new().unwrap();
        write_files(&temp_dir, &["a.html", "bad.html"]).await;
        let report_path = temp_dir.path().join("report.json");

        let engine = engine(
            Arc::new(CountingChecker::default()),
            EngineConfig {
                report_path: Some(report_path.clone()),
                ..Default::default()
            },
        );

        let pattern = temp_dir.path().join("*.html").to_string_lossy().into_owned();
        let results = engine.run(&[pattern]).await.unwrap();
        assert!(!results.success());
        assert!(report_path.exists());

        // A run with nothing to do leaves no report behind
        let missing = temp_dir.path().join("nothing-*.html").to_string_lossy().into_owned();
        let results = engine.run(&[missing]).await.unwrap();
        assert!(results.success());
        assert!(!report_path.exists());
    }
}
