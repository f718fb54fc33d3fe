//! # html-angular-validate Library
//!
//! Validates HTML documents and AngularJS template fragments against an HTML5
//! conformance checker. Template fragments are wrapped into full documents,
//! checker diagnostics that AngularJS markup legitimately triggers are
//! filtered out, and files are checked concurrently with bounded retry.

pub mod checker;
pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod file_discovery;
pub mod output;
pub mod report;
pub mod rules;
pub mod task;
pub mod template;
pub mod validator;

pub use checker::{
    CheckRequest, DEFAULT_CHECKER_URL, HtmlChecker, NuCheckerConfig, NuHtmlChecker, OutputShape,
};
pub use cli::{Cli, VerbosityLevel};
pub use client::{ClientConfig, ValidationClient};
pub use config::{Config, ConfigError, ConfigManager, EnvProvider, SystemEnvProvider};
pub use error::ValidationError;
pub use file_discovery::{Discovery, DiscoveryStats, FileDiscovery};
pub use output::Output;
pub use report::{FailedFile, ReportedError, ValidationReport, ValidationResults};
pub use rules::{RuleSpec, SuppressionRules};
pub use task::{Diagnostic, FileTask, UNABLE_TO_VALIDATE, has_suffix};
pub use template::{WrappingRule, WrappingRules};
pub use validator::{EngineConfig, ProgressCallback, ValidationEngine, ValidationProgress};
