use std::path::PathBuf;

use thiserror::Error;

/// Main application error type that encompasses all possible failure modes
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP status error: {status} for {url} - {message}")]
    HttpStatus {
        url: String,
        status: u16,
        message: String,
    },

    #[error("Request timeout: {url} after {timeout_seconds} seconds")]
    Timeout { url: String, timeout_seconds: u64 },

    #[error("Checker returned an unusable response: {details}")]
    CheckerResponse { details: String },

    #[error("Invalid pattern '{pattern}': {details}")]
    Pattern { pattern: String, details: String },

    #[error("Template staging failed: {file} - {details}")]
    TemplateStaging { file: PathBuf, details: String },

    #[error("Report error: {path} - {details}")]
    Report { path: PathBuf, details: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Concurrent operation error: {details}")]
    Concurrency { details: String },
}

impl ValidationError {
    /// Whether a checker call that failed this way may succeed if repeated
    pub fn is_transient(&self) -> bool {
        match self {
            // Builder errors come from local settings such as a bad proxy URL
            ValidationError::Http(e) => !e.is_builder(),
            ValidationError::HttpStatus { status, .. } => *status >= 500 || *status == 429,
            ValidationError::Timeout { .. }
            | ValidationError::CheckerResponse { .. }
            | ValidationError::Io(_) => true,
            _ => false,
        }
    }
}

impl From<crate::config::ConfigError> for ValidationError {
    fn from(err: crate::config::ConfigError) -> Self {
        ValidationError::Config(err.to_string())
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, ValidationError>;
