use crate::checker::{DEFAULT_CHECKER_URL, NuCheckerConfig};
use crate::cli::{Cli, VerbosityLevel};
use crate::client::{ClientConfig, DEFAULT_MAX_ATTEMPTS};
use crate::rules::RuleSpec;
use crate::template::{PLACEHOLDER, WrappingRule};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Trait for abstracting environment variable access
pub trait EnvProvider {
    fn get(&self, key: &str) -> Option<String>;
}

/// System environment variable provider for production use
pub struct SystemEnvProvider;

impl EnvProvider for SystemEnvProvider {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlParsing(#[from] toml::de::Error),

    #[error("JSON parsing error: {0}")]
    JsonParsing(#[from] serde_json::Error),

    #[error("Configuration validation error: {0}")]
    Validation(String),

    #[error("Environment variable error: {0}")]
    Environment(String),

    #[error("Unsupported configuration file format: {0}")]
    UnsupportedFormat(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

const ENV_PREFIX: &str = "HTML_ANGULAR_VALIDATE_";

pub const DEFAULT_TEMPLATE_SUFFIX: &str = "tmpl.html";
pub const DEFAULT_REPORT_PATH: &str = "html-angular-validate-report.json";

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub files: FileConfig,
    pub rules: RulesConfig,
    pub checker: CheckerConfig,
    pub validation: ValidationConfig,
    pub output: OutputConfig,
}

/// Which files to validate
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FileConfig {
    /// Files, directories or glob patterns; `!` prefix excludes
    pub patterns: Vec<String>,
    /// Suffix marking a file as a template fragment
    pub template_suffix: String,
}

/// Suppression and wrapping rules
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RulesConfig {
    /// Allow AngularJS `ng-*`/`ui-*` elements and attributes
    pub angular: bool,
    pub custom_tags: Vec<String>,
    pub custom_attrs: Vec<String>,
    pub relax_errors: Vec<String>,
    /// Template wrapping rules, first match wins
    pub wrapping: Vec<WrappingRule>,
}

/// Conformance checker connection settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CheckerConfig {
    pub url: String,
    pub doctype: String,
    pub charset: String,
    pub proxy: Option<String>,
    /// Request timeout in seconds
    pub timeout_seconds: u64,
    /// Checker calls allowed per file
    pub max_attempts: u32,
    /// Initial retry delay in milliseconds
    pub retry_delay_ms: u64,
}

/// Scheduling configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ValidationConfig {
    /// Files validated concurrently
    pub concurrency: usize,
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OutputConfig {
    /// JSON report location; empty disables the report
    pub report_path: Option<PathBuf>,
    /// Verbose output
    pub verbose: bool,
    /// Quiet mode (failures only)
    pub quiet: bool,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            patterns: vec![],
            template_suffix: DEFAULT_TEMPLATE_SUFFIX.to_string(),
        }
    }
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            angular: true,
            custom_tags: vec![],
            custom_attrs: vec![],
            relax_errors: vec![],
            wrapping: vec![],
        }
    }
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_CHECKER_URL.to_string(),
            doctype: "HTML5".to_string(),
            charset: "utf-8".to_string(),
            proxy: None,
            timeout_seconds: 30,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_delay_ms: 500,
        }
    }
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self { concurrency: 1 }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            report_path: Some(PathBuf::from(DEFAULT_REPORT_PATH)),
            verbose: false,
            quiet: false,
        }
    }
}

impl Config {
    pub fn verbosity(&self) -> VerbosityLevel {
        if self.output.quiet {
            VerbosityLevel::Quiet
        } else if self.output.verbose {
            VerbosityLevel::Verbose
        } else {
            VerbosityLevel::Normal
        }
    }

    /// Report location, or `None` when reporting is disabled
    pub fn report_path(&self) -> Option<&Path> {
        self.output
            .report_path
            .as_deref()
            .filter(|p| !p.as_os_str().is_empty())
    }

    pub fn rule_spec(&self) -> RuleSpec {
        RuleSpec {
            angular: self.rules.angular,
            custom_tags: self.rules.custom_tags.clone(),
            custom_attrs: self.rules.custom_attrs.clone(),
            relax_errors: self.rules.relax_errors.clone(),
        }
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            doctype: self.checker.doctype.clone(),
            charset: self.checker.charset.clone(),
            proxy: self.checker.proxy.clone(),
            max_attempts: self.checker.max_attempts,
            retry_delay_ms: self.checker.retry_delay_ms,
            ..ClientConfig::default()
        }
    }

    pub fn checker_config(&self) -> NuCheckerConfig {
        NuCheckerConfig {
            url: self.checker.url.clone(),
            timeout_seconds: self.checker.timeout_seconds,
            ..NuCheckerConfig::default()
        }
    }
}

/// Configuration manager for loading and merging configurations
pub struct ConfigManager;

impl ConfigManager {
    /// Load configuration with precedence: file -> environment -> CLI
    pub async fn load_config(cli: &Cli) -> Result<Config> {
        Self::load_config_with(cli, &SystemEnvProvider).await
    }

    /// Load configuration reading environment overrides from `env`
    pub async fn load_config_with(cli: &Cli, env: &impl EnvProvider) -> Result<Config> {
        let mut config = Config::default();

        if let Some(config_path) = &cli.config {
            let file_config = Self::load_from_file(config_path).await?;
            config = Self::merge_configs(config, file_config);
        } else if let Some(found_config) = Self::find_config_file().await? {
            config = Self::merge_configs(config, found_config);
        }

        config = Self::apply_environment_overrides_with(env, config)?;

        // CLI arguments have the highest precedence
        config = Self::merge_with_cli(config, cli);

        Self::validate_config(&config)?;

        Ok(config)
    }

    /// Load configuration from a file (TOML or JSON)
    pub async fn load_from_file(path: &Path) -> Result<Config> {
        let content = tokio::fs::read_to_string(path).await?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => {
                let config: Config = toml::from_str(&content)?;
                Ok(config)
            }
            Some("json") => {
                let config: Config = serde_json::from_str(&content)?;
                Ok(config)
            }
            Some(ext) => Err(ConfigError::UnsupportedFormat(ext.to_string())),
            None => {
                // Try to parse as TOML first, then JSON
                if let Ok(config) = toml::from_str::<Config>(&content) {
                    Ok(config)
                } else {
                    let config: Config = serde_json::from_str(&content)?;
                    Ok(config)
                }
            }
        }
    }

    /// Find configuration file in standard locations
    pub async fn find_config_file() -> Result<Option<Config>> {
        let config_names = [
            "html-angular-validate.toml",
            "html-angular-validate.json",
            ".html-angular-validate.toml",
            ".html-angular-validate.json",
        ];

        for name in &config_names {
            let path = PathBuf::from(name);
            if path.exists() {
                return Ok(Some(Self::load_from_file(&path).await?));
            }
        }

        if let Some(config_dir) = dirs::config_dir() {
            let app_config_dir = config_dir.join("html-angular-validate");
            for name in &config_names {
                let path = app_config_dir.join(name);
                if path.exists() {
                    return Ok(Some(Self::load_from_file(&path).await?));
                }
            }
        }

        Ok(None)
    }

    /// Apply environment variable overrides using the system environment
    pub fn apply_environment_overrides(config: Config) -> Result<Config> {
        Self::apply_environment_overrides_with(&SystemEnvProvider, config)
    }

    /// Apply environment variable overrides with a custom environment provider
    pub fn apply_environment_overrides_with(
        env: &impl EnvProvider,
        mut config: Config,
    ) -> Result<Config> {
        let var = |name: &str| env.get(&format!("{}{}", ENV_PREFIX, name));

        // File settings
        if let Some(suffix) = var("TEMPLATE_SUFFIX") {
            config.files.template_suffix = suffix;
        }

        // Rule settings
        if let Some(angular) = var("ANGULAR") {
            config.rules.angular = parse_env("ANGULAR", &angular)?;
        }
        if let Some(tags) = var("CUSTOM_TAGS") {
            config.rules.custom_tags = split_list(&tags);
        }
        if let Some(attrs) = var("CUSTOM_ATTRS") {
            config.rules.custom_attrs = split_list(&attrs);
        }

        // Checker settings
        if let Some(url) = var("CHECKER_URL") {
            config.checker.url = url;
        }
        if let Some(doctype) = var("DOCTYPE") {
            config.checker.doctype = doctype;
        }
        if let Some(charset) = var("CHARSET") {
            config.checker.charset = charset;
        }
        if let Some(proxy) = var("PROXY") {
            config.checker.proxy = Some(proxy).filter(|p| !p.is_empty());
        }
        if let Some(timeout) = var("TIMEOUT") {
            config.checker.timeout_seconds = parse_env("TIMEOUT", &timeout)?;
        }
        if let Some(max_attempts) = var("MAX_ATTEMPTS") {
            config.checker.max_attempts = parse_env("MAX_ATTEMPTS", &max_attempts)?;
        }

        // Validation settings
        if let Some(concurrency) = var("CONCURRENCY") {
            config.validation.concurrency = parse_env("CONCURRENCY", &concurrency)?;
        }

        // Output settings
        if let Some(report_path) = var("REPORT_PATH") {
            config.output.report_path = Some(PathBuf::from(report_path));
        }
        if let Some(verbose) = var("VERBOSE") {
            config.output.verbose = parse_env("VERBOSE", &verbose)?;
        }
        if let Some(quiet) = var("QUIET") {
            config.output.quiet = parse_env("QUIET", &quiet)?;
        }

        Ok(config)
    }

    /// Merge CLI arguments with configuration (CLI takes precedence)
    pub fn merge_with_cli(mut config: Config, cli: &Cli) -> Config {
        // File settings
        if !cli.patterns.is_empty() {
            config.files.patterns = cli.patterns.clone();
        }
        if let Some(suffix) = &cli.template_suffix {
            config.files.template_suffix = suffix.clone();
        }

        // Rule settings: command-line rules add to configured ones
        if cli.no_angular {
            config.rules.angular = false;
        }
        config.rules.custom_tags.extend(cli.custom_tags.iter().cloned());
        config.rules.custom_attrs.extend(cli.custom_attrs.iter().cloned());
        config.rules.relax_errors.extend(cli.relax_errors.iter().cloned());
        config.rules.wrapping.extend(cli.wrapping.iter().cloned());

        // Checker settings
        if let Some(url) = &cli.checker_url {
            config.checker.url = url.clone();
        }
        if let Some(doctype) = &cli.doctype {
            config.checker.doctype = doctype.clone();
        }
        if let Some(charset) = &cli.charset {
            config.checker.charset = charset.clone();
        }
        if cli.proxy.is_some() {
            config.checker.proxy = cli.proxy.clone();
        }
        if let Some(timeout) = cli.timeout {
            config.checker.timeout_seconds = timeout;
        }
        if let Some(max_attempts) = cli.max_attempts {
            config.checker.max_attempts = max_attempts;
        }

        // Validation settings
        if let Some(concurrency) = cli.concurrency {
            config.validation.concurrency = concurrency;
        }

        // Output settings
        if cli.no_report {
            config.output.report_path = None;
        } else if cli.report.is_some() {
            config.output.report_path = cli.report.clone();
        }
        if cli.verbose {
            config.output.verbose = true;
            config.output.quiet = false;
        }
        if cli.quiet {
            config.output.quiet = true;
            config.output.verbose = false;
        }

        config
    }

    /// Merge two configurations (second takes precedence, empty lists keep the base)
    pub fn merge_configs(mut base: Config, override_config: Config) -> Config {
        // File settings
        if !override_config.files.patterns.is_empty() {
            base.files.patterns = override_config.files.patterns;
        }
        base.files.template_suffix = override_config.files.template_suffix;

        // Rule settings
        base.rules.angular = override_config.rules.angular;
        if !override_config.rules.custom_tags.is_empty() {
            base.rules.custom_tags = override_config.rules.custom_tags;
        }
        if !override_config.rules.custom_attrs.is_empty() {
            base.rules.custom_attrs = override_config.rules.custom_attrs;
        }
        if !override_config.rules.relax_errors.is_empty() {
            base.rules.relax_errors = override_config.rules.relax_errors;
        }
        if !override_config.rules.wrapping.is_empty() {
            base.rules.wrapping = override_config.rules.wrapping;
        }

        // Checker settings
        base.checker.url = override_config.checker.url;
        base.checker.doctype = override_config.checker.doctype;
        base.checker.charset = override_config.checker.charset;
        if override_config.checker.proxy.is_some() {
            base.checker.proxy = override_config.checker.proxy;
        }
        base.checker.timeout_seconds = override_config.checker.timeout_seconds;
        base.checker.max_attempts = override_config.checker.max_attempts;
        base.checker.retry_delay_ms = override_config.checker.retry_delay_ms;

        // Validation settings
        base.validation.concurrency = override_config.validation.concurrency;

        // Output settings
        base.output.report_path = override_config.output.report_path;
        base.output.verbose = override_config.output.verbose;
        base.output.quiet = override_config.output.quiet;

        base
    }

    /// Validate configuration values
    pub fn validate_config(config: &Config) -> Result<()> {
        if config.validation.concurrency == 0 {
            return Err(ConfigError::Validation(
                "Concurrency must be greater than 0".to_string(),
            ));
        }
        if config.validation.concurrency > 1000 {
            return Err(ConfigError::Validation(
                "Concurrency cannot exceed 1000".to_string(),
            ));
        }

        if config.checker.timeout_seconds == 0 {
            return Err(ConfigError::Validation(
                "Timeout must be greater than 0".to_string(),
            ));
        }
        if config.checker.max_attempts == 0 {
            return Err(ConfigError::Validation(
                "Max attempts must be at least 1".to_string(),
            ));
        }
        if config.checker.max_attempts > 10 {
            return Err(ConfigError::Validation(
                "Max attempts cannot exceed 10".to_string(),
            ));
        }
        if config.checker.url.trim().is_empty() {
            return Err(ConfigError::Validation(
                "Checker URL must not be empty".to_string(),
            ));
        }
        if config.checker.doctype.trim().is_empty() {
            return Err(ConfigError::Validation(
                "Doctype must not be empty".to_string(),
            ));
        }
        if config.checker.charset.trim().is_empty() {
            return Err(ConfigError::Validation(
                "Charset must not be empty".to_string(),
            ));
        }

        if let Some(proxy) = &config.checker.proxy {
            reqwest::Proxy::all(proxy.as_str()).map_err(|e| {
                ConfigError::Validation(format!("Invalid proxy '{}': {}", proxy, e))
            })?;
        }

        if config.files.template_suffix.is_empty() {
            return Err(ConfigError::Validation(
                "Template suffix must not be empty".to_string(),
            ));
        }

        for rule in &config.rules.wrapping {
            if rule.tag.trim().is_empty() {
                return Err(ConfigError::Validation(
                    "Wrapping rule has an empty tag".to_string(),
                ));
            }
            if !rule.template.contains(PLACEHOLDER) {
                return Err(ConfigError::Validation(format!(
                    "Wrapping template for '{}' has no {} placeholder",
                    rule.tag, PLACEHOLDER
                )));
            }
        }

        if config.output.verbose && config.output.quiet {
            return Err(ConfigError::Validation(
                "Cannot enable both verbose and quiet modes".to_string(),
            ));
        }

        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value.trim().parse().map_err(|_| {
        ConfigError::Environment(format!("Invalid {}{} value: {}", ENV_PREFIX, name, value))
    })
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
