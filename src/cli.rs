use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::template::{PLACEHOLDER, WrappingRule};

/// Verbosity levels for output
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum VerbosityLevel {
    /// Only show failing files and the final verdict
    Quiet,
    /// Show failing files with their diagnostics and a summary
    #[default]
    Normal,
    /// Also show passing files
    Verbose,
}

/// HTML5 validation for AngularJS projects
#[derive(Parser, Debug, Clone)]
#[command(name = "html-angular-validate")]
#[command(about = "Validate HTML files and AngularJS templates against an HTML5 conformance checker")]
#[command(version)]
pub struct Cli {
    /// Files, directories or glob patterns to validate; prefix with '!' to exclude
    #[arg(help = "Files, directories or glob patterns (e.g. 'app/**/*.html', '!app/vendor/**')")]
    pub patterns: Vec<String>,

    /// Configuration file (TOML or JSON)
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// File name suffix that marks template fragments
    #[arg(long = "template-suffix")]
    pub template_suffix: Option<String>,

    /// Do not allow ng-*/ui-* elements and attributes by default
    #[arg(long = "no-angular")]
    pub no_angular: bool,

    /// Custom element pattern to allow ('*' is a wildcard)
    #[arg(long = "custom-tag", action = clap::ArgAction::Append)]
    pub custom_tags: Vec<String>,

    /// Custom attribute pattern to allow ('*' is a wildcard)
    #[arg(long = "custom-attr", action = clap::ArgAction::Append)]
    pub custom_attrs: Vec<String>,

    /// Checker message substring to ignore
    #[arg(long = "relax", action = clap::ArgAction::Append)]
    pub relax_errors: Vec<String>,

    /// Wrapping rule for templates, TAG=TEMPLATE with {0} marking the fragment
    #[arg(long = "wrap", value_parser = parse_wrapping, action = clap::ArgAction::Append)]
    pub wrapping: Vec<WrappingRule>,

    /// Doctype passed to the checker
    #[arg(long = "doctype")]
    pub doctype: Option<String>,

    /// Charset passed to the checker
    #[arg(long = "charset")]
    pub charset: Option<String>,

    /// Where to write the JSON report
    #[arg(long = "report", conflicts_with = "no_report")]
    pub report: Option<PathBuf>,

    /// Do not write a JSON report
    #[arg(long = "no-report")]
    pub no_report: bool,

    /// Conformance checker endpoint
    #[arg(long = "checker-url")]
    pub checker_url: Option<String>,

    /// Proxy for checker requests
    #[arg(long = "proxy")]
    pub proxy: Option<String>,

    /// Number of files validated concurrently
    #[arg(short = 'j', long = "concurrency")]
    pub concurrency: Option<usize>,

    /// Checker request timeout in seconds
    #[arg(long = "timeout")]
    pub timeout: Option<u64>,

    /// Checker calls allowed per file before it is marked unvalidated
    #[arg(long = "max-attempts")]
    pub max_attempts: Option<u32>,

    /// Enable verbose output
    #[arg(short = 'v', long = "verbose", help = "Enable verbose output")]
    pub verbose: bool,

    /// Enable quiet mode (failures only)
    #[arg(
        short = 'q',
        long = "quiet",
        help = "Quiet mode",
        conflicts_with = "verbose"
    )]
    pub quiet: bool,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

/// Parse a `TAG=TEMPLATE` wrapping rule
pub fn parse_wrapping(value: &str) -> Result<WrappingRule, String> {
    let (tag, template) = value
        .split_once('=')
        .ok_or_else(|| format!("expected TAG=TEMPLATE, got '{}'", value))?;
    let tag = tag.trim();
    if tag.is_empty() {
        return Err(format!("missing tag in wrapping rule '{}'", value));
    }
    if !template.contains(PLACEHOLDER) {
        return Err(format!(
            "wrapping template '{}' has no {} placeholder",
            template, PLACEHOLDER
        ));
    }
    Ok(WrappingRule::new(tag, template))
}
