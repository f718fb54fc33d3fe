//! Diagnostic suppression rules
//!
//! Three independent rule classes decide whether a checker message is
//! expected and should not count against a file:
//! - relaxed substrings, matched verbatim
//! - custom element patterns, matched against
//!   `Element “<tag>” not allowed as child ...`
//! - custom attribute patterns, matched against
//!   `Attribute “<attr>” not allowed on element ... at this point.`
//!
//! Patterns are literal except for `*`, which matches any sequence.

use regex::{Regex, RegexSet};

use crate::error::{Result, ValidationError};
use crate::task::Diagnostic;

/// Checker notices that never indicate a conformance problem
pub const DEFAULT_RELAXED: &[&str] = &[
    "The Content-Type was",
    "The character encoding was not declared",
    "Using the schema for HTML with",
];

/// Element patterns allowed in AngularJS mode
pub const ANGULAR_TAGS: &[&str] = &["ng-*", "ui-*"];

/// Attribute patterns allowed in AngularJS mode
pub const ANGULAR_ATTRS: &[&str] = &["ng-*", "ui-*", "on"];

/// Uncompiled rule lists, as they appear in configuration
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleSpec {
    pub angular: bool,
    pub custom_tags: Vec<String>,
    pub custom_attrs: Vec<String>,
    pub relax_errors: Vec<String>,
}

/// Compiled, immutable suppression rules, shared read-only between validations
#[derive(Debug, Clone)]
pub struct SuppressionRules {
    relaxed: Vec<String>,
    tags: RegexSet,
    attrs: RegexSet,
}

impl SuppressionRules {
    /// Compile a rule spec, adding the AngularJS and default relaxed entries
    pub fn compile(spec: &RuleSpec) -> Result<Self> {
        let mut tag_patterns: Vec<&str> = spec.custom_tags.iter().map(String::as_str).collect();
        let mut attr_patterns: Vec<&str> = spec.custom_attrs.iter().map(String::as_str).collect();
        if spec.angular {
            tag_patterns.extend_from_slice(ANGULAR_TAGS);
            attr_patterns.extend_from_slice(ANGULAR_ATTRS);
        }

        let mut relaxed: Vec<String> = spec
            .relax_errors
            .iter()
            .filter(|s| !s.is_empty())
            .cloned()
            .collect();
        relaxed.extend(DEFAULT_RELAXED.iter().map(|s| s.to_string()));

        let tags = build_set(&tag_patterns, tag_regex)?;
        let attrs = build_set(&attr_patterns, attr_regex)?;

        Ok(Self {
            relaxed,
            tags,
            attrs,
        })
    }

    pub fn is_suppressed(&self, message: &str) -> bool {
        self.matches_relaxed(message)
            || self.matches_custom_tag(message)
            || self.matches_custom_attr(message)
    }

    pub fn matches_relaxed(&self, message: &str) -> bool {
        self.relaxed.iter().any(|s| message.contains(s.as_str()))
    }

    pub fn matches_custom_tag(&self, message: &str) -> bool {
        self.tags.is_match(message)
    }

    pub fn matches_custom_attr(&self, message: &str) -> bool {
        self.attrs.is_match(message)
    }

    /// Drop every suppressed diagnostic, keeping the rest in order
    pub fn filter(&self, diagnostics: Vec<Diagnostic>) -> Vec<Diagnostic> {
        diagnostics
            .into_iter()
            .filter(|d| !self.is_suppressed(&d.message))
            .collect()
    }
}

/// Translate a user pattern into a regex fragment: `*` becomes `.*`, everything else is literal
pub fn wildcard_to_regex(pattern: &str) -> String {
    pattern
        .split('*')
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(".*")
}

fn tag_regex(pattern: &str) -> String {
    format!(
        r#"^Element [“"]?(?:{})[”"]? not allowed as child "#,
        wildcard_to_regex(pattern)
    )
}

fn attr_regex(pattern: &str) -> String {
    format!(
        r#"^Attribute [“"]?(?:{})[”"]? not allowed on element .* at this point\."#,
        wildcard_to_regex(pattern)
    )
}

fn build_set(patterns: &[&str], to_regex: fn(&str) -> String) -> Result<RegexSet> {
    let sources: Vec<String> = patterns.iter().map(|p| to_regex(p)).collect();

    // Compile individually first so a failure names the offending pattern
    for (pattern, source) in patterns.iter().zip(&sources) {
        Regex::new(source).map_err(|e| ValidationError::Pattern {
            pattern: pattern.to_string(),
            details: e.to_string(),
        })?;
    }

    RegexSet::new(&sources).map_err(|e| ValidationError::Pattern {
        pattern: patterns.join(", "),
        details: e.to_string(),
    })
}
