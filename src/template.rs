//! Template fragment wrapping
//!
//! The checker only accepts complete documents, so a template fragment is
//! placed inside a fixed HTML5 skeleton before it is submitted. Fragments
//! whose root element is not valid directly under `<body>` (a `<tr>`, say) can
//! be wrapped first by a rule such as `tr -> <table>{0}</table>`.

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ValidationError};
use crate::rules::wildcard_to_regex;
use crate::task::Diagnostic;

/// Substitution point in a wrapping template
pub const PLACEHOLDER: &str = "{0}";

const SKELETON_HEAD: &str = "<!DOCTYPE html>\n<html>\n<head><title>Dummy</title></head>\n<body>\n";
const SKELETON_TAIL: &str = "\n</body>\n</html>";

/// Lines the skeleton places before the fragment's first line
pub const SKELETON_LINE_OFFSET: u32 = 4;

/// A configured wrapping rule: fragments opening with `tag` are substituted into `template`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WrappingRule {
    pub tag: String,
    pub template: String,
}

impl WrappingRule {
    pub fn new(tag: impl Into<String>, template: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            template: template.into(),
        }
    }
}

#[derive(Debug, Clone)]
struct CompiledRule {
    opening_tag: Regex,
    template: String,
}

/// Ordered, compiled wrapping rules; the first match wins
#[derive(Debug, Clone, Default)]
pub struct WrappingRules {
    rules: Vec<CompiledRule>,
}

impl WrappingRules {
    pub fn compile(rules: &[WrappingRule]) -> Result<Self> {
        let rules = rules
            .iter()
            .map(|rule| {
                let source = format!(r"^<(?:{})(?:[\s/][^>]*)?>", wildcard_to_regex(&rule.tag));
                let opening_tag = Regex::new(&source).map_err(|e| ValidationError::Pattern {
                    pattern: rule.tag.clone(),
                    details: e.to_string(),
                })?;
                Ok(CompiledRule {
                    opening_tag,
                    template: rule.template.clone(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { rules })
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Apply the first matching rule to an already trimmed fragment
    fn apply(&self, fragment: &str) -> String {
        self.rules
            .iter()
            .find(|rule| rule.opening_tag.is_match(fragment))
            .map(|rule| rule.template.replacen(PLACEHOLDER, fragment, 1))
            .unwrap_or_else(|| fragment.to_string())
    }

    /// Turn a fragment into a complete document for the checker
    pub fn wrap(&self, fragment: &str) -> String {
        let content = self.apply(fragment.trim());
        let mut document =
            String::with_capacity(SKELETON_HEAD.len() + content.len() + SKELETON_TAIL.len());
        document.push_str(SKELETON_HEAD);
        document.push_str(&content);
        document.push_str(SKELETON_TAIL);
        document
    }
}

/// Shift a diagnostic reported against a wrapped document back onto the fragment
pub fn relocate(mut diagnostic: Diagnostic) -> Diagnostic {
    diagnostic.line = diagnostic.line.saturating_sub(SKELETON_LINE_OFFSET);
    diagnostic
}
