use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;

use html_angular_validate::{CheckRequest, Diagnostic, HtmlChecker, ValidationError};

type Responder = Box<dyn Fn(&str) -> Vec<Diagnostic> + Send + Sync>;

/// A request as the mock checker received it
#[derive(Clone, Debug)]
pub struct RecordedRequest {
    pub file: PathBuf,
    pub content: String,
    pub doctype: String,
    pub charset: String,
    pub proxy: Option<String>,
}

/// In-process stand-in for the conformance checker.
///
/// Answers are computed from the submitted document by a responder. A mock
/// can be made flaky (the first `n` calls for each distinct document fail) or
/// unavailable (every call fails). Every request is recorded together with
/// the document content at the time of the call, and the peak number of
/// concurrent calls is tracked.
pub struct MockChecker {
    responder: Responder,
    failures_per_document: Option<usize>,
    delay: Duration,
    requests: Mutex<Vec<RecordedRequest>>,
    calls_per_document: Mutex<HashMap<String, usize>>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl MockChecker {
    pub fn scripted<F>(responder: F) -> Self
    where
        F: Fn(&str) -> Vec<Diagnostic> + Send + Sync + 'static,
    {
        Self {
            responder: Box::new(responder),
            failures_per_document: None,
            delay: Duration::ZERO,
            requests: Mutex::new(Vec::new()),
            calls_per_document: Mutex::new(HashMap::new()),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
        }
    }

    /// Behaves like the Nu checker for the markup used in these tests
    pub fn nu_like() -> Self {
        Self::scripted(nu_like_diagnostics)
    }

    /// Always reports a clean document
    pub fn clean() -> Self {
        Self::scripted(|_| Vec::new())
    }

    /// Never produces a diagnostic list
    pub fn unavailable() -> Self {
        Self::clean().failing_first(usize::MAX)
    }

    /// Fail the first `failures` calls for every distinct document
    pub fn failing_first(mut self, failures: usize) -> Self {
        self.failures_per_document = Some(failures);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HtmlChecker for MockChecker {
    async fn check(&self, request: &CheckRequest) -> Result<Vec<Diagnostic>, ValidationError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);

        let content = tokio::fs::read_to_string(&request.file)
            .await
            .unwrap_or_default();
        self.requests.lock().unwrap().push(RecordedRequest {
            file: request.file.clone(),
            content: content.clone(),
            doctype: request.doctype.clone(),
            charset: request.charset.clone(),
            proxy: request.proxy.clone(),
        });

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let call = {
            let mut calls = self.calls_per_document.lock().unwrap();
            let count = calls.entry(content.clone()).or_insert(0);
            *count += 1;
            *count
        };
        if let Some(failures) = self.failures_per_document
            && call <= failures
        {
            return Err(ValidationError::CheckerResponse {
                details: "response had no messages".to_string(),
            });
        }

        Ok((self.responder)(&content))
    }
}

/// Approximates the Nu checker's complaints about the markup used in the fixtures:
/// table parts outside a table, unknown elements and attributes, bare ampersands.
/// Always adds the schema notice the checker emits for every HTML5 document.
pub fn nu_like_diagnostics(document: &str) -> Vec<Diagnostic> {
    let tag_re = Regex::new(r"<(/?)([a-zA-Z][\w-]*)([^>]*)>").unwrap();
    let quoted_re = Regex::new(r#""[^"]*"|'[^']*'"#).unwrap();
    let attr_re = Regex::new(r"(?:^|\s)([a-zA-Z][\w:-]*)").unwrap();
    let amp_re = Regex::new(r"&(?:[^#a-zA-Z]|$)").unwrap();

    let mut diagnostics = vec![Diagnostic::new(
        1,
        1,
        "Using the schema for HTML with SVG 1.1, MathML 3.0, RDFa Lite 1.1, and ITS 2.0 support.",
    )];
    let mut in_table = false;
    let mut parent = "body".to_string();

    for (index, line) in document.lines().enumerate() {
        let line_no = index as u32 + 1;

        for caps in tag_re.captures_iter(line) {
            let column = caps.get(0).map(|m| m.start() as u32 + 1).unwrap_or(1);
            let closing = &caps[1] == "/";
            let tag = caps[2].to_lowercase();

            if tag == "table" {
                in_table = !closing;
                continue;
            }
            if matches!(tag.as_str(), "tr" | "td") && !in_table {
                let kind = if closing { "end" } else { "start" };
                diagnostics.push(Diagnostic::new(
                    line_no,
                    column,
                    format!("Stray {} tag “{}”.", kind, tag),
                ));
                continue;
            }
            if closing {
                continue;
            }

            if tag.contains('-') {
                diagnostics.push(Diagnostic::new(
                    line_no,
                    column,
                    format!(
                        "Element “{}” not allowed as child of element “{}” in this context. \
                         (Suppressing further errors from this subtree.)",
                        tag, parent
                    ),
                ));
            }

            let attrs = quoted_re.replace_all(&caps[3], "");
            for attr in attr_re.captures_iter(&attrs) {
                let name = attr[1].to_lowercase();
                let known = name.starts_with("data-") || name.starts_with("aria-");
                if (name.contains('-') && !known) || name == "on" {
                    diagnostics.push(Diagnostic::new(
                        line_no,
                        column,
                        format!(
                            "Attribute “{}” not allowed on element “{}” at this point.",
                            name, tag
                        ),
                    ));
                }
            }
            parent = tag;
        }

        if amp_re.is_match(line) {
            diagnostics.push(Diagnostic::new(
                line_no,
                1,
                "“&” did not start a character reference. (“&” probably should have been escaped as “&amp;”.)",
            ));
        }
    }

    diagnostics
}
