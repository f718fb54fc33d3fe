use async_trait::async_trait;
use reqwest::{Client, Proxy, Response, header};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::timeout;

use crate::error::ValidationError;
use crate::task::Diagnostic;

/// Result shape requested from the checker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputShape {
    Json,
}

impl OutputShape {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputShape::Json => "json",
        }
    }
}

/// One call against the conformance checker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckRequest {
    /// Document to check; a scratch copy for wrapped templates
    pub file: PathBuf,
    pub output: OutputShape,
    pub doctype: String,
    pub charset: String,
    pub proxy: Option<String>,
}

/// An HTML5 conformance checker.
///
/// `Err` means the checker produced no usable diagnostic list; callers may
/// retry. `Ok` with an empty list means the document conforms.
#[async_trait]
pub trait HtmlChecker: Send + Sync {
    async fn check(&self, request: &CheckRequest) -> Result<Vec<Diagnostic>, ValidationError>;
}

/// Configuration for the Nu HTML Checker client
#[derive(Debug, Clone)]
pub struct NuCheckerConfig {
    /// Checker endpoint
    pub url: String,
    /// Request timeout in seconds
    pub timeout_seconds: u64,
    /// User agent string
    pub user_agent: String,
}

pub const DEFAULT_CHECKER_URL: &str = "https://validator.w3.org/nu/";

impl Default for NuCheckerConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_CHECKER_URL.to_string(),
            timeout_seconds: 30,
            user_agent: format!("html-angular-validate/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

#[derive(Debug, Deserialize)]
struct NuResponse {
    messages: Option<Vec<NuMessage>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NuMessage {
    #[serde(default)]
    last_line: u32,
    #[serde(default)]
    last_column: u32,
    #[serde(default)]
    message: String,
}

impl From<NuMessage> for Diagnostic {
    fn from(message: NuMessage) -> Self {
        Diagnostic::new(message.last_line, message.last_column, message.message)
    }
}

/// Async client for a Nu HTML Checker instance (validator.w3.org/nu or self-hosted)
pub struct NuHtmlChecker {
    client: Client,
    proxied: Mutex<HashMap<String, Client>>,
    config: NuCheckerConfig,
}

impl NuHtmlChecker {
    /// Create a new checker client with the given configuration
    pub fn new(config: NuCheckerConfig) -> Result<Self, ValidationError> {
        let client = Self::build_client(&config, None)?;
        Ok(Self {
            client,
            proxied: Mutex::new(HashMap::new()),
            config,
        })
    }

    fn build_client(config: &NuCheckerConfig, proxy: Option<&str>) -> Result<Client, ValidationError> {
        let mut builder = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(&config.user_agent)
            .pool_idle_timeout(Duration::from_secs(30))
            .pool_max_idle_per_host(10);
        if let Some(address) = proxy {
            let proxy = Proxy::all(address).map_err(|e| {
                ValidationError::Config(format!("Invalid proxy '{}': {}", address, e))
            })?;
            builder = builder.proxy(proxy);
        }
        builder.build().map_err(ValidationError::from)
    }

    /// Client routed through `proxy`, built once per distinct address
    fn client_for(&self, proxy: Option<&str>) -> Result<Client, ValidationError> {
        let Some(proxy) = proxy else {
            return Ok(self.client.clone());
        };

        let mut proxied = self.proxied.lock().map_err(|_| ValidationError::Concurrency {
            details: "proxy client cache poisoned".to_string(),
        })?;
        if let Some(client) = proxied.get(proxy) {
            return Ok(client.clone());
        }
        let client = Self::build_client(&self.config, Some(proxy))?;
        proxied.insert(proxy.to_string(), client.clone());
        Ok(client)
    }

    /// Make a single POST with timeout
    async fn make_request(
        &self,
        client: &Client,
        request: &CheckRequest,
        body: Vec<u8>,
    ) -> Result<Response, ValidationError> {
        // The Nu checker infers the doctype from the document; the parameter
        // is still sent for checkers that honour it.
        let request_future = client
            .post(&self.config.url)
            .query(&[
                ("out", request.output.as_str()),
                ("doctype", request.doctype.as_str()),
            ])
            .header(
                header::CONTENT_TYPE,
                format!("text/html; charset={}", request.charset),
            )
            .body(body)
            .send();

        timeout(
            Duration::from_secs(self.config.timeout_seconds),
            request_future,
        )
        .await
        .map_err(|_| ValidationError::Timeout {
            url: self.config.url.clone(),
            timeout_seconds: self.config.timeout_seconds,
        })?
        .map_err(ValidationError::from)
    }
}

#[async_trait]
impl HtmlChecker for NuHtmlChecker {
    async fn check(&self, request: &CheckRequest) -> Result<Vec<Diagnostic>, ValidationError> {
        let body = tokio::fs::read(&request.file).await?;
        let client = self.client_for(request.proxy.as_deref())?;

        let response = self.make_request(&client, request, body).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ValidationError::HttpStatus {
                url: self.config.url.clone(),
                status: status.as_u16(),
                message: format!(
                    "HTTP {}: {}",
                    status.as_u16(),
                    status.canonical_reason().unwrap_or("Unknown")
                ),
            });
        }

        let text = response.text().await?;
        parse_response(&text)
    }
}

/// Decode a checker JSON body; a body without a message list is unusable
fn parse_response(body: &str) -> Result<Vec<Diagnostic>, ValidationError> {
    let parsed: NuResponse =
        serde_json::from_str(body).map_err(|e| ValidationError::CheckerResponse {
            details: e.to_string(),
        })?;

    parsed
        .messages
        .map(|messages| messages.into_iter().map(Diagnostic::from).collect())
        .ok_or_else(|| ValidationError::CheckerResponse {
            details: "response contained no message list".to_string(),
        })
}
