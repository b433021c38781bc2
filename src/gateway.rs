//! Analysis gateway abstraction and implementations.
//!
//! Defines the [`AnalysisGateway`] trait and concrete implementations:
//! - **[`DisabledGateway`]**: always unavailable; used when `analysis.provider = "disabled"`.
//! - **[`HttpGateway`]**: calls an OpenAI-compatible `/v1/chat/completions`
//!   endpoint (OpenAI or a local Ollama). Images go to the vision model as
//!   base64 data URLs.
//! - **[`ScriptedGateway`]**: canned responses matched on request content,
//!   for tests and offline runs.
//!
//! # Failure model
//!
//! [`AnalysisGateway::try_analyze`] reports failures as typed
//! [`GatewayError`]s. [`AnalysisGateway::analyze`] never fails: it turns an
//! error into a diagnostic string starting with one of [`SOFT_FAILURE_PREFIXES`].
//! Callers check [`is_soft_failure`] before parsing a response.
//!
//! Requests are sent once. There is no retry; a failed file is skipped by
//! the calling stream.

use async_trait::async_trait;
use base64::Engine;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;
use thiserror::Error;

use crate::config::AnalysisConfig;

/// Prefixes of the diagnostic strings [`AnalysisGateway::analyze`] returns
/// instead of analysis text.
pub const SOFT_FAILURE_PREFIXES: &[&str] = &[
    "Text analysis not available",
    "Image analysis not available",
    "Error analyzing content",
    "Error analyzing image",
];

/// True when `text` is a gateway diagnostic rather than analysis output.
pub fn is_soft_failure(text: &str) -> bool {
    let text = text.trim_start();
    SOFT_FAILURE_PREFIXES.iter().any(|p| text.starts_with(p))
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("no analysis provider configured")]
    NotConfigured,

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("analysis API error {status}: {body}")]
    Status { status: u16, body: String },

    #[error("analysis request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("malformed analysis response: {0}")]
    MalformedResponse(String),
}

/// Kind of content submitted for analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Code,
    Documentation,
    Image,
    Logs,
    Text,
}

impl ContentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Code => "code",
            ContentKind::Documentation => "documentation",
            ContentKind::Image => "image",
            ContentKind::Logs => "logs",
            ContentKind::Text => "text",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisContent {
    Text(String),
    ImagePath(PathBuf),
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisRequest {
    pub content: AnalysisContent,
    pub instruction: String,
    pub kind: ContentKind,
}

impl AnalysisRequest {
    pub fn text(content: impl Into<String>, instruction: impl Into<String>, kind: ContentKind) -> Self {
        Self {
            content: AnalysisContent::Text(content.into()),
            instruction: instruction.into(),
            kind,
        }
    }

    pub fn image(path: impl Into<PathBuf>, instruction: impl Into<String>) -> Self {
        Self {
            content: AnalysisContent::ImagePath(path.into()),
            instruction: instruction.into(),
            kind: ContentKind::Image,
        }
    }

    pub fn is_image(&self) -> bool {
        matches!(self.content, AnalysisContent::ImagePath(_))
    }

    /// Text prompt as sent to a text model.
    pub fn prompt(&self) -> String {
        match &self.content {
            AnalysisContent::Text(content) => {
                format!("{}\n\nContent to analyze:\n{}", self.instruction, content)
            }
            AnalysisContent::ImagePath(_) => self.instruction.clone(),
        }
    }

    fn failure_text(&self, err: &GatewayError) -> String {
        match (self.is_image(), err) {
            (true, GatewayError::NotConfigured) => {
                format!("Image analysis not available - {}", err)
            }
            (false, GatewayError::NotConfigured) => {
                format!("Text analysis not available - {}", err)
            }
            (true, _) => format!("Error analyzing image: {}", err),
            (false, _) => format!("Error analyzing content: {}", err),
        }
    }
}

/// The external text/vision analysis capability.
#[async_trait]
pub trait AnalysisGateway: Send + Sync {
    fn name(&self) -> &str;

    fn is_available(&self) -> bool;

    async fn try_analyze(&self, request: &AnalysisRequest) -> Result<String, GatewayError>;

    /// Analyze, reporting failure as a diagnostic string.
    async fn analyze(&self, request: &AnalysisRequest) -> String {
        match self.try_analyze(request).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!("{} analysis failed: {}", request.kind.as_str(), e);
                request.failure_text(&e)
            }
        }
    }
}

/// Instantiate the gateway named by `analysis.provider`.
pub fn create_gateway(config: &AnalysisConfig) -> anyhow::Result<Box<dyn AnalysisGateway>> {
    match config.provider.as_str() {
        "disabled" => Ok(Box::new(DisabledGateway)),
        "openai" | "ollama" => Ok(Box::new(HttpGateway::new(config)?)),
        other => anyhow::bail!("Unknown analysis provider: {}", other),
    }
}

// ============ Disabled Gateway ============

pub struct DisabledGateway;

#[async_trait]
impl AnalysisGateway for DisabledGateway {
    fn name(&self) -> &str {
        "disabled"
    }

    fn is_available(&self) -> bool {
        false
    }

    async fn try_analyze(&self, _request: &AnalysisRequest) -> Result<String, GatewayError> {
        Err(GatewayError::NotConfigured)
    }
}

// ============ HTTP Gateway ============

/// Chat-completions client for OpenAI and Ollama.
///
/// OpenAI requires the API key environment variable named by
/// `analysis.api_key_env`. Ollama defaults to `http://localhost:11434`
/// and needs no key.
pub struct HttpGateway {
    provider: String,
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    model: String,
    vision_model: String,
    max_tokens: u32,
    temperature: f32,
}

impl HttpGateway {
    pub fn new(config: &AnalysisConfig) -> anyhow::Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| anyhow::anyhow!("analysis.model required for {} provider", config.provider))?;

        let (default_url, api_key) = match config.provider.as_str() {
            "openai" => {
                let key = std::env::var(&config.api_key_env).map_err(|_| {
                    anyhow::anyhow!("{} environment variable not set", config.api_key_env)
                })?;
                ("https://api.openai.com", Some(key))
            }
            _ => ("http://localhost:11434", std::env::var(&config.api_key_env).ok()),
        };

        let base = config.url.as_deref().unwrap_or(default_url).trim_end_matches('/');

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            provider: config.provider.clone(),
            client,
            endpoint: format!("{}/v1/chat/completions", base),
            api_key,
            vision_model: config.vision_model.clone().unwrap_or_else(|| model.clone()),
            model,
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        })
    }

    fn request_body(&self, request: &AnalysisRequest) -> Result<Value, GatewayError> {
        let (model, content) = match &request.content {
            AnalysisContent::Text(_) => (&self.model, Value::String(request.prompt())),
            AnalysisContent::ImagePath(path) => {
                let bytes = std::fs::read(path).map_err(|source| GatewayError::Io {
                    path: path.clone(),
                    source,
                })?;
                let data = base64::engine::general_purpose::STANDARD.encode(bytes);
                let url = format!("data:{};base64,{}", image_mime(path), data);
                (
                    &self.vision_model,
                    json!([
                        {"type": "text", "text": request.instruction},
                        {"type": "image_url", "image_url": {"url": url}},
                    ]),
                )
            }
        };

        Ok(json!({
            "model": model,
            "messages": [{"role": "user", "content": content}],
            "max_tokens": self.max_tokens,
            "temperature": self.temperature,
        }))
    }
}

#[async_trait]
impl AnalysisGateway for HttpGateway {
    fn name(&self) -> &str {
        &self.provider
    }

    fn is_available(&self) -> bool {
        true
    }

    async fn try_analyze(&self, request: &AnalysisRequest) -> Result<String, GatewayError> {
        let body = self.request_body(request)?;

        let mut builder = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .json(&body);
        if let Some(key) = &self.api_key {
            builder = builder.header("Authorization", format!("Bearer {}", key));
        }

        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let json: Value = response.json().await?;
        parse_chat_response(&json)
    }
}

/// Extract `choices[0].message.content` from a chat-completions response.
fn parse_chat_response(json: &Value) -> Result<String, GatewayError> {
    json.get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .map(str::to_string)
        .ok_or_else(|| GatewayError::MalformedResponse("missing choices[0].message.content".into()))
}

fn image_mime(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        _ => "image/png",
    }
}

// ============ Scripted Gateway ============

/// Deterministic gateway answering from a rule table.
///
/// Each rule pairs a needle with a response; the first rule whose needle
/// occurs in the request's content, instruction or image path answers.
/// Unmatched requests get the default response. Every request is logged.
pub struct ScriptedGateway {
    rules: Vec<(String, String)>,
    default_response: String,
    available: bool,
    calls: Mutex<Vec<AnalysisRequest>>,
}

impl ScriptedGateway {
    pub fn new(default_response: impl Into<String>) -> Self {
        Self {
            rules: Vec::new(),
            default_response: default_response.into(),
            available: true,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// A gateway that reports itself unavailable and fails every call.
    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::new("")
        }
    }

    pub fn respond_when(mut self, needle: impl Into<String>, response: impl Into<String>) -> Self {
        self.rules.push((needle.into(), response.into()));
        self
    }

    /// Requests received so far, in order.
    pub fn calls(&self) -> Vec<AnalysisRequest> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    fn respond(&self, request: &AnalysisRequest) -> String {
        let subject = match &request.content {
            AnalysisContent::Text(t) => t.clone(),
            AnalysisContent::ImagePath(p) => p.display().to_string(),
        };
        self.rules
            .iter()
            .find(|(needle, _)| subject.contains(needle) || request.instruction.contains(needle))
            .map(|(_, response)| response.clone())
            .unwrap_or_else(|| self.default_response.clone())
    }
}

#[async_trait]
impl AnalysisGateway for ScriptedGateway {
    fn name(&self) -> &str {
        "scripted"
    }

    fn is_available(&self) -> bool {
        self.available
    }

    async fn try_analyze(&self, request: &AnalysisRequest) -> Result<String, GatewayError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(request.clone());
        }
        if !self.available {
            return Err(GatewayError::NotConfigured);
        }
        Ok(self.respond(request))
    }
}
