//! Chat backend adapter: hands snapshot context plus the user question to a
//! generative provider. The serving process never depends on the provider
//! being up; callers fall back to the rule-based answerer on any error.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

pub const ENV_CHAT_API_KEY: &str = "ANTHROPIC_API_KEY";
pub const ENV_CHAT_MODEL: &str = "CHAT_MODEL";
pub const ENV_CHAT_TEST_MODE: &str = "CHAT_TEST_MODE";
const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";
const ANTHROPIC_URL: &str = "https://api.anthropic.com/v1/messages";

#[async_trait::async_trait]
pub trait ChatBackend: Send + Sync {
    /// Produce a reply from the snapshot context and the user message.
    async fn reply(&self, context: &str, message: &str) -> Result<String>;
    /// Provider name for diagnostics.
    fn name(&self) -> &'static str;
}

pub type DynChatBackend = Arc<dyn ChatBackend>;

/// Factory: build a backend from the environment.
///
/// * `CHAT_TEST_MODE=mock` returns a deterministic mock.
/// * With no API key configured, returns a disabled backend (callers then
///   answer from the snapshot directly).
pub fn build_backend_from_env() -> DynChatBackend {
    if std::env::var(ENV_CHAT_TEST_MODE).map(|v| v == "mock").unwrap_or(false) {
        return Arc::new(MockBackend);
    }
    match std::env::var(ENV_CHAT_API_KEY) {
        Ok(key) if !key.trim().is_empty() => Arc::new(AnthropicBackend::new(key)),
        _ => Arc::new(DisabledBackend),
    }
}

/// Anthropic Messages API over reqwest.
pub struct AnthropicBackend {
    http: reqwest::Client,
    api_key: String,
    model: String,
}

impl AnthropicBackend {
    pub fn new(api_key: String) -> Self {
        let http = reqwest::Client::builder()
            .user_agent("news-impact-analyzer/0.1")
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(20))
            .build()
            .expect("reqwest client");
        let model =
            std::env::var(ENV_CHAT_MODEL).unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        Self {
            http,
            api_key,
            model,
        }
    }
}

#[derive(Serialize)]
struct ApiMessage<'a> {
    role: &'a str,
    content: String,
}

#[derive(Serialize)]
struct ApiRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<ApiMessage<'a>>,
}

#[derive(Deserialize)]
struct ApiResponse {
    content: Vec<ApiContent>,
}

#[derive(Deserialize)]
struct ApiContent {
    #[serde(default)]
    text: String,
}

#[async_trait::async_trait]
impl ChatBackend for AnthropicBackend {
    async fn reply(&self, context: &str, message: &str) -> Result<String> {
        let prompt = format!(
            "You are a financial-news assistant. Answer briefly using only \
             this current analysis of institution impact on Indian markets:\n\n\
             {context}\n\nQuestion: {message}"
        );
        let req = ApiRequest {
            model: &self.model,
            max_tokens: 500,
            messages: vec![ApiMessage {
                role: "user",
                content: prompt,
            }],
        };

        let resp = self
            .http
            .post(ANTHROPIC_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .json(&req)
            .send()
            .await
            .context("chat backend request")?
            .error_for_status()
            .context("chat backend status")?;

        let body: ApiResponse = resp.json().await.context("chat backend body")?;
        let text = body
            .content
            .iter()
            .map(|c| c.text.as_str())
            .collect::<Vec<_>>()
            .join("");
        if text.trim().is_empty() {
            return Err(anyhow!("chat backend returned empty reply"));
        }
        Ok(text)
    }

    fn name(&self) -> &'static str {
        "anthropic"
    }
}

/// No provider configured; always errors so callers use the fallback path.
pub struct DisabledBackend;

#[async_trait::async_trait]
impl ChatBackend for DisabledBackend {
    async fn reply(&self, _context: &str, _message: &str) -> Result<String> {
        Err(anyhow!("chat backend disabled"))
    }

    fn name(&self) -> &'static str {
        "disabled"
    }
}

/// Deterministic mock for tests (`CHAT_TEST_MODE=mock`).
pub struct MockBackend;

#[async_trait::async_trait]
impl ChatBackend for MockBackend {
    async fn reply(&self, _context: &str, message: &str) -> Result<String> {
        Ok(format!("mock reply: {message}"))
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
