use std::time::Duration;

use reqwest::Client;
use serde_json::Value;
use thiserror::Error;
use voices_core::{PromptMessage, Role};

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4";
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

const OFFLINE_PROBE_REPLY: &str =
    "Thank you for sharing. Could you tell me a little more about what happened?";

#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<PromptMessage>,
    pub temperature: f32,
}

#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("completion request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("completion service returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("completion response had no message content")]
    EmptyResponse,
}

pub trait CompletionClient: Send + Sync {
    fn backend_name(&self) -> &'static str;

    /// One blocking request/response exchange. No retries.
    async fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError>;
}

#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub base_url: String,
    pub timeout: Duration,
    pub connect_timeout: Duration,
}

impl OpenAiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            timeout: Duration::from_secs(20),
            connect_timeout: Duration::from_secs(6),
        }
    }
}

#[derive(Debug, Clone)]
pub struct OpenAiClient {
    http: Client,
    api_key: String,
    endpoint: String,
}

impl OpenAiClient {
    pub fn new(config: OpenAiConfig) -> Result<Self, CompletionError> {
        let http = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            http,
            api_key: config.api_key,
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
        })
    }
}

impl CompletionClient for OpenAiClient {
    fn backend_name(&self) -> &'static str {
        "openai"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError> {
        let payload = serde_json::json!({
            "model": request.model,
            "messages": request.messages,
            "temperature": request.temperature,
        });

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(self.api_key.as_str())
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CompletionError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body: Value = response.json().await?;
        extract_message_content(&body).ok_or(CompletionError::EmptyResponse)
    }
}

pub fn extract_message_content(body: &Value) -> Option<String> {
    body.pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .filter(|content| !content.trim().is_empty())
        .map(ToString::to_string)
}

/// Local stand-in used when no API key is configured: replays the
/// assistant seed when present, otherwise asks for more detail.
#[derive(Debug, Clone, Default)]
pub struct OfflineClient;

impl CompletionClient for OfflineClient {
    fn backend_name(&self) -> &'static str {
        "offline"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError> {
        let seed = request
            .messages
            .iter()
            .rev()
            .find(|message| message.role == Role::Assistant)
            .map(|message| message.content.clone());

        Ok(seed.unwrap_or_else(|| OFFLINE_PROBE_REPLY.to_string()))
    }
}

#[derive(Debug, Clone)]
pub enum ModelClient {
    OpenAi(OpenAiClient),
    Offline(OfflineClient),
}

impl ModelClient {
    pub fn offline() -> Self {
        Self::Offline(OfflineClient)
    }

    pub fn openai(config: OpenAiConfig) -> Result<Self, CompletionError> {
        Ok(Self::OpenAi(OpenAiClient::new(config)?))
    }
}

impl CompletionClient for ModelClient {
    fn backend_name(&self) -> &'static str {
        match self {
            ModelClient::OpenAi(client) => client.backend_name(),
            ModelClient::Offline(client) => client.backend_name(),
        }
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError> {
        match self {
            ModelClient::OpenAi(client) => client.complete(request).await,
            ModelClient::Offline(client) => client.complete(request).await,
        }
    }
}
