//! Chat-completion client.
//!
//! [`OpenRouterClient`] speaks the OpenAI-compatible `/chat/completions`
//! API that OpenRouter exposes. One attempt per call, no streaming.

use std::time::Duration;

use aitutor_shared::{AppConfig, Result, TutorError, validate_api_key};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

/// Upstream error bodies are cut to this many bytes in error messages.
const MAX_ERROR_BODY_CHARS: usize = 2048;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Anything that can turn a message list into an assistant reply.
#[allow(async_fn_in_trait)]
pub trait LlmClient {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String>;
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// OpenRouter (or any OpenAI-compatible) chat client.
#[derive(Clone)]
pub struct OpenRouterClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    timeout: Duration,
}

impl OpenRouterClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("aitutor/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| TutorError::Llm(format!("failed to build http client: {e}")))?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
            timeout,
        })
    }

    /// Build from the `[openrouter]` config section, reading the key from its env var.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let api_key = validate_api_key(config)?;
        Self::new(
            &config.openrouter.base_url,
            api_key,
            &config.openrouter.default_model,
            Duration::from_secs(config.openrouter.timeout_secs),
        )
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

impl LlmClient for OpenRouterClient {
    #[instrument(skip_all, fields(model = %self.model, messages = messages.len()))]
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);
        let request = CompletionRequest {
            model: &self.model,
            messages,
        };

        let resp = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .timeout(self.timeout)
            .json(&request)
            .send()
            .await
            .map_err(|e| TutorError::Llm(format!("request failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let body: String = body.chars().take(MAX_ERROR_BODY_CHARS).collect();
            return Err(TutorError::Llm(format!("upstream returned {status}: {body}")));
        }

        let parsed: CompletionResponse = resp
            .json()
            .await
            .map_err(|e| TutorError::Llm(format!("invalid response JSON: {e}")))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| TutorError::Llm("response contained no choices".into()))?;

        debug!(chars = content.len(), "completion received");
        Ok(content)
    }
}
