//! OpenAI-compatible chat-completions client.
//!
//! Speaks the `/chat/completions` wire format, which most hosted and local
//! model servers accept. The client is built once by the host from resolved
//! configuration; the engine only sees it through [`Completion`].

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::trait_def::{Completion, CompletionError};

/// Settings for [`OpenAiCompletion`].
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    /// Bearer credential. `None` makes every call fail as unavailable.
    pub api_key: Option<String>,
    /// Model identifier sent with each request.
    pub model: String,
    /// API root, without the trailing `/chat/completions`.
    pub base_url: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Per-call timeout covering connect and read.
    pub timeout: Duration,
}

impl OpenAiConfig {
    pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
    pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
    pub const DEFAULT_TEMPERATURE: f32 = 0.2;
    pub const DEFAULT_TIMEOUT_SECS: u64 = 60;
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: Self::DEFAULT_MODEL.to_owned(),
            base_url: Self::DEFAULT_BASE_URL.to_owned(),
            temperature: Self::DEFAULT_TEMPERATURE,
            timeout: Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS),
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: [ChatMessage<'a>; 2],
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ReplyMessage,
}

#[derive(Deserialize)]
struct ReplyMessage {
    content: Option<String>,
}

/// [`Completion`] backed by an OpenAI-compatible HTTP endpoint.
#[derive(Debug, Clone)]
pub struct OpenAiCompletion {
    config: OpenAiConfig,
    client: reqwest::Client,
}

impl OpenAiCompletion {
    /// Build a client with the configured timeout.
    pub fn new(config: OpenAiConfig) -> Result<Self, CompletionError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| CompletionError::Unavailable(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { config, client })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        )
    }
}

#[async_trait]
impl Completion for OpenAiCompletion {
    fn model_name(&self) -> &str {
        &self.config.model
    }

    async fn generate(&self, text: &str, system_prompt: &str) -> Result<String, CompletionError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or_else(|| CompletionError::Unavailable("OPENAI_API_KEY is not set".into()))?;

        let request = ChatRequest {
            model: &self.config.model,
            temperature: self.config.temperature,
            messages: [
                ChatMessage {
                    role: "system",
                    content: system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: text,
                },
            ],
        };

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(model = %self.config.model, error = %e, "completion request failed");
                CompletionError::Unavailable(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(model = %self.config.model, status = status.as_u16(), "completion request rejected");
            return Err(CompletionError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| CompletionError::Malformed(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| CompletionError::Malformed("reply has no message content".into()))
    }
}
