//! Client for OpenAI-compatible `/chat/completions` endpoints (Groq by default).

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;

use super::client::GenerationClient;
use crate::error::{AppError, AppResult};
use crate::models::ConversationTurn;

pub const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_MODEL: &str = "llama-3.3-70b-versatile";
pub const DEFAULT_TEMPERATURE: f32 = 0.1;
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

const SYSTEM_MESSAGE: &str = "You are an expert SQL assistant. You translate questions about a \
relational database into one executable SQL statement for that database. When a previous \
statement of yours appears in the conversation and the question is asked again, it failed: \
write a corrected statement.";

#[derive(Debug, Clone)]
pub struct ChatCompletionsConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub temperature: f32,
    pub timeout: Duration,
}

impl ChatCompletionsConfig {
    /// Groq defaults with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Clone)]
pub struct ChatCompletionsClient {
    client: reqwest::Client,
    config: ChatCompletionsConfig,
}

impl ChatCompletionsClient {
    /// Fails with a configuration error when no API key is set.
    pub fn new(config: ChatCompletionsConfig) -> AppResult<Self> {
        if config.api_key.trim().is_empty() {
            return Err(AppError::configuration(
                "Model provider API key is not set (use --api-key or GROQ_API_KEY)",
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        )
    }

    fn messages<'a>(history: &'a [ConversationTurn], prompt: &'a str) -> Vec<ChatMessage<'a>> {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(ChatMessage {
            role: "system",
            content: SYSTEM_MESSAGE,
        });
        messages.extend(history.iter().map(|turn| ChatMessage {
            role: turn.role.as_str(),
            content: &turn.content,
        }));
        messages.push(ChatMessage {
            role: "user",
            content: prompt,
        });
        messages
    }
}

#[async_trait]
impl GenerationClient for ChatCompletionsClient {
    fn model(&self) -> &str {
        &self.config.model
    }

    async fn generate(&self, history: &[ConversationTurn], prompt: &str) -> AppResult<String> {
        let body = ChatRequest {
            model: &self.config.model,
            messages: Self::messages(history, prompt),
            temperature: self.config.temperature,
        };

        debug!(
            model = %self.config.model,
            history_turns = history.len(),
            prompt = %prompt,
            "Requesting completion"
        );

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(AppError::generation(
                format!("API error: {}", text.trim()),
                Some(status.as_u16()),
            ));
        }

        let json: serde_json::Value = response.json().await.map_err(|e| {
            AppError::generation(format!("Failed to parse response: {}", e), None)
        })?;

        json["choices"][0]["message"]["content"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| {
                AppError::generation("Response has no choices[0].message.content", None)
            })
    }
}
