//! OpenAI-compatible chat completions adapter (DeepSeek)

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::request_messages;
use crate::error::{DialogError, DialogResult};
use crate::value_objects::{ChatMessage, ProviderBinding};

pub const DEEPSEEK_URL: &str = "https://api.deepseek.com/v1/chat/completions";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl ChatCompletionRequest {
    pub fn new(binding: &ProviderBinding, prompt: &str, history: &[ChatMessage]) -> Self {
        Self {
            model: binding.model.clone(),
            messages: request_messages(prompt, history),
            max_tokens: Some(binding.max_tokens),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionResponse {
    #[serde(default)]
    pub choices: Vec<Choice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Choice {
    pub message: ResponseMessage,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResponseMessage {
    #[serde(default)]
    pub content: Option<String>,
}

impl ChatCompletionResponse {
    pub fn into_text(self) -> DialogResult<String> {
        self.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                DialogError::MalformedResponse("completion has no message content".to_string())
            })
    }
}

/// POST a chat completion; `api_key` is `None` when a relay holds the key
pub async fn send(
    client: &Client,
    url: &str,
    api_key: Option<&str>,
    body: &ChatCompletionRequest,
) -> DialogResult<String> {
    let mut request = client.post(url).json(body);
    if let Some(key) = api_key {
        request = request.bearer_auth(key);
    }

    let response = request.send().await?;
    let status = response.status();
    debug!(%url, status = status.as_u16(), model = %body.model, "chat completion response");

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(DialogError::Provider {
            status: status.as_u16(),
            body,
        });
    }

    let parsed: ChatCompletionResponse = response.json().await?;
    parsed.into_text()
}
