//! Anthropic Messages API adapter

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{merge_consecutive, request_messages};
use crate::error::{DialogError, DialogResult};
use crate::value_objects::{ChatMessage, ProviderBinding};

pub const MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";
pub const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessagesRequest {
    pub model: String,
    pub max_tokens: u32,
    pub messages: Vec<ChatMessage>,
}

impl MessagesRequest {
    /// Messages API requires alternating roles, so same-role runs are merged
    pub fn new(binding: &ProviderBinding, prompt: &str, history: &[ChatMessage]) -> Self {
        Self {
            model: binding.model.clone(),
            max_tokens: binding.max_tokens,
            messages: merge_consecutive(request_messages(prompt, history)),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessagesResponse {
    #[serde(default)]
    pub content: Vec<ContentBlock>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text { text: String },
    #[serde(other)]
    Other,
}

impl MessagesResponse {
    /// Text of the first text block
    pub fn into_text(self) -> DialogResult<String> {
        self.content
            .into_iter()
            .find_map(|block| match block {
                ContentBlock::Text { text } => Some(text),
                ContentBlock::Other => None,
            })
            .ok_or_else(|| {
                DialogError::MalformedResponse("Anthropic response has no text block".to_string())
            })
    }
}

/// POST a Messages request; `api_key` is `None` when a relay holds the key
pub async fn send(
    client: &Client,
    url: &str,
    version: &str,
    api_key: Option<&str>,
    body: &MessagesRequest,
) -> DialogResult<String> {
    let mut request = client
        .post(url)
        .header("anthropic-version", version)
        .json(body);
    if let Some(key) = api_key {
        request = request.header("x-api-key", key);
    }

    let response = request.send().await?;
    let status = response.status();
    debug!(%url, status = status.as_u16(), model = %body.model, "anthropic response");

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(DialogError::Provider {
            status: status.as_u16(),
            body,
        });
    }

    let parsed: MessagesResponse = response.json().await?;
    parsed.into_text()
}
