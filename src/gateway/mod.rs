//! Model gateway - one call contract over every external model provider
//!
//! The orchestrator only sees [`ModelGateway::call`]. Provider request and
//! response shapes live in the adapter modules; where the API key comes from
//! is decided by a [`CredentialSource`] chosen by whoever builds the gateway.

pub mod anthropic;
pub mod credentials;
pub mod openai;
pub mod provider;

use async_trait::async_trait;

use crate::error::DialogResult;
use crate::value_objects::{AgentId, ChatMessage};

pub use credentials::{CredentialSource, EnvCredentials, KeyMap};
pub use provider::{ProviderGateway, Transport};

/// Uniform model call contract
///
/// Implementations never retry; a failed call is reported to the caller as is.
#[async_trait]
pub trait ModelGateway: Send + Sync {
    /// Ask `agent` to answer `prompt` given the prior `history`
    async fn call(
        &self,
        agent: &AgentId,
        prompt: &str,
        history: &[ChatMessage],
    ) -> DialogResult<String>;
}

/// `history` followed by the prompt as the final user message
pub fn request_messages(prompt: &str, history: &[ChatMessage]) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(history.len() + 1);
    messages.extend_from_slice(history);
    messages.push(ChatMessage::user(prompt));
    messages
}

/// Collapse runs of same-role messages into one message each
pub fn merge_consecutive(messages: Vec<ChatMessage>) -> Vec<ChatMessage> {
    let mut merged: Vec<ChatMessage> = Vec::with_capacity(messages.len());
    for message in messages {
        match merged.last_mut() {
            Some(last) if last.role == message.role => {
                last.content.push_str("\n\n");
                last.content.push_str(&message.content);
            }
            _ => merged.push(message),
        }
    }
    merged
}
