//! Error types for the agent dialog domain

use std::time::Duration;
use thiserror::Error;

use crate::value_objects::{AgentId, DocumentId};

/// Result type alias for the agent dialog domain
pub type DialogResult<T> = std::result::Result<T, DialogError>;

/// Main error type for the agent dialog domain
#[derive(Debug, Error)]
pub enum DialogError {
    /// Missing credential or invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Non-success response from a model provider
    #[error("Provider error {status}: {body}")]
    Provider { status: u16, body: String },

    /// Transport-level failure
    #[error("Network error: {0}")]
    Network(String),

    /// Operator input or roster does not satisfy a precondition
    #[error("Validation error: {0}")]
    Validation(String),

    /// Operation not allowed in the current session state
    #[error("Invalid state transition from {from} to {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("Unknown agent: {0}")]
    UnknownAgent(AgentId),

    #[error("Unknown document: {0}")]
    UnknownDocument(DocumentId),

    /// The model call did not resolve in time
    #[error("Agent {agent} did not answer within {}s", after.as_secs())]
    Timeout { agent: AgentId, after: Duration },

    /// Provider answered 2xx with a body we cannot read
    #[error("Malformed provider response: {0}")]
    MalformedResponse(String),
}

impl From<reqwest::Error> for DialogError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            DialogError::MalformedResponse(err.to_string())
        } else {
            DialogError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for DialogError {
    fn from(err: serde_json::Error) -> Self {
        DialogError::MalformedResponse(err.to_string())
    }
}

impl From<toml::de::Error> for DialogError {
    fn from(err: toml::de::Error) -> Self {
        DialogError::Config(err.to_string())
    }
}
