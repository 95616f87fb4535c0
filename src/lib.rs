//! Agent dialog domain module
//!
//! Orchestrates conversations between a human operator and several AI agents
//! backed by external language-model providers. It provides:
//! - A group chat where every enabled agent answers the human in turn
//! - Private chats between the human and a single agent
//! - An autonomous dialogue where two agents alternate on a timer, with pause,
//!   auto/manual mode, turn limits and non-blocking human intervention
//! - Perspective-relative histories: each agent sees its own turns as
//!   `assistant` and everyone else as `user`
//! - A model gateway hiding the provider request and response shapes
//!
//! The transcript is the single append-only record of what was said; every
//! chat view is a filter over it.

pub mod aggregate;
pub mod commands;
pub mod config;
pub mod context;
pub mod documents;
pub mod error;
pub mod events;
pub mod gateway;
pub mod handlers;
pub mod orchestrator;
pub mod registry;
pub mod routing;
#[cfg(feature = "server")]
pub mod server;
pub mod transcript;
pub mod value_objects;

// Re-export main types
pub use aggregate::{ConversationSession, SessionSnapshot, SessionState};
pub use commands::OperatorCommand;
pub use config::{AgentConfig, DialogConfig, GatewayConfig};
pub use context::{ContextBuilder, HistoryMode};
pub use documents::DocumentStore;
pub use error::{DialogError, DialogResult};
pub use events::{DialogEvent, EventBus, LoadingChanged, SessionChanged, TurnAppended};
pub use gateway::{
    CredentialSource, EnvCredentials, KeyMap, ModelGateway, ProviderGateway, Transport,
};
pub use handlers::{CommandOutcome, DialogCommandHandler};
pub use orchestrator::Orchestrator;
pub use registry::{AgentRegistry, AgentUpdate};
pub use routing::{AlternatingStrategy, BroadcastStrategy, RoutingDecision, RoutingStrategy};
pub use transcript::{Transcript, TranscriptFilter};

pub use value_objects::{
    Agent, AgentId, ChatMessage, ChatRole, Document, DocumentAssignment, DocumentId,
    ProviderBinding, ProviderKind, Speaker, Turn, TurnId, Visibility,
};
