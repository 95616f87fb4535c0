//! Value objects for the agent dialog domain

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Stable identifier of an agent (e.g. `claude`, `deepseek`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentId(String);

impl AgentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AgentId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// External model provider behind an agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Anthropic Messages API
    Anthropic,
    /// DeepSeek chat completions (OpenAI-compatible)
    DeepSeek,
}

impl ProviderKind {
    /// Model used when the agent does not name one
    pub fn default_model(self) -> &'static str {
        match self {
            ProviderKind::Anthropic => "claude-sonnet-4-20250514",
            ProviderKind::DeepSeek => "deepseek-chat",
        }
    }

    /// Path segment used by the relay process (`/api/<segment>`)
    pub fn relay_segment(self) -> &'static str {
        match self {
            ProviderKind::Anthropic => "claude",
            ProviderKind::DeepSeek => "deepseek",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderKind::Anthropic => f.write_str("anthropic"),
            ProviderKind::DeepSeek => f.write_str("deepseek"),
        }
    }
}

/// How an agent reaches its model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderBinding {
    pub provider: ProviderKind,
    pub model: String,
    pub max_tokens: u32,
}

impl ProviderBinding {
    pub fn new(provider: ProviderKind) -> Self {
        Self {
            provider,
            model: provider.default_model().to_string(),
            max_tokens: 2000,
        }
    }
}

/// A participating AI agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    /// Stable identity
    pub id: AgentId,
    /// Display name
    pub name: String,
    /// Free-text role label ("Strategist", "Analyst", ...)
    pub role: String,
    /// Takes part in group and autonomous turns
    pub enabled: bool,
    /// Cosmetic tag for the UI
    pub color: Option<String>,
    /// Model binding used by the gateway
    pub binding: ProviderBinding,
}

impl Agent {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        role: impl Into<String>,
        provider: ProviderKind,
    ) -> Self {
        Self {
            id: AgentId::new(id),
            name: name.into(),
            role: role.into(),
            enabled: true,
            color: None,
            binding: ProviderBinding::new(provider),
        }
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }
}

/// Unique identifier for a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentId(pub Uuid);

impl DocumentId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which agents see a document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentAssignment {
    /// Shared with every agent
    All,
    /// Visible to exactly one agent
    Agent(AgentId),
}

impl DocumentAssignment {
    pub fn includes(&self, agent: &AgentId) -> bool {
        match self {
            DocumentAssignment::All => true,
            DocumentAssignment::Agent(id) => id == agent,
        }
    }
}

/// An uploaded reference snippet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub name: String,
    /// Size-bounded preview of the uploaded text
    pub content: String,
    pub assigned_to: DocumentAssignment,
    pub uploaded_at: DateTime<Utc>,
}

/// Unique identifier for a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TurnId(pub Uuid);

impl TurnId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TurnId {
    fn default() -> Self {
        Self::new()
    }
}

/// Who said a turn
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    /// The human operator
    Human,
    /// A specific agent
    Agent(AgentId),
    /// Notices emitted by the orchestrator
    System,
}

impl Speaker {
    pub fn agent_id(&self) -> Option<&AgentId> {
        match self {
            Speaker::Agent(id) => Some(id),
            _ => None,
        }
    }

    pub fn is_agent(&self, agent: &AgentId) -> bool {
        self.agent_id() == Some(agent)
    }
}

/// Audience of a turn
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    /// Group chat and autonomous dialogue
    Everyone,
    /// Private chat between the human and one agent
    Private(AgentId),
}

/// A single immutable transcript entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    /// Unique identifier for this turn
    pub id: TurnId,
    /// Who is speaking in this turn
    pub speaker: Speaker,
    /// Display name captured when the turn was created
    pub speaker_name: String,
    /// Rendered content
    pub content: String,
    /// When this turn was created
    pub created_at: DateTime<Utc>,
    /// Human turn injected into a running autonomous dialogue
    pub intervention: bool,
    pub visibility: Visibility,
    /// Autonomous turn counter value, for agent turns of the dialogue
    pub dialogue_turn: Option<u32>,
}

impl Turn {
    fn build(speaker: Speaker, speaker_name: String, content: String) -> Self {
        Self {
            id: TurnId::new(),
            speaker,
            speaker_name,
            content,
            created_at: Utc::now(),
            intervention: false,
            visibility: Visibility::Everyone,
            dialogue_turn: None,
        }
    }

    /// A message typed by the human operator
    pub fn human(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self::build(Speaker::Human, name.into(), content.into())
    }

    /// A reply produced by an agent
    pub fn agent(agent: &Agent, content: impl Into<String>) -> Self {
        Self::build(
            Speaker::Agent(agent.id.clone()),
            agent.name.clone(),
            content.into(),
        )
    }

    /// A notice emitted by the orchestrator
    pub fn system(content: impl Into<String>) -> Self {
        Self::build(Speaker::System, "System".to_string(), content.into())
    }

    pub fn as_intervention(mut self) -> Self {
        self.intervention = true;
        self
    }

    pub fn private_to(mut self, agent: &AgentId) -> Self {
        self.visibility = Visibility::Private(agent.clone());
        self
    }

    pub fn with_dialogue_turn(mut self, turn: u32) -> Self {
        self.dialogue_turn = Some(turn);
        self
    }

    pub fn is_system(&self) -> bool {
        self.speaker == Speaker::System
    }

    pub fn is_public(&self) -> bool {
        self.visibility == Visibility::Everyone
    }
}

/// Role of a message in a model request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// One message of a model request history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}
