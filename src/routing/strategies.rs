//! Speaker selection strategies
//!
//! A strategy decides which agents answer next. Group chat broadcasts to every
//! enabled agent and the autonomous dialogue alternates strictly between two
//! participants.

use serde::{Deserialize, Serialize};

use crate::error::{DialogError, DialogResult};
use crate::registry::AgentRegistry;
use crate::value_objects::{AgentId, Turn};

/// Agents selected to speak, in speaking order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingDecision {
    pub targets: Vec<AgentId>,
    /// Strategy that produced the decision
    pub strategy: String,
}

/// Trait for speaker selection strategies
pub trait RoutingStrategy: Send + Sync {
    /// Select the agents that answer next
    fn route(&self, registry: &AgentRegistry, turns: &[Turn]) -> DialogResult<RoutingDecision>;

    fn name(&self) -> &str;
}

/// Every enabled agent, in registry order
#[derive(Debug, Clone, Copy, Default)]
pub struct BroadcastStrategy;

impl RoutingStrategy for BroadcastStrategy {
    fn route(&self, registry: &AgentRegistry, _turns: &[Turn]) -> DialogResult<RoutingDecision> {
        Ok(RoutingDecision {
            targets: registry.enabled().into_iter().map(|a| a.id.clone()).collect(),
            strategy: self.name().to_string(),
        })
    }

    fn name(&self) -> &str {
        "broadcast"
    }
}

/// Next and previous speaker of an autonomous turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alternation {
    pub next: AgentId,
    pub previous: AgentId,
}

/// Strict alternation between the two dialogue participants
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlternatingStrategy {
    opener: AgentId,
    responder: AgentId,
}

impl AlternatingStrategy {
    pub fn new(opener: AgentId, responder: AgentId) -> Self {
        Self { opener, responder }
    }

    /// The first two enabled agents; fewer than two is a validation error
    pub fn from_registry(registry: &AgentRegistry) -> DialogResult<Self> {
        match registry.enabled().as_slice() {
            [first, second, ..] => Ok(Self::new(first.id.clone(), second.id.clone())),
            enabled => Err(DialogError::Validation(format!(
                "at least 2 enabled agents are required for an autonomous dialogue, found {}",
                enabled.len()
            ))),
        }
    }

    pub fn opener(&self) -> &AgentId {
        &self.opener
    }

    pub fn responder(&self) -> &AgentId {
        &self.responder
    }

    pub fn partner_of(&self, agent: &AgentId) -> &AgentId {
        if agent == &self.opener {
            &self.responder
        } else {
            &self.opener
        }
    }

    /// Whoever did not produce the most recent participant turn speaks next
    pub fn alternation(&self, turns: &[Turn]) -> Alternation {
        let last = turns.iter().rev().find_map(|turn| {
            turn.speaker
                .agent_id()
                .filter(|id| *id == &self.opener || *id == &self.responder)
        });

        let next = match last {
            Some(id) if id == &self.opener => self.responder.clone(),
            _ => self.opener.clone(),
        };
        let previous = self.partner_of(&next).clone();

        Alternation { next, previous }
    }
}

impl RoutingStrategy for AlternatingStrategy {
    fn route(&self, _registry: &AgentRegistry, turns: &[Turn]) -> DialogResult<RoutingDecision> {
        Ok(RoutingDecision {
            targets: vec![self.alternation(turns).next],
            strategy: self.name().to_string(),
        })
    }

    fn name(&self) -> &str {
        "alternating"
    }
}
