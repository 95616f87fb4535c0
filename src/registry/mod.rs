//! Agent registry - the roster of participating agents
//!
//! Insertion order is significant: group dispatch answers in registry order and
//! the first enabled agent opens an autonomous dialogue.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{DialogError, DialogResult};
use crate::value_objects::{Agent, AgentId};

/// Partial edit of an agent, applied by the operator
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentUpdate {
    pub name: Option<String>,
    pub role: Option<String>,
    pub enabled: Option<bool>,
    pub color: Option<String>,
}

/// Ordered roster of agents
#[derive(Debug, Clone, Default)]
pub struct AgentRegistry {
    agents: Vec<Agent>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from a roster, rejecting duplicate ids
    pub fn with_agents(agents: impl IntoIterator<Item = Agent>) -> DialogResult<Self> {
        let mut registry = Self::new();
        for agent in agents {
            registry.add(agent)?;
        }
        Ok(registry)
    }

    pub fn add(&mut self, agent: Agent) -> DialogResult<()> {
        if self.get(&agent.id).is_some() {
            return Err(DialogError::Validation(format!(
                "agent `{}` is already registered",
                agent.id
            )));
        }

        info!(agent = %agent.id, "registered agent");
        self.agents.push(agent);
        Ok(())
    }

    pub fn get(&self, id: &AgentId) -> Option<&Agent> {
        self.agents.iter().find(|agent| &agent.id == id)
    }

    pub fn require(&self, id: &AgentId) -> DialogResult<&Agent> {
        self.get(id).ok_or_else(|| DialogError::UnknownAgent(id.clone()))
    }

    /// Apply an operator edit and return the updated agent
    pub fn update(&mut self, id: &AgentId, update: AgentUpdate) -> DialogResult<Agent> {
        let agent = self
            .agents
            .iter_mut()
            .find(|agent| &agent.id == id)
            .ok_or_else(|| DialogError::UnknownAgent(id.clone()))?;

        if let Some(name) = update.name {
            agent.name = name;
        }
        if let Some(role) = update.role {
            agent.role = role;
        }
        if let Some(enabled) = update.enabled {
            agent.enabled = enabled;
        }
        if let Some(color) = update.color {
            agent.color = Some(color);
        }

        Ok(agent.clone())
    }

    pub fn set_enabled(&mut self, id: &AgentId, enabled: bool) -> DialogResult<()> {
        self.update(
            id,
            AgentUpdate {
                enabled: Some(enabled),
                ..AgentUpdate::default()
            },
        )
        .map(|_| ())
    }

    /// Enabled agents in registry order
    pub fn enabled(&self) -> Vec<&Agent> {
        self.agents.iter().filter(|agent| agent.enabled).collect()
    }

    pub fn all(&self) -> &[Agent] {
        &self.agents
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value_objects::ProviderKind;

    fn roster() -> AgentRegistry {
        AgentRegistry::with_agents([
            Agent::new("claude", "Claude", "Strategist", ProviderKind::Anthropic),
            Agent::new("deepseek", "DeepSeek", "Analyst", ProviderKind::DeepSeek),
            Agent::new("critic", "Critic", "Reviewer", ProviderKind::Anthropic).disabled(),
        ])
        .unwrap()
    }

    #[test]
    fn test_enabled_keeps_registry_order() {
        let registry = roster();
        let ids: Vec<_> = registry.enabled().iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["claude", "deepseek"]);
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let mut registry = roster();
        let result = registry.add(Agent::new("claude", "Other", "x", ProviderKind::DeepSeek));
        assert!(matches!(result, Err(DialogError::Validation(_))));
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_update_agent() {
        let mut registry = roster();
        let id = AgentId::new("critic");

        let updated = registry
            .update(
                &id,
                AgentUpdate {
                    role: Some("Devil's advocate".to_string()),
                    enabled: Some(true),
                    ..AgentUpdate::default()
                },
            )
            .unwrap();

        assert_eq!(updated.role, "Devil's advocate");
        assert_eq!(registry.enabled().len(), 3);

        let missing = registry.set_enabled(&AgentId::new("ghost"), false);
        assert!(matches!(missing, Err(DialogError::UnknownAgent(_))));
    }
}
