//! Runtime configuration for the dialog orchestrator
//!
//! Loaded from TOML; every field has a default so an empty file is valid.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use crate::error::{DialogError, DialogResult};
use crate::gateway::{anthropic, openai};
use crate::value_objects::{Agent, AgentId, ProviderBinding, ProviderKind};

/// Orchestrator and roster settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DialogConfig {
    /// Autonomous turns before auto mode switches off
    pub turn_limit: u32,
    /// Delay before the next autonomous turn
    pub opening_delay_ms: u64,
    /// Delay before the first turn after `resume()`
    pub resume_delay_ms: u64,
    /// Delay before the first turn after re-enabling auto mode
    pub auto_resume_delay_ms: u64,
    /// Pause between agents answering in group chat
    pub group_pacing_ms: u64,
    pub call_timeout_secs: u64,
    /// Consecutive failed autonomous turns before auto mode switches off
    pub max_consecutive_failures: u32,
    /// Feed human interventions into the autonomous history
    pub include_interventions: bool,
    pub human_name: String,
    pub organization: Option<String>,
    /// Subject of the autonomous discussion
    pub topic: String,
    pub document_preview_chars: usize,
    pub agents: Vec<AgentConfig>,
    pub gateway: GatewayConfig,
}

impl Default for DialogConfig {
    fn default() -> Self {
        Self {
            turn_limit: 20,
            opening_delay_ms: 4000,
            resume_delay_ms: 1000,
            auto_resume_delay_ms: 2000,
            group_pacing_ms: 500,
            call_timeout_secs: 120,
            max_consecutive_failures: 3,
            include_interventions: true,
            human_name: "Human".to_string(),
            organization: None,
            topic: "innovative marketing strategies for a tech client".to_string(),
            document_preview_chars: 500,
            agents: vec![
                AgentConfig {
                    id: "claude".to_string(),
                    name: "Claude".to_string(),
                    role: "Strategist".to_string(),
                    color: Some("purple".to_string()),
                    enabled: true,
                    provider: ProviderKind::Anthropic,
                    model: None,
                    max_tokens: None,
                },
                AgentConfig {
                    id: "deepseek".to_string(),
                    name: "DeepSeek".to_string(),
                    role: "Analyst".to_string(),
                    color: Some("blue".to_string()),
                    enabled: true,
                    provider: ProviderKind::DeepSeek,
                    model: None,
                    max_tokens: None,
                },
            ],
            gateway: GatewayConfig::default(),
        }
    }
}

/// One roster entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    pub id: String,
    pub name: String,
    pub role: String,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    pub provider: ProviderKind,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
}

fn default_enabled() -> bool {
    true
}

impl AgentConfig {
    pub fn to_agent(&self) -> Agent {
        let mut binding = ProviderBinding::new(self.provider);
        if let Some(model) = &self.model {
            binding.model = model.clone();
        }
        if let Some(max_tokens) = self.max_tokens {
            binding.max_tokens = max_tokens;
        }

        Agent {
            id: AgentId::new(self.id.clone()),
            name: self.name.clone(),
            role: self.role.clone(),
            enabled: self.enabled,
            color: self.color.clone(),
            binding,
        }
    }
}

/// Provider endpoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub anthropic_url: String,
    pub anthropic_version: String,
    pub deepseek_url: String,
    /// Forward calls through a gateway process instead of calling providers
    pub relay_url: Option<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            anthropic_url: anthropic::MESSAGES_URL.to_string(),
            anthropic_version: anthropic::ANTHROPIC_VERSION.to_string(),
            deepseek_url: openai::DEEPSEEK_URL.to_string(),
            relay_url: None,
        }
    }
}

impl DialogConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(source: &str) -> DialogResult<Self> {
        let config: DialogConfig = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and validate a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> DialogResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|err| {
            DialogError::Config(format!("cannot read {}: {err}", path.display()))
        })?;
        Self::from_toml_str(&source)
    }

    pub fn validate(&self) -> DialogResult<()> {
        if self.turn_limit == 0 {
            return Err(DialogError::Config("turn_limit must be at least 1".into()));
        }

        let mut seen = HashSet::new();
        for agent in &self.agents {
            if agent.id.trim().is_empty() {
                return Err(DialogError::Config("agent id must not be empty".into()));
            }
            if !seen.insert(agent.id.as_str()) {
                return Err(DialogError::Config(format!(
                    "duplicate agent id `{}`",
                    agent.id
                )));
            }
        }

        Ok(())
    }

    pub fn roster(&self) -> Vec<Agent> {
        self.agents.iter().map(AgentConfig::to_agent).collect()
    }

    pub fn opening_delay(&self) -> Duration {
        Duration::from_millis(self.opening_delay_ms)
    }

    pub fn resume_delay(&self) -> Duration {
        Duration::from_millis(self.resume_delay_ms)
    }

    pub fn auto_resume_delay(&self) -> Duration {
        Duration::from_millis(self.auto_resume_delay_ms)
    }

    pub fn group_pacing(&self) -> Duration {
        Duration::from_millis(self.group_pacing_ms)
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }
}
