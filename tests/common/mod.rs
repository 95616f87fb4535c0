//! Shared test harness: a scripted in-memory model gateway

#![allow(dead_code)]

use agent_dialog::{
    AgentId, ChatMessage, DialogConfig, DialogError, DialogResult, ModelGateway, Orchestrator,
    Speaker, Turn, TranscriptFilter,
};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// One recorded gateway call
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub agent: AgentId,
    pub prompt: String,
    pub history: Vec<ChatMessage>,
}

impl RecordedCall {
    pub fn history_text(&self) -> String {
        self.history
            .iter()
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Answers `"<agent> reply <n>"`, or fails, hangs or stalls per agent
#[derive(Default)]
pub struct ScriptedGateway {
    calls: Mutex<Vec<RecordedCall>>,
    failing: Mutex<HashSet<AgentId>>,
    hanging: Mutex<HashSet<AgentId>>,
    delays: Mutex<HashMap<AgentId, Duration>>,
}

impl ScriptedGateway {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail(&self, agent: &str) {
        self.failing.lock().unwrap().insert(AgentId::new(agent));
    }

    pub fn recover(&self, agent: &str) {
        self.failing.lock().unwrap().remove(&AgentId::new(agent));
    }

    pub fn hang(&self, agent: &str) {
        self.hanging.lock().unwrap().insert(AgentId::new(agent));
    }

    pub fn delay(&self, agent: &str, delay: Duration) {
        self.delays.lock().unwrap().insert(AgentId::new(agent), delay);
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_for(&self, agent: &str) -> Vec<RecordedCall> {
        self.calls()
            .into_iter()
            .filter(|call| call.agent.as_str() == agent)
            .collect()
    }

    pub fn last_call(&self) -> RecordedCall {
        self.calls().last().cloned().expect("no gateway call recorded")
    }
}

#[async_trait]
impl ModelGateway for ScriptedGateway {
    async fn call(
        &self,
        agent: &AgentId,
        prompt: &str,
        history: &[ChatMessage],
    ) -> DialogResult<String> {
        let number = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(RecordedCall {
                agent: agent.clone(),
                prompt: prompt.to_string(),
                history: history.to_vec(),
            });
            calls.len()
        };

        let delay = self.delays.lock().unwrap().get(agent).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let hangs = self.hanging.lock().unwrap().contains(agent);
        if hangs {
            std::future::pending::<()>().await;
        }

        let fails = self.failing.lock().unwrap().contains(agent);
        if fails {
            return Err(DialogError::Provider {
                status: 529,
                body: "overloaded".to_string(),
            });
        }

        Ok(format!("{agent} reply {number}"))
    }
}

/// Route orchestrator logs to the test output (`RUST_LOG=debug cargo test`)
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Default roster (Claude, DeepSeek) over the scripted gateway
pub fn orchestrator(config: DialogConfig, gateway: &Arc<ScriptedGateway>) -> Orchestrator {
    init_tracing();
    Orchestrator::new(config, gateway.clone()).unwrap()
}

pub fn config_with_limit(turn_limit: u32) -> DialogConfig {
    DialogConfig {
        turn_limit,
        ..DialogConfig::default()
    }
}

pub async fn all_turns(orchestrator: &Orchestrator) -> Vec<Turn> {
    orchestrator.transcript().view(&TranscriptFilter::All).await
}

pub async fn agent_turns(orchestrator: &Orchestrator) -> Vec<Turn> {
    all_turns(orchestrator)
        .await
        .into_iter()
        .filter(|turn| matches!(turn.speaker, Speaker::Agent(_)))
        .collect()
}

pub async fn notices(orchestrator: &Orchestrator) -> Vec<String> {
    all_turns(orchestrator)
        .await
        .into_iter()
        .filter(|turn| turn.is_system())
        .map(|turn| turn.content)
        .collect()
}

pub fn speakers(turns: &[Turn]) -> Vec<String> {
    turns
        .iter()
        .filter_map(|turn| turn.speaker.agent_id().map(|id| id.to_string()))
        .collect()
}
