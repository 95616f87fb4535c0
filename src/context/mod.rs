//! Context building for agent calls
//!
//! Two pure derivations feed every model call:
//! - the *context* string: role framing for one agent plus the documents
//!   assigned to it
//! - the *history*: a perspective-relative rendering of prior turns where the
//!   agent about to speak is always `assistant` and every other party,
//!   including the other AI, is `user`

pub mod prompts;

use crate::config::DialogConfig;
use crate::documents::DocumentStore;
use crate::value_objects::{Agent, AgentId, ChatMessage, Speaker, Turn};

/// How prior turns are selected and labelled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryMode<'a> {
    /// Group or private chat: every turn of the (already filtered) view
    Conversation,
    /// Agent-to-agent dialogue with one partner
    Autonomous { partner: &'a AgentId },
}

/// Builds context strings and histories for agent calls
#[derive(Debug, Clone)]
pub struct ContextBuilder {
    organization: Option<String>,
    include_interventions: bool,
}

impl ContextBuilder {
    pub fn new(organization: Option<String>, include_interventions: bool) -> Self {
        Self {
            organization,
            include_interventions,
        }
    }

    pub fn from_config(config: &DialogConfig) -> Self {
        Self::new(config.organization.clone(), config.include_interventions)
    }

    /// Role framing for `agent` followed by its assigned documents
    pub fn context(&self, agent: &Agent, documents: &DocumentStore) -> String {
        let affiliation = self
            .organization
            .as_deref()
            .map(|org| format!(" at {org}"))
            .unwrap_or_default();

        let mut context = format!(
            "You are {name}, a {role}{affiliation}.\n\n\
             Your role: {role}\n\n\
             IMPORTANT: This is part of an ongoing conversation. \
             Consider the full context of previous messages.\n",
            name = agent.name,
            role = agent.role,
        );

        let assigned = documents.for_agent(&agent.id);
        if !assigned.is_empty() {
            context.push_str("\nRelevant documents:\n");
            let lines: Vec<String> = assigned
                .iter()
                .map(|doc| format!("- {}: {}", doc.name, doc.content))
                .collect();
            context.push_str(&lines.join("\n"));
        }

        context
    }

    /// Render `turns` from the point of view of `perspective`
    pub fn history(
        &self,
        turns: &[Turn],
        perspective: &AgentId,
        mode: HistoryMode<'_>,
    ) -> Vec<ChatMessage> {
        turns
            .iter()
            .filter_map(|turn| self.render(turn, perspective, mode))
            .collect()
    }

    fn render(
        &self,
        turn: &Turn,
        perspective: &AgentId,
        mode: HistoryMode<'_>,
    ) -> Option<ChatMessage> {
        match (&turn.speaker, mode) {
            (Speaker::System, _) => None,
            (Speaker::Agent(id), _) if id == perspective => {
                Some(ChatMessage::assistant(turn.content.clone()))
            }
            (Speaker::Agent(_), HistoryMode::Conversation)
            | (Speaker::Human, HistoryMode::Conversation) => Some(labelled(turn)),
            (Speaker::Agent(id), HistoryMode::Autonomous { partner }) => {
                (id == partner).then(|| labelled(turn))
            }
            (Speaker::Human, HistoryMode::Autonomous { .. }) => {
                (turn.intervention && self.include_interventions).then(|| {
                    ChatMessage::user(format!(
                        "[{} intervened]: {}",
                        turn.speaker_name, turn.content
                    ))
                })
            }
        }
    }
}

impl Default for ContextBuilder {
    fn default() -> Self {
        Self::new(None, true)
    }
}

fn labelled(turn: &Turn) -> ChatMessage {
    ChatMessage::user(format!("[{}]: {}", turn.speaker_name, turn.content))
}
