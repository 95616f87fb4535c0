//! Transcript - the ordered, append-only log of turns
//!
//! Every chat view (group, private, autonomous) is a filter over this single
//! sequence. Turns are never edited, removed or reordered.

use tokio::sync::RwLock;
use tracing::debug;

use crate::error::{DialogError, DialogResult};
use crate::events::{DialogEvent, EventBus, TurnAppended};
use crate::value_objects::{AgentId, Speaker, Turn, TurnId, Visibility};

/// Selection of turns for one view
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscriptFilter {
    /// Every turn, including system notices and all private chats
    All,
    /// Public turns plus the given agent's private chat
    VisibleTo(AgentId),
    /// The human and one agent, never any other agent
    Private(AgentId),
    /// Public turns only
    Autonomous,
}

impl TranscriptFilter {
    pub fn matches(&self, turn: &Turn) -> bool {
        match self {
            TranscriptFilter::All => true,
            TranscriptFilter::VisibleTo(agent) => visible_to(turn, agent),
            TranscriptFilter::Private(agent) => {
                let pair = match &turn.speaker {
                    Speaker::Human => true,
                    Speaker::Agent(id) => id == agent,
                    Speaker::System => false,
                };
                pair && visible_to(turn, agent)
            }
            TranscriptFilter::Autonomous => turn.is_public(),
        }
    }
}

fn visible_to(turn: &Turn, agent: &AgentId) -> bool {
    match &turn.visibility {
        Visibility::Everyone => true,
        Visibility::Private(owner) => owner == agent,
    }
}

/// Shared append-only turn log
#[derive(Debug)]
pub struct Transcript {
    turns: RwLock<Vec<Turn>>,
    events: EventBus,
}

impl Transcript {
    pub fn new(events: EventBus) -> Self {
        Self {
            turns: RwLock::new(Vec::new()),
            events,
        }
    }

    /// Append a turn and notify observers
    pub async fn append(&self, turn: Turn) -> DialogResult<()> {
        if turn.content.trim().is_empty() {
            return Err(DialogError::Validation(format!(
                "turn from {} has no content",
                turn.speaker_name
            )));
        }

        let position = {
            let mut turns = self.turns.write().await;
            if turns.iter().any(|existing| existing.id == turn.id) {
                return Err(DialogError::Validation(
                    "turn was already appended".to_string(),
                ));
            }
            turns.push(turn.clone());
            turns.len() - 1
        };

        debug!(position, speaker = %turn.speaker_name, "turn appended");
        self.events
            .publish(DialogEvent::TurnAppended(TurnAppended { turn, position }));
        Ok(())
    }

    /// Ordered turns matching `filter`
    pub async fn view(&self, filter: &TranscriptFilter) -> Vec<Turn> {
        self.turns
            .read()
            .await
            .iter()
            .filter(|turn| filter.matches(turn))
            .cloned()
            .collect()
    }

    /// Ordered turns matching `filter`, leaving out one turn
    pub async fn view_excluding(&self, filter: &TranscriptFilter, excluded: TurnId) -> Vec<Turn> {
        self.turns
            .read()
            .await
            .iter()
            .filter(|turn| turn.id != excluded && filter.matches(turn))
            .cloned()
            .collect()
    }

    pub async fn last(&self) -> Option<Turn> {
        self.turns.read().await.last().cloned()
    }

    pub async fn len(&self) -> usize {
        self.turns.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.turns.read().await.is_empty()
    }
}

impl Default for Transcript {
    fn default() -> Self {
        Self::new(EventBus::default())
    }
}
