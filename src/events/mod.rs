//! Dialog events published to observers (UI, logs)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::aggregate::SessionSnapshot;
use crate::value_objects::Turn;

/// A turn was appended to the transcript
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnAppended {
    pub turn: Turn,
    /// Zero-based position in the transcript
    pub position: usize,
}

/// The conversation session changed state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionChanged {
    pub snapshot: SessionSnapshot,
    pub changed_at: DateTime<Utc>,
}

/// A model call started or finished
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadingChanged {
    pub loading: bool,
}

/// Enum wrapper for dialog events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DialogEvent {
    TurnAppended(TurnAppended),
    SessionChanged(SessionChanged),
    LoadingChanged(LoadingChanged),
}

impl DialogEvent {
    pub fn subject(&self) -> &'static str {
        match self {
            DialogEvent::TurnAppended(_) => "dialog.turn.appended.v1",
            DialogEvent::SessionChanged(_) => "dialog.session.changed.v1",
            DialogEvent::LoadingChanged(_) => "dialog.loading.changed.v1",
        }
    }

    pub fn event_type(&self) -> &'static str {
        match self {
            DialogEvent::TurnAppended(_) => "TurnAppended",
            DialogEvent::SessionChanged(_) => "SessionChanged",
            DialogEvent::LoadingChanged(_) => "LoadingChanged",
        }
    }
}

/// Fan-out of dialog events to any number of observers
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<DialogEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DialogEvent> {
        self.sender.subscribe()
    }

    /// Publish to current subscribers; with none, the event is simply not observed
    pub fn publish(&self, event: DialogEvent) {
        let _ = self.sender.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
