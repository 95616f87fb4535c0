//! Conversation session aggregate - state of the autonomous dialogue
//!
//! The session tracks:
//! - Idle / active status and the two participants
//! - Pause flag and auto-vs-manual mode
//! - The turn counter and the ceiling it may reach
//! - The pending scheduled continuation, if any
//! - A generation number that changes on every start and stop, so a
//!   continuation that resolves late can tell it is stale

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::error::{DialogError, DialogResult};
use crate::routing::AlternatingStrategy;
use crate::value_objects::AgentId;

/// Observable state of the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionState {
    /// No autonomous dialogue
    Idle,
    /// Dialogue running and self-scheduling
    ActiveAuto,
    /// Dialogue running, waiting for explicit resumption
    ActiveManual,
    /// Dialogue paused by the operator
    ActivePaused,
}

impl SessionState {
    pub fn is_active(self) -> bool {
        self != SessionState::Idle
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SessionState::Idle => "Idle",
            SessionState::ActiveAuto => "Active-Auto",
            SessionState::ActiveManual => "Active-Manual",
            SessionState::ActivePaused => "Active-Paused",
        };
        f.write_str(label)
    }
}

/// Serializable view of the session for observers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub paused: bool,
    pub auto_mode: bool,
    pub turn_counter: u32,
    pub turn_ceiling: u32,
    pub participants: Option<(AgentId, AgentId)>,
    pub has_pending_continuation: bool,
}

/// A scheduled continuation that has not fired yet
#[derive(Debug)]
pub struct PendingContinuation {
    id: u64,
    handle: JoinHandle<()>,
}

impl PendingContinuation {
    pub fn new(id: u64, handle: JoinHandle<()>) -> Self {
        Self { id, handle }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    fn cancel(self) {
        debug!(continuation = self.id, "cancelling pending continuation");
        self.handle.abort();
    }
}

/// What recording an autonomous turn did to the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnOutcome {
    /// Counter advanced below the ceiling
    Continue { turn: u32 },
    /// Counter reached the ceiling; auto mode is now off
    LimitReached { turn: u32 },
}

/// What recording a failed autonomous turn did to the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureOutcome {
    Tolerated { consecutive: u32 },
    /// Too many failures in a row; auto mode is now off
    Tripped { consecutive: u32 },
}

/// Conversation session state machine
#[derive(Debug)]
pub struct ConversationSession {
    active: bool,
    paused: bool,
    auto_mode: bool,
    turn_counter: u32,
    turn_limit: u32,
    turn_ceiling: u32,
    participants: Option<AlternatingStrategy>,
    generation: u64,
    pending: Option<PendingContinuation>,
    consecutive_failures: u32,
    max_consecutive_failures: u32,
    addressed_through: usize,
}

impl ConversationSession {
    pub fn new(turn_limit: u32, max_consecutive_failures: u32) -> Self {
        Self {
            active: false,
            paused: false,
            auto_mode: true,
            turn_counter: 0,
            turn_limit,
            turn_ceiling: turn_limit,
            participants: None,
            generation: 0,
            pending: None,
            consecutive_failures: 0,
            max_consecutive_failures,
            addressed_through: 0,
        }
    }

    pub fn state(&self) -> SessionState {
        match (self.active, self.paused, self.auto_mode) {
            (false, _, _) => SessionState::Idle,
            (true, true, _) => SessionState::ActivePaused,
            (true, false, true) => SessionState::ActiveAuto,
            (true, false, false) => SessionState::ActiveManual,
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            state: self.state(),
            paused: self.paused,
            auto_mode: self.auto_mode,
            turn_counter: self.turn_counter,
            turn_ceiling: self.turn_ceiling,
            participants: self
                .participants
                .as_ref()
                .map(|p| (p.opener().clone(), p.responder().clone())),
            has_pending_continuation: self.pending.is_some(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn auto_mode(&self) -> bool {
        self.auto_mode
    }

    pub fn turn_counter(&self) -> u32 {
        self.turn_counter
    }

    pub fn turn_ceiling(&self) -> u32 {
        self.turn_ceiling
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn participants(&self) -> Option<&AlternatingStrategy> {
        self.participants.as_ref()
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn pending_id(&self) -> Option<u64> {
        self.pending.as_ref().map(PendingContinuation::id)
    }

    /// No further autonomous turn may be appended until the ceiling moves
    pub fn limit_reached(&self) -> bool {
        self.turn_counter >= self.turn_ceiling
    }

    /// Public turns already in front of an agent when a committed turn was planned
    ///
    /// Human turns at or past this position have not been answered yet.
    pub fn addressed_through(&self) -> usize {
        self.addressed_through
    }

    pub fn mark_addressed(&mut self, position: usize) {
        self.addressed_through = self.addressed_through.max(position);
    }

    /// Enter Active-Auto with fresh counters; returns the new generation
    pub fn begin(&mut self, participants: AlternatingStrategy) -> u64 {
        self.cancel_pending();
        self.active = true;
        self.paused = false;
        self.auto_mode = true;
        self.turn_counter = 0;
        self.turn_ceiling = self.turn_limit;
        self.consecutive_failures = 0;
        self.addressed_through = 0;
        self.participants = Some(participants);
        self.generation += 1;
        self.generation
    }

    /// Return to Idle, cancelling any pending continuation
    pub fn end(&mut self) {
        self.cancel_pending();
        self.active = false;
        self.paused = false;
        self.auto_mode = true;
        self.turn_counter = 0;
        self.turn_ceiling = self.turn_limit;
        self.consecutive_failures = 0;
        self.addressed_through = 0;
        self.participants = None;
        self.generation += 1;
    }

    /// Pause; pausing an already paused session changes nothing
    pub fn pause(&mut self) -> DialogResult<()> {
        self.require_active("Paused")?;
        self.cancel_pending();
        self.paused = true;
        Ok(())
    }

    /// Clear the pause flag; returns whether the session was paused
    pub fn resume(&mut self) -> DialogResult<bool> {
        self.require_active("Active")?;
        let was_paused = self.paused;
        self.paused = false;
        Ok(was_paused)
    }

    /// Switch auto mode on or off
    ///
    /// Turning auto mode on at the ceiling opens one more window of
    /// `turn_limit` turns. Returns whether the ceiling moved.
    pub fn set_auto_mode(&mut self, auto_mode: bool) -> DialogResult<bool> {
        self.require_active(if auto_mode { "Active-Auto" } else { "Active-Manual" })?;
        self.auto_mode = auto_mode;

        if !auto_mode {
            self.cancel_pending();
            return Ok(false);
        }

        if self.limit_reached() {
            self.turn_ceiling = self.turn_counter + self.turn_limit;
            return Ok(true);
        }
        Ok(false)
    }

    /// Whether a continuation started under `generation` may still append
    pub fn accepts(&self, generation: u64) -> bool {
        self.active && !self.paused && self.generation == generation && !self.limit_reached()
    }

    /// Record the opening turn of the dialogue
    pub fn record_opening(&mut self) -> TurnOutcome {
        self.turn_counter = 0;
        self.record_turn()
    }

    /// Record an autonomous agent turn
    pub fn record_turn(&mut self) -> TurnOutcome {
        self.turn_counter += 1;
        self.consecutive_failures = 0;
        let turn = self.turn_counter;

        if self.limit_reached() {
            self.auto_mode = false;
            self.cancel_pending();
            TurnOutcome::LimitReached { turn }
        } else {
            TurnOutcome::Continue { turn }
        }
    }

    /// Record a failed autonomous turn
    pub fn record_failure(&mut self) -> FailureOutcome {
        self.consecutive_failures += 1;
        let consecutive = self.consecutive_failures;

        if self.max_consecutive_failures > 0 && consecutive >= self.max_consecutive_failures {
            self.auto_mode = false;
            self.cancel_pending();
            FailureOutcome::Tripped { consecutive }
        } else {
            FailureOutcome::Tolerated { consecutive }
        }
    }

    /// Install a new pending continuation, cancelling any previous one
    pub fn replace_pending(&mut self, pending: PendingContinuation) {
        self.cancel_pending();
        self.pending = Some(pending);
    }

    /// Claim the pending continuation `id` as it fires
    ///
    /// Returns false when it was superseded or cancelled in the meantime.
    pub fn take_pending(&mut self, id: u64) -> bool {
        match &self.pending {
            Some(pending) if pending.id == id => {
                self.pending = None;
                true
            }
            _ => false,
        }
    }

    pub fn cancel_pending(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.cancel();
        }
    }

    fn require_active(&self, to: &str) -> DialogResult<()> {
        if self.active {
            Ok(())
        } else {
            Err(DialogError::InvalidStateTransition {
                from: self.state().to_string(),
                to: to.to_string(),
            })
        }
    }
}

impl Drop for ConversationSession {
    fn drop(&mut self) {
        self.cancel_pending();
    }
}
