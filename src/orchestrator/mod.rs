//! Conversation orchestrator
//!
//! Owns the [`ConversationSession`] and drives every agent turn: the
//! autonomous dialogue (start, scheduled continuations, pause, auto/manual,
//! intervention, stop) and the human-driven group and private chats in
//! [`dispatch`].
//!
//! Concurrency rules:
//! - `turn_lock` serializes everything that calls a model, so two agent turns
//!   never run at once
//! - `intervene`, `pause` and `stop` never take `turn_lock` and can act while a
//!   model call is outstanding
//! - on the autonomous paths (start, continuations, intervention, notices
//!   about the dialogue) the session mutex is taken before the transcript
//!   write; group and private chat append under `turn_lock` alone
//! - a continuation re-checks the session generation and pause flag before it
//!   appends, so replies resolving after stop or pause are dropped

mod dispatch;

use chrono::Utc;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::aggregate::{
    ConversationSession, FailureOutcome, PendingContinuation, SessionSnapshot, SessionState,
    TurnOutcome,
};
use crate::config::DialogConfig;
use crate::context::{prompts, ContextBuilder, HistoryMode};
use crate::documents::DocumentStore;
use crate::error::{DialogError, DialogResult};
use crate::events::{DialogEvent, EventBus, LoadingChanged, SessionChanged};
use crate::gateway::ModelGateway;
use crate::registry::AgentRegistry;
use crate::routing::AlternatingStrategy;
use crate::transcript::{Transcript, TranscriptFilter};
use crate::value_objects::{Agent, AgentId, ChatMessage, Speaker, Turn};

type Continuation = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Drives the conversation between the human and the agents
#[derive(Clone)]
pub struct Orchestrator {
    inner: Arc<Inner>,
}

struct Inner {
    config: DialogConfig,
    gateway: Arc<dyn ModelGateway>,
    registry: RwLock<AgentRegistry>,
    documents: RwLock<DocumentStore>,
    transcript: Transcript,
    events: EventBus,
    context: ContextBuilder,
    session: Mutex<ConversationSession>,
    turn_lock: Mutex<()>,
    loading: AtomicBool,
    continuation_ids: AtomicU64,
}

/// Everything needed to issue one autonomous turn
struct AutonomousTurn {
    speaker: Agent,
    prompt: String,
    history: Vec<ChatMessage>,
    /// Length of the public transcript the prompt was built from
    planned_through: usize,
}

/// Sets the loading indicator for the lifetime of a model call
struct LoadingGuard<'a> {
    inner: &'a Inner,
}

impl<'a> LoadingGuard<'a> {
    fn new(inner: &'a Inner) -> Self {
        inner.loading.store(true, Ordering::SeqCst);
        inner
            .events
            .publish(DialogEvent::LoadingChanged(LoadingChanged { loading: true }));
        Self { inner }
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.inner.loading.store(false, Ordering::SeqCst);
        self.inner
            .events
            .publish(DialogEvent::LoadingChanged(LoadingChanged { loading: false }));
    }
}

impl Orchestrator {
    /// Orchestrator over the configured roster
    pub fn new(config: DialogConfig, gateway: Arc<dyn ModelGateway>) -> DialogResult<Self> {
        let registry = AgentRegistry::with_agents(config.roster())?;
        Self::with_registry(config, registry, gateway)
    }

    pub fn with_registry(
        config: DialogConfig,
        registry: AgentRegistry,
        gateway: Arc<dyn ModelGateway>,
    ) -> DialogResult<Self> {
        config.validate()?;

        let events = EventBus::default();
        let inner = Inner {
            gateway,
            registry: RwLock::new(registry),
            documents: RwLock::new(DocumentStore::new(config.document_preview_chars)),
            transcript: Transcript::new(events.clone()),
            events,
            context: ContextBuilder::from_config(&config),
            session: Mutex::new(ConversationSession::new(
                config.turn_limit,
                config.max_consecutive_failures,
            )),
            turn_lock: Mutex::new(()),
            loading: AtomicBool::new(false),
            continuation_ids: AtomicU64::new(0),
            config,
        };

        Ok(Self {
            inner: Arc::new(inner),
        })
    }

    pub fn config(&self) -> &DialogConfig {
        &self.inner.config
    }

    pub fn registry(&self) -> &RwLock<AgentRegistry> {
        &self.inner.registry
    }

    pub fn documents(&self) -> &RwLock<DocumentStore> {
        &self.inner.documents
    }

    pub fn transcript(&self) -> &Transcript {
        &self.inner.transcript
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DialogEvent> {
        self.inner.events.subscribe()
    }

    /// A model call is in flight
    pub fn is_loading(&self) -> bool {
        self.inner.loading.load(Ordering::SeqCst)
    }

    pub async fn state(&self) -> SessionState {
        self.inner.session.lock().await.state()
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        self.inner.session.lock().await.snapshot()
    }

    /// Start the autonomous dialogue between the first two enabled agents
    ///
    /// With fewer than two enabled agents a notice is appended and the
    /// validation error is returned. A failed opening call leaves the session
    /// active with a notice in the transcript.
    pub async fn start(&self) -> DialogResult<()> {
        let _turn = self.inner.turn_lock.lock().await;

        let pair = {
            let registry = self.inner.registry.read().await;
            AlternatingStrategy::from_registry(&registry).and_then(|pair| {
                let opener = registry.require(pair.opener())?.clone();
                let responder = registry.require(pair.responder())?.clone();
                Ok((pair, opener, responder))
            })
        };
        let (participants, opener, responder) = match pair {
            Ok(pair) => pair,
            Err(err) => {
                warn!(error = %err, "cannot start autonomous dialogue");
                self.notice("Please enable at least 2 AI agents to start an AI-to-AI conversation.")
                    .await;
                return Err(err);
            }
        };

        let generation = {
            let mut session = self.inner.session.lock().await;
            let generation = session.begin(participants);
            let earlier = self.inner.transcript.view(&TranscriptFilter::Autonomous).await;
            session.mark_addressed(earlier.len());
            self.publish_session(&session);
            generation
        };
        info!(
            opener = %opener.id,
            responder = %responder.id,
            generation,
            "autonomous dialogue started"
        );

        let context = self.context_for(&opener).await;
        let prompt = prompts::opening(&context, &opener, &responder, &self.inner.config.topic);
        let result = self.call_agent(&opener, &prompt, &[]).await;

        let mut session = self.inner.session.lock().await;
        if !session.is_active() || session.generation() != generation {
            debug!(generation, "discarding opening turn of a superseded dialogue");
            return Ok(());
        }

        match result {
            Ok(reply) => {
                let outcome = session.record_opening();
                self.commit_autonomous(&mut session, &opener, reply, outcome)
                    .await;
            }
            Err(err) => {
                warn!(agent = %opener.id, error = %err, "opening turn failed");
                self.notice(format!("Error starting: {err}")).await;
                self.record_autonomous_failure(&mut session).await;
            }
        }
        self.publish_session(&session);
        Ok(())
    }

    /// Run one autonomous step now
    ///
    /// Does nothing unless the session is Active-Auto and unpaused. Returns
    /// whether a step ran. Any pending scheduled continuation is cancelled
    /// first; on success the step schedules its own.
    pub async fn continue_dialog(&self) -> bool {
        let _turn = self.inner.turn_lock.lock().await;
        let generation = {
            let mut session = self.inner.session.lock().await;
            session.cancel_pending();
            session.generation()
        };
        self.run_continuation(generation).await
    }

    /// Pause the dialogue; pausing twice is the same as pausing once
    pub async fn pause(&self) -> DialogResult<()> {
        let mut session = self.inner.session.lock().await;
        if session.is_paused() {
            return Ok(());
        }

        session.pause()?;
        info!(turn = session.turn_counter(), "autonomous dialogue paused");
        self.publish_session(&session);
        Ok(())
    }

    /// Clear the pause flag; in auto mode the next turn follows shortly
    pub async fn resume(&self) -> DialogResult<()> {
        let mut session = self.inner.session.lock().await;
        let was_paused = session.resume()?;

        if was_paused {
            info!(turn = session.turn_counter(), "autonomous dialogue resumed");
            if session.state() == SessionState::ActiveAuto {
                self.schedule(&mut session, self.inner.config.resume_delay());
            }
            self.publish_session(&session);
        }
        Ok(())
    }

    /// Pause if running, resume if paused; returns the new pause flag
    pub async fn toggle_pause(&self) -> DialogResult<bool> {
        let paused = self.inner.session.lock().await.is_paused();
        if paused {
            self.resume().await?;
        } else {
            self.pause().await?;
        }
        Ok(!paused)
    }

    /// Switch between auto and manual mode; returns the new auto flag
    pub async fn toggle_auto_mode(&self) -> DialogResult<bool> {
        let mut session = self.inner.session.lock().await;
        let auto_mode = !session.auto_mode();
        self.apply_auto_mode(&mut session, auto_mode).await?;
        Ok(auto_mode)
    }

    /// Back to auto mode after the human had the floor
    ///
    /// Returns false when the session was already in auto mode.
    pub async fn resume_after_intervention(&self) -> DialogResult<bool> {
        let mut session = self.inner.session.lock().await;
        if !session.is_active() {
            return Err(DialogError::InvalidStateTransition {
                from: session.state().to_string(),
                to: "Active-Auto".to_string(),
            });
        }
        if session.auto_mode() {
            return Ok(false);
        }

        self.apply_auto_mode(&mut session, true).await?;
        Ok(true)
    }

    /// Add a human turn to the running dialogue
    ///
    /// The schedule is left alone: the next continuation sees the human turn
    /// as the most recent one and answers it first.
    pub async fn intervene(&self, text: &str) -> DialogResult<Turn> {
        let text = required_text(text)?;

        let session = self.inner.session.lock().await;
        if !session.is_active() {
            return Err(DialogError::InvalidStateTransition {
                from: session.state().to_string(),
                to: "Intervention".to_string(),
            });
        }

        let turn = Turn::human(self.inner.config.human_name.clone(), text).as_intervention();
        self.inner.transcript.append(turn.clone()).await?;
        info!(state = %session.state(), turn = session.turn_counter(), "human intervened");
        Ok(turn)
    }

    /// End the dialogue and cancel the pending continuation
    pub async fn stop(&self) {
        let mut session = self.inner.session.lock().await;
        if !session.is_active() {
            return;
        }

        let turns = session.turn_counter();
        session.end();
        info!(turns, "autonomous dialogue stopped");
        self.publish_session(&session);
    }

    async fn apply_auto_mode(
        &self,
        session: &mut ConversationSession,
        auto_mode: bool,
    ) -> DialogResult<()> {
        let extended = session.set_auto_mode(auto_mode)?;

        if auto_mode {
            if extended {
                info!(ceiling = session.turn_ceiling(), "turn ceiling extended");
            }
            if !session.is_paused() {
                self.notice("Auto mode resumed - AIs will continue conversing automatically")
                    .await;
                self.schedule(session, self.inner.config.auto_resume_delay());
            }
        } else {
            self.notice("Auto mode paused - AIs will wait for your intervention")
                .await;
        }

        info!(auto_mode, "auto mode changed");
        self.publish_session(session);
        Ok(())
    }

    /// Spawn a continuation after `delay`, replacing any pending one
    fn schedule(&self, session: &mut ConversationSession, delay: Duration) {
        let id = self.inner.continuation_ids.fetch_add(1, Ordering::Relaxed) + 1;
        let generation = session.generation();
        let orchestrator = self.clone();

        let continuation: Continuation = Box::pin(async move {
            tokio::time::sleep(delay).await;
            orchestrator.fire(id, generation).await;
        });
        session.replace_pending(PendingContinuation::new(id, tokio::spawn(continuation)));
        debug!(continuation = id, delay_ms = delay.as_millis() as u64, "continuation scheduled");
    }

    async fn fire(&self, id: u64, generation: u64) {
        let _turn = self.inner.turn_lock.lock().await;
        if !self.inner.session.lock().await.take_pending(id) {
            debug!(continuation = id, "continuation superseded");
            return;
        }
        self.run_continuation(generation).await;
    }

    async fn run_continuation(&self, generation: u64) -> bool {
        let (participants, addressed_through) = {
            let session = self.inner.session.lock().await;
            if session.state() != SessionState::ActiveAuto || !session.accepts(generation) {
                debug!(state = %session.state(), generation, "continuation skipped");
                return false;
            }
            match session.participants() {
                Some(participants) => (participants.clone(), session.addressed_through()),
                None => return false,
            }
        };

        let turn = match self
            .plan_autonomous_turn(&participants, addressed_through)
            .await
        {
            Ok(turn) => turn,
            Err(err) => {
                let mut session = self.inner.session.lock().await;
                if !session.accepts(generation) {
                    return false;
                }
                warn!(error = %err, "dialogue participant unavailable");
                self.notice(format!("Error: {err}")).await;
                if session.set_auto_mode(false).is_ok() {
                    self.notice("Auto mode paused - AIs will wait for your intervention")
                        .await;
                }
                self.publish_session(&session);
                return true;
            }
        };

        let result = self
            .call_agent(&turn.speaker, &turn.prompt, &turn.history)
            .await;

        let mut session = self.inner.session.lock().await;
        if !session.accepts(generation) {
            debug!(generation, agent = %turn.speaker.id, "discarding stale continuation result");
            return false;
        }

        match result {
            Ok(reply) => {
                session.mark_addressed(turn.planned_through);
                let outcome = session.record_turn();
                self.commit_autonomous(&mut session, &turn.speaker, reply, outcome)
                    .await;
            }
            Err(err) => {
                warn!(agent = %turn.speaker.id, error = %err, "autonomous turn failed");
                self.notice(format!("Error: {err}")).await;
                self.record_autonomous_failure(&mut session).await;
            }
        }

        self.publish_session(&session);
        true
    }

    /// Build the next autonomous turn
    ///
    /// A human turn past `addressed_through` has not been in front of any
    /// committed autonomous prompt yet and is answered first, even when an
    /// agent reply that was already in flight landed after it.
    async fn plan_autonomous_turn(
        &self,
        participants: &AlternatingStrategy,
        addressed_through: usize,
    ) -> DialogResult<AutonomousTurn> {
        let public = self.inner.transcript.view(&TranscriptFilter::Autonomous).await;
        let step = participants.alternation(&public);

        let (speaker, previous) = {
            let registry = self.inner.registry.read().await;
            (
                participant(&registry, &step.next)?,
                participant(&registry, &step.previous)?,
            )
        };

        let context = self.context_for(&speaker).await;
        let history = self.inner.context.history(
            &public,
            &speaker.id,
            HistoryMode::Autonomous {
                partner: &previous.id,
            },
        );

        let unanswered = public
            .get(addressed_through..)
            .unwrap_or(&[])
            .iter()
            .rev()
            .find(|turn| turn.speaker == Speaker::Human);
        let prompt = match unanswered {
            Some(turn) => prompts::intervention(
                &context,
                &previous,
                &self.inner.config.human_name,
                &turn.content,
            ),
            None => match public.iter().rev().find(|t| t.speaker.is_agent(&previous.id)) {
                Some(last) => prompts::reply(&context, &speaker, &previous, &last.content),
                None => prompts::opening(&context, &speaker, &previous, &self.inner.config.topic),
            },
        };

        Ok(AutonomousTurn {
            speaker,
            prompt,
            history,
            planned_through: public.len(),
        })
    }

    /// Append an autonomous reply and schedule or halt per `outcome`
    async fn commit_autonomous(
        &self,
        session: &mut ConversationSession,
        speaker: &Agent,
        reply: String,
        outcome: TurnOutcome,
    ) {
        let number = match outcome {
            TurnOutcome::Continue { turn } | TurnOutcome::LimitReached { turn } => turn,
        };
        let turn = Turn::agent(speaker, reply).with_dialogue_turn(number);
        if let Err(err) = self.inner.transcript.append(turn).await {
            warn!(agent = %speaker.id, error = %err, "autonomous turn rejected");
        }
        debug!(agent = %speaker.id, turn = number, "autonomous turn appended");

        match outcome {
            TurnOutcome::Continue { .. } => {
                if session.state() == SessionState::ActiveAuto {
                    self.schedule(session, self.inner.config.opening_delay());
                }
            }
            TurnOutcome::LimitReached { turn } => {
                info!(turn, "turn limit reached, switching to manual mode");
                self.notice(format!(
                    "AI conversation reached {turn} turns. \
                     Re-enable auto mode to continue or stop to end."
                ))
                .await;
            }
        }
    }

    async fn record_autonomous_failure(&self, session: &mut ConversationSession) {
        if let FailureOutcome::Tripped { consecutive } = session.record_failure() {
            warn!(consecutive, "too many consecutive failures, switching to manual mode");
            self.notice(format!(
                "Auto mode paused after {consecutive} consecutive failures - \
                 AIs will wait for your intervention"
            ))
            .await;
        }
    }

    /// Call the gateway with the per-call timeout and the loading indicator
    async fn call_agent(
        &self,
        agent: &Agent,
        prompt: &str,
        history: &[ChatMessage],
    ) -> DialogResult<String> {
        let _loading = LoadingGuard::new(&self.inner);
        let after = self.inner.config.call_timeout();

        let reply = tokio::time::timeout(after, self.inner.gateway.call(&agent.id, prompt, history))
            .await
            .map_err(|_| DialogError::Timeout {
                agent: agent.id.clone(),
                after,
            })??;

        if reply.trim().is_empty() {
            return Err(DialogError::MalformedResponse(format!(
                "{} returned an empty reply",
                agent.name
            )));
        }
        Ok(reply)
    }

    async fn context_for(&self, agent: &Agent) -> String {
        let documents = self.inner.documents.read().await;
        self.inner.context.context(agent, &documents)
    }

    /// Append a system notice; notices are never empty so failure is only logged
    async fn notice(&self, text: impl Into<String>) {
        self.append_notice(Turn::system(text)).await;
    }

    async fn append_notice(&self, turn: Turn) {
        if let Err(err) = self.inner.transcript.append(turn).await {
            warn!(error = %err, "system notice rejected");
        }
    }

    fn publish_session(&self, session: &ConversationSession) {
        self.inner
            .events
            .publish(DialogEvent::SessionChanged(SessionChanged {
                snapshot: session.snapshot(),
                changed_at: Utc::now(),
            }));
    }
}

/// A participant that is still registered and enabled
fn participant(registry: &AgentRegistry, id: &AgentId) -> DialogResult<Agent> {
    let agent = registry.require(id)?;
    if !agent.enabled {
        return Err(DialogError::Validation(format!(
            "{} is no longer enabled",
            agent.name
        )));
    }
    Ok(agent.clone())
}

fn required_text(text: &str) -> DialogResult<&str> {
    let text = text.trim();
    if text.is_empty() {
        return Err(DialogError::Validation("message must not be empty".to_string()));
    }
    Ok(text)
}
