//! Human-driven turns: group chat and private chat

use tracing::{info, warn};

use super::{required_text, Orchestrator};
use crate::context::{prompts, HistoryMode};
use crate::error::DialogResult;
use crate::routing::{BroadcastStrategy, RoutingStrategy};
use crate::transcript::TranscriptFilter;
use crate::value_objects::{Agent, AgentId, Turn};

impl Orchestrator {
    /// Post a human message to the group; every enabled agent answers in order
    ///
    /// One agent failing only costs its own answer: a notice is appended and
    /// the remaining agents still reply. Returns the replies that were appended.
    pub async fn send_group(&self, text: &str) -> DialogResult<Vec<Turn>> {
        let text = required_text(text)?;
        let _turn = self.inner.turn_lock.lock().await;

        let human = Turn::human(self.inner.config.human_name.clone(), text);
        self.inner.transcript.append(human.clone()).await?;

        let targets = {
            let registry = self.inner.registry.read().await;
            BroadcastStrategy.route(&registry, &[])?
        };
        info!(agents = targets.targets.len(), "group message dispatched");

        let mut replies = Vec::with_capacity(targets.targets.len());
        for (index, agent_id) in targets.targets.iter().enumerate() {
            if index > 0 {
                tokio::time::sleep(self.inner.config.group_pacing()).await;
            }

            let agent = match self.agent(agent_id).await {
                Some(agent) => agent,
                None => continue,
            };
            match self.group_reply(&agent, &human).await {
                Ok(turn) => replies.push(turn),
                Err(err) => {
                    warn!(agent = %agent.id, error = %err, "group reply failed");
                    self.notice(format!("Error from {}: {err}", agent.name)).await;
                }
            }
        }

        Ok(replies)
    }

    /// Talk to one agent; no other agent can see the exchange
    ///
    /// Disabled agents can still be addressed privately. Returns `None` when
    /// the model call failed; the failure is recorded as a private notice.
    pub async fn send_private(&self, agent_id: &AgentId, text: &str) -> DialogResult<Option<Turn>> {
        let text = required_text(text)?;
        let _turn = self.inner.turn_lock.lock().await;

        let agent = self.inner.registry.read().await.require(agent_id)?.clone();

        let human = Turn::human(self.inner.config.human_name.clone(), text).private_to(&agent.id);
        self.inner.transcript.append(human.clone()).await?;

        let filter = TranscriptFilter::Private(agent.id.clone());
        let view = self.inner.transcript.view_excluding(&filter, human.id).await;
        let history = self
            .inner
            .context
            .history(&view, &agent.id, HistoryMode::Conversation);
        let context = self.context_for(&agent).await;
        let prompt = prompts::private(&context, &human.speaker_name, &human.content);

        match self.call_agent(&agent, &prompt, &history).await {
            Ok(reply) => {
                let turn = Turn::agent(&agent, reply).private_to(&agent.id);
                self.inner.transcript.append(turn.clone()).await?;
                Ok(Some(turn))
            }
            Err(err) => {
                warn!(agent = %agent.id, error = %err, "private reply failed");
                self.append_notice(
                    Turn::system(format!("Error from {}: {err}", agent.name)).private_to(&agent.id),
                )
                .await;
                Ok(None)
            }
        }
    }

    async fn group_reply(&self, agent: &Agent, human: &Turn) -> DialogResult<Turn> {
        let filter = TranscriptFilter::VisibleTo(agent.id.clone());
        let view = self.inner.transcript.view_excluding(&filter, human.id).await;
        let history = self
            .inner
            .context
            .history(&view, &agent.id, HistoryMode::Conversation);
        let context = self.context_for(agent).await;
        let prompt = prompts::group(&context, &human.speaker_name, &human.content);

        let reply = self.call_agent(agent, &prompt, &history).await?;
        let turn = Turn::agent(agent, reply);
        self.inner.transcript.append(turn.clone()).await?;
        Ok(turn)
    }

    async fn agent(&self, id: &AgentId) -> Option<Agent> {
        self.inner.registry.read().await.get(id).cloned()
    }
}
