//! Operator command handler implementation

use serde::Serialize;
use tracing::debug;

use crate::aggregate::SessionSnapshot;
use crate::commands::OperatorCommand;
use crate::error::DialogResult;
use crate::orchestrator::Orchestrator;
use crate::registry::AgentUpdate;
use crate::value_objects::{Agent, AgentId, Document, DocumentAssignment, DocumentId, Turn};

/// What a handled command produced
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CommandOutcome {
    /// Session state after a dialogue command
    Session { snapshot: SessionSnapshot },
    /// Turns appended by the command
    Turns { turns: Vec<Turn> },
    Agent { agent: Agent },
    Document { document: Document },
}

/// Handler for operator commands
#[derive(Clone)]
pub struct DialogCommandHandler {
    orchestrator: Orchestrator,
}

impl DialogCommandHandler {
    /// Create a new handler over `orchestrator`
    pub fn new(orchestrator: Orchestrator) -> Self {
        Self { orchestrator }
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    /// Route a command to the orchestrator, registry or document store
    pub async fn handle(&self, command: OperatorCommand) -> DialogResult<CommandOutcome> {
        debug!(command = command.name(), "handling operator command");

        match command {
            OperatorCommand::StartDialog => {
                self.orchestrator.start().await?;
                self.session().await
            }
            OperatorCommand::ContinueDialog => {
                self.orchestrator.continue_dialog().await;
                self.session().await
            }
            OperatorCommand::PauseDialog => {
                self.orchestrator.pause().await?;
                self.session().await
            }
            OperatorCommand::ResumeDialog => {
                self.orchestrator.resume().await?;
                self.session().await
            }
            OperatorCommand::TogglePause => {
                self.orchestrator.toggle_pause().await?;
                self.session().await
            }
            OperatorCommand::ToggleAutoMode => {
                self.orchestrator.toggle_auto_mode().await?;
                self.session().await
            }
            OperatorCommand::ResumeAfterIntervention => {
                self.orchestrator.resume_after_intervention().await?;
                self.session().await
            }
            OperatorCommand::StopDialog => {
                self.orchestrator.stop().await;
                self.session().await
            }
            OperatorCommand::Intervene { text } => {
                let turn = self.orchestrator.intervene(&text).await?;
                Ok(CommandOutcome::Turns { turns: vec![turn] })
            }
            OperatorCommand::SendGroupMessage { text } => {
                let turns = self.orchestrator.send_group(&text).await?;
                Ok(CommandOutcome::Turns { turns })
            }
            OperatorCommand::SendPrivateMessage { agent, text } => {
                let reply = self.orchestrator.send_private(&agent, &text).await?;
                Ok(CommandOutcome::Turns {
                    turns: reply.into_iter().collect(),
                })
            }
            OperatorCommand::UpdateAgent { agent, update } => {
                self.handle_update_agent(&agent, update).await
            }
            OperatorCommand::SetAgentEnabled { agent, enabled } => {
                let update = AgentUpdate {
                    enabled: Some(enabled),
                    ..AgentUpdate::default()
                };
                self.handle_update_agent(&agent, update).await
            }
            OperatorCommand::UploadDocument { name, content } => {
                let document = self
                    .orchestrator
                    .documents()
                    .write()
                    .await
                    .upload(name, &content);
                Ok(CommandOutcome::Document { document })
            }
            OperatorCommand::AssignDocument {
                document,
                assignment,
            } => self.handle_assign_document(document, assignment).await,
            OperatorCommand::RemoveDocument { document } => {
                let document = self.orchestrator.documents().write().await.remove(document)?;
                Ok(CommandOutcome::Document { document })
            }
        }
    }

    /// Handle UpdateAgent command
    async fn handle_update_agent(
        &self,
        agent: &AgentId,
        update: AgentUpdate,
    ) -> DialogResult<CommandOutcome> {
        let agent = self.orchestrator.registry().write().await.update(agent, update)?;
        Ok(CommandOutcome::Agent { agent })
    }

    /// Handle AssignDocument command
    async fn handle_assign_document(
        &self,
        id: DocumentId,
        assignment: DocumentAssignment,
    ) -> DialogResult<CommandOutcome> {
        if let DocumentAssignment::Agent(agent) = &assignment {
            self.orchestrator.registry().read().await.require(agent)?;
        }

        let document = self
            .orchestrator
            .documents()
            .write()
            .await
            .assign(id, assignment)?;
        Ok(CommandOutcome::Document { document })
    }

    async fn session(&self) -> DialogResult<CommandOutcome> {
        Ok(CommandOutcome::Session {
            snapshot: self.orchestrator.snapshot().await,
        })
    }
}
