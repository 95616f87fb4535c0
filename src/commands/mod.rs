//! Operator commands

use serde::{Deserialize, Serialize};

use crate::registry::AgentUpdate;
use crate::value_objects::{AgentId, DocumentAssignment, DocumentId};

/// Everything the human operator can ask for
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum OperatorCommand {
    /// Start the autonomous dialogue
    StartDialog,
    /// Run one autonomous step now
    ContinueDialog,
    PauseDialog,
    ResumeDialog,
    TogglePause,
    ToggleAutoMode,
    /// Manual back to auto after the human had the floor
    ResumeAfterIntervention,
    StopDialog,
    /// Human turn injected into the running dialogue
    Intervene { text: String },
    /// Message answered by every enabled agent
    SendGroupMessage { text: String },
    /// Message answered by one agent only
    SendPrivateMessage { agent: AgentId, text: String },
    UpdateAgent { agent: AgentId, update: AgentUpdate },
    SetAgentEnabled { agent: AgentId, enabled: bool },
    UploadDocument { name: String, content: String },
    AssignDocument {
        document: DocumentId,
        assignment: DocumentAssignment,
    },
    RemoveDocument { document: DocumentId },
}

impl OperatorCommand {
    pub fn name(&self) -> &'static str {
        match self {
            OperatorCommand::StartDialog => "start_dialog",
            OperatorCommand::ContinueDialog => "continue_dialog",
            OperatorCommand::PauseDialog => "pause_dialog",
            OperatorCommand::ResumeDialog => "resume_dialog",
            OperatorCommand::TogglePause => "toggle_pause",
            OperatorCommand::ToggleAutoMode => "toggle_auto_mode",
            OperatorCommand::ResumeAfterIntervention => "resume_after_intervention",
            OperatorCommand::StopDialog => "stop_dialog",
            OperatorCommand::Intervene { .. } => "intervene",
            OperatorCommand::SendGroupMessage { .. } => "send_group_message",
            OperatorCommand::SendPrivateMessage { .. } => "send_private_message",
            OperatorCommand::UpdateAgent { .. } => "update_agent",
            OperatorCommand::SetAgentEnabled { .. } => "set_agent_enabled",
            OperatorCommand::UploadDocument { .. } => "upload_document",
            OperatorCommand::AssignDocument { .. } => "assign_document",
            OperatorCommand::RemoveDocument { .. } => "remove_document",
        }
    }
}
