//! Document store - uploaded reference snippets and their assignment

use chrono::Utc;
use tracing::info;

use crate::error::{DialogError, DialogResult};
use crate::value_objects::{AgentId, Document, DocumentAssignment, DocumentId};

/// Uploaded documents in upload order
#[derive(Debug, Clone)]
pub struct DocumentStore {
    documents: Vec<Document>,
    preview_chars: usize,
}

impl DocumentStore {
    pub fn new(preview_chars: usize) -> Self {
        Self {
            documents: Vec::new(),
            preview_chars,
        }
    }

    /// Store a bounded preview of `raw`, shared with all agents
    pub fn upload(&mut self, name: impl Into<String>, raw: &str) -> Document {
        let document = Document {
            id: DocumentId::new(),
            name: name.into(),
            content: preview(raw, self.preview_chars),
            assigned_to: DocumentAssignment::All,
            uploaded_at: Utc::now(),
        };

        info!(document = %document.id, name = %document.name, "uploaded document");
        self.documents.push(document.clone());
        document
    }

    /// Reassign a document and return it
    pub fn assign(
        &mut self,
        id: DocumentId,
        assignment: DocumentAssignment,
    ) -> DialogResult<Document> {
        let document = self
            .documents
            .iter_mut()
            .find(|doc| doc.id == id)
            .ok_or(DialogError::UnknownDocument(id))?;
        document.assigned_to = assignment;
        Ok(document.clone())
    }

    /// Remove a document on explicit operator request
    pub fn remove(&mut self, id: DocumentId) -> DialogResult<Document> {
        let index = self
            .documents
            .iter()
            .position(|doc| doc.id == id)
            .ok_or(DialogError::UnknownDocument(id))?;
        Ok(self.documents.remove(index))
    }

    pub fn get(&self, id: DocumentId) -> Option<&Document> {
        self.documents.iter().find(|doc| doc.id == id)
    }

    /// Documents visible to one agent, in upload order
    pub fn for_agent(&self, agent: &AgentId) -> Vec<&Document> {
        self.documents
            .iter()
            .filter(|doc| doc.assigned_to.includes(agent))
            .collect()
    }

    pub fn all(&self) -> &[Document] {
        &self.documents
    }
}

impl Default for DocumentStore {
    fn default() -> Self {
        Self::new(500)
    }
}

fn preview(raw: &str, limit: usize) -> String {
    match raw.char_indices().nth(limit) {
        Some((end, _)) => format!("{}...", &raw[..end]),
        None => raw.to_string(),
    }
}
