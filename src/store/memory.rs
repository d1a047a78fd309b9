//! In-process document store
//!
//! Keeps documents in memory and hands out a small mock roster of
//! collaborators per document. Used by the demo binary and by tests.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use uuid::Uuid;

use super::{DocumentStore, StoreError};
use crate::core::document::{Collaborator, Document, DocumentId, DocumentUpdate, ShareLink, UNTITLED};

const MOCK_USERS: [(u32, &str, &str); 4] = [
    (1, "Alice Johnson", "#FF6B6B"),
    (2, "Bob Smith", "#4ECDC4"),
    (3, "Charlie Brown", "#45B7D1"),
    (4, "Diana Prince", "#96CEB4"),
];

#[derive(Debug, Default)]
struct StoreState {
    /// Insertion ordered
    documents: Vec<Document>,
    collaborators: Vec<(DocumentId, Vec<Collaborator>)>,
    created: usize,
    polls: usize,
}

impl StoreState {
    fn document_mut(&mut self, id: &str) -> Result<&mut Document, StoreError> {
        self.documents
            .iter_mut()
            .find(|d| d.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    fn roster_mut(&mut self, id: &str) -> Option<&mut Vec<Collaborator>> {
        self.collaborators
            .iter_mut()
            .find(|(doc_id, _)| doc_id == id)
            .map(|(_, roster)| roster)
    }
}

/// Document store living in process memory
#[derive(Debug)]
pub struct InMemoryStore {
    base_url: String,
    state: Mutex<StoreState>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new("http://localhost:5000")
    }
}

impl InMemoryStore {
    /// Create an empty store issuing share links under `base_url`
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            state: Mutex::new(StoreState::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn now() -> f64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or_default()
    }

    /// Pick one to three mock users, rotating through the roster
    fn initial_roster(seed: usize) -> Vec<Collaborator> {
        let count = seed % 3 + 1;
        (0..count)
            .map(|i| {
                let (id, name, color) = MOCK_USERS[(seed + i) % MOCK_USERS.len()];
                Collaborator::new(id, name, color)
            })
            .collect()
    }
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn list(&self) -> Result<Vec<Document>, StoreError> {
        let state = self.state();
        Ok(state
            .documents
            .iter()
            .map(|doc| {
                let mut doc = doc.clone();
                doc.collaborators = state
                    .collaborators
                    .iter()
                    .find(|(id, _)| *id == doc.id)
                    .map(|(_, roster)| roster.len())
                    .unwrap_or(0);
                doc
            })
            .collect())
    }

    async fn create(&self, title: &str) -> Result<Document, StoreError> {
        let title = if title.trim().is_empty() { UNTITLED } else { title };
        let mut doc = Document::new(Uuid::new_v4().to_string(), title, Self::now());

        let mut state = self.state();
        let roster = Self::initial_roster(state.created);
        state.created += 1;
        doc.collaborators = roster.len();
        state.collaborators.push((doc.id.clone(), roster));
        state.documents.push(doc.clone());

        tracing::debug!("Created document {}", doc.id);
        Ok(doc)
    }

    async fn get(&self, id: &str) -> Result<Document, StoreError> {
        let mut state = self.state();
        let count = state.roster_mut(id).map(|r| r.len()).unwrap_or(0);
        let doc = state.document_mut(id)?;
        doc.collaborators = count;
        Ok(doc.clone())
    }

    async fn update(&self, id: &str, update: DocumentUpdate) -> Result<Document, StoreError> {
        let mut state = self.state();
        let doc = state.document_mut(id)?;
        if let Some(title) = update.title {
            doc.title = title;
        }
        if let Some(content) = update.content {
            doc.content = content;
        }
        doc.updated_at = Self::now();
        Ok(doc.clone())
    }

    async fn remove(&self, id: &str) -> Result<(), StoreError> {
        let mut state = self.state();
        let before = state.documents.len();
        state.documents.retain(|d| d.id != id);
        if state.documents.len() == before {
            return Err(StoreError::NotFound(id.to_string()));
        }
        state.collaborators.retain(|(doc_id, _)| doc_id != id);
        Ok(())
    }

    async fn list_collaborators(&self, id: &str) -> Result<Vec<Collaborator>, StoreError> {
        let mut state = self.state();
        let content_len = state.document_mut(id)?.content.chars().count();
        state.polls += 1;
        let poll = state.polls;

        let Some(roster) = state.roster_mut(id) else {
            return Ok(Vec::new());
        };
        // Simulated activity: presence flips between polls
        for (i, collaborator) in roster.iter_mut().enumerate() {
            collaborator.active = (poll + i) % 2 == 0;
            collaborator.cursor_position = collaborator
                .active
                .then(|| (poll * 7 + i) % (content_len + 1));
        }
        Ok(roster.clone())
    }

    async fn create_share_link(&self, id: &str) -> Result<ShareLink, StoreError> {
        self.state().document_mut(id)?;
        Ok(ShareLink {
            url: format!("{}/document/{}", self.base_url, id),
            document_id: id.to_string(),
        })
    }
}
