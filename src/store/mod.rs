//! Document store interface
//!
//! The editing core never talks to the network directly. Everything that
//! persists or lists documents goes through [`DocumentStore`].

pub mod memory;
#[cfg(test)]
pub(crate) mod testing;

pub use memory::InMemoryStore;

use async_trait::async_trait;
use thiserror::Error;

use crate::core::document::{Collaborator, Document, DocumentId, DocumentUpdate, ShareLink};

/// Errors reported by a document store
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("document not found: {0}")]
    NotFound(DocumentId),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Reported by stores behind a network connection
    #[allow(dead_code)]
    #[error("store unavailable: {0}")]
    Transport(String),
}

/// Remote document persistence
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// All documents, without their content being interpreted
    async fn list(&self) -> Result<Vec<Document>, StoreError>;

    async fn create(&self, title: &str) -> Result<Document, StoreError>;

    async fn get(&self, id: &str) -> Result<Document, StoreError>;

    /// Apply a partial update and return the stored document
    async fn update(&self, id: &str, update: DocumentUpdate) -> Result<Document, StoreError>;

    async fn remove(&self, id: &str) -> Result<(), StoreError>;

    /// Collaborators currently reported for a document
    async fn list_collaborators(&self, id: &str) -> Result<Vec<Collaborator>, StoreError>;

    async fn create_share_link(&self, id: &str) -> Result<ShareLink, StoreError>;
}
