//! Instrumented store for tests

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use super::{DocumentStore, InMemoryStore, StoreError};
use crate::core::document::{Collaborator, Document, DocumentUpdate, ShareLink};

/// A store call with the (possibly paused) time it was issued at
#[derive(Debug, Clone)]
pub(crate) struct Call<T> {
    pub at: Instant,
    pub id: String,
    pub payload: T,
}

/// Wraps [`InMemoryStore`], recording updates and roster polls. Updates can
/// be slowed down and store calls made to fail.
pub(crate) struct RecordingStore {
    inner: InMemoryStore,
    update_delay: Duration,
    fail_gets: AtomicBool,
    fail_updates: AtomicBool,
    fail_polls: AtomicBool,
    active_updates: AtomicUsize,
    max_active_updates: AtomicUsize,
    updates: Mutex<Vec<Call<DocumentUpdate>>>,
    polls: Mutex<Vec<Call<()>>>,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self::with_update_delay(Duration::ZERO)
    }

    pub fn with_update_delay(update_delay: Duration) -> Self {
        Self {
            inner: InMemoryStore::default(),
            update_delay,
            fail_gets: AtomicBool::new(false),
            fail_updates: AtomicBool::new(false),
            fail_polls: AtomicBool::new(false),
            active_updates: AtomicUsize::new(0),
            max_active_updates: AtomicUsize::new(0),
            updates: Mutex::new(Vec::new()),
            polls: Mutex::new(Vec::new()),
        }
    }

    pub fn fail_gets(&self, fail: bool) {
        self.fail_gets.store(fail, Ordering::SeqCst);
    }

    pub fn fail_updates(&self, fail: bool) {
        self.fail_updates.store(fail, Ordering::SeqCst);
    }

    pub fn fail_polls(&self, fail: bool) {
        self.fail_polls.store(fail, Ordering::SeqCst);
    }

    pub fn updates(&self) -> Vec<Call<DocumentUpdate>> {
        self.updates.lock().unwrap().clone()
    }

    pub fn polls(&self) -> Vec<Call<()>> {
        self.polls.lock().unwrap().clone()
    }

    pub fn polls_for(&self, id: &str) -> usize {
        self.polls().iter().filter(|c| c.id == id).count()
    }

    pub fn max_active_updates(&self) -> usize {
        self.max_active_updates.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DocumentStore for RecordingStore {
    async fn list(&self) -> Result<Vec<Document>, StoreError> {
        self.inner.list().await
    }

    async fn create(&self, title: &str) -> Result<Document, StoreError> {
        self.inner.create(title).await
    }

    async fn get(&self, id: &str) -> Result<Document, StoreError> {
        if self.fail_gets.load(Ordering::SeqCst) {
            return Err(StoreError::Transport("connection refused".to_string()));
        }
        self.inner.get(id).await
    }

    async fn update(&self, id: &str, update: DocumentUpdate) -> Result<Document, StoreError> {
        self.updates.lock().unwrap().push(Call {
            at: Instant::now(),
            id: id.to_string(),
            payload: update.clone(),
        });
        let active = self.active_updates.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active_updates.fetch_max(active, Ordering::SeqCst);

        if !self.update_delay.is_zero() {
            tokio::time::sleep(self.update_delay).await;
        }
        self.active_updates.fetch_sub(1, Ordering::SeqCst);

        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(StoreError::Transport("connection reset".to_string()));
        }
        self.inner.update(id, update).await
    }

    async fn remove(&self, id: &str) -> Result<(), StoreError> {
        self.inner.remove(id).await
    }

    async fn list_collaborators(&self, id: &str) -> Result<Vec<Collaborator>, StoreError> {
        self.polls.lock().unwrap().push(Call {
            at: Instant::now(),
            id: id.to_string(),
            payload: (),
        });
        if self.fail_polls.load(Ordering::SeqCst) {
            return Err(StoreError::Transport("timed out".to_string()));
        }
        self.inner.list_collaborators(id).await
    }

    async fn create_share_link(&self, id: &str) -> Result<ShareLink, StoreError> {
        self.inner.create_share_link(id).await
    }
}
