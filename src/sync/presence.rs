//! Collaborator presence for the open document
//!
//! Presence is polled: the roster is fetched when tracking starts and then
//! on every interval tick, and each response replaces the roster wholesale.
//! [`Presence`] hides the polling so a push subscription could take its place.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::core::document::{Collaborator, DocumentId};
use crate::store::DocumentStore;

/// Source of the collaborator roster for one document at a time
pub trait Presence: Send {
    /// Begin tracking `doc_id`, replacing any previous document
    fn start(&mut self, doc_id: &str);

    /// Stop tracking and clear the roster
    fn stop(&mut self);

    /// Current roster, empty when nothing is tracked
    fn roster(&self) -> Vec<Collaborator>;

    /// Document currently tracked
    fn document_id(&self) -> Option<DocumentId>;
}

#[derive(Debug, Default)]
struct Roster {
    document_id: Option<DocumentId>,
    collaborators: Vec<Collaborator>,
}

/// Polls [`DocumentStore::list_collaborators`] on a fixed interval
pub struct PresenceTracker {
    store: Arc<dyn DocumentStore>,
    interval: Duration,
    roster: Arc<Mutex<Roster>>,
    poller: Option<JoinHandle<()>>,
}

fn lock(roster: &Mutex<Roster>) -> MutexGuard<'_, Roster> {
    roster.lock().unwrap_or_else(PoisonError::into_inner)
}

impl PresenceTracker {
    pub fn new(store: Arc<dyn DocumentStore>, interval: Duration) -> Self {
        Self {
            store,
            interval,
            roster: Arc::new(Mutex::new(Roster::default())),
            poller: None,
        }
    }
}

impl Presence for PresenceTracker {
    fn start(&mut self, doc_id: &str) {
        self.stop();
        *lock(&self.roster) = Roster {
            document_id: Some(doc_id.to_string()),
            collaborators: Vec::new(),
        };

        let store = Arc::clone(&self.store);
        let roster = Arc::clone(&self.roster);
        let period = self.interval;
        let doc_id = doc_id.to_string();
        tracing::debug!("Tracking presence of {}", doc_id);

        self.poller = Some(tokio::spawn(async move {
            // The first tick completes immediately
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let result = store.list_collaborators(&doc_id).await;

                let mut current = lock(&roster);
                if current.document_id.as_deref() != Some(doc_id.as_str()) {
                    break;
                }
                match result {
                    Ok(collaborators) => current.collaborators = collaborators,
                    Err(e) => {
                        tracing::error!("Failed to load collaborators of {}: {}", doc_id, e);
                        current.collaborators.clear();
                    }
                }
            }
        }));
    }

    fn stop(&mut self) {
        if let Some(poller) = self.poller.take() {
            poller.abort();
        }
        *lock(&self.roster) = Roster::default();
    }

    fn roster(&self) -> Vec<Collaborator> {
        lock(&self.roster).collaborators.clone()
    }

    fn document_id(&self) -> Option<DocumentId> {
        lock(&self.roster).document_id.clone()
    }
}

impl Drop for PresenceTracker {
    fn drop(&mut self) {
        if let Some(poller) = self.poller.take() {
            poller.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::testing::RecordingStore;
    use tokio::time::{sleep, sleep_until, Instant};

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    async fn setup() -> (Arc<RecordingStore>, PresenceTracker, String) {
        let store = Arc::new(RecordingStore::new());
        let doc = store.create("Doc").await.unwrap();
        let tracker = PresenceTracker::new(store.clone(), ms(3000));
        (store, tracker, doc.id)
    }

    #[tokio::test(start_paused = true)]
    async fn test_polls_immediately_then_every_interval() {
        let (store, mut tracker, id) = setup().await;
        let start = Instant::now();
        tracker.start(&id);

        sleep_until(start + ms(10)).await;
        assert_eq!(store.polls_for(&id), 1);
        assert!(!tracker.roster().is_empty());
        assert_eq!(tracker.document_id(), Some(id.clone()));

        sleep_until(start + ms(9500)).await;
        let polls = store.polls();
        assert_eq!(polls.len(), 4);
        for (i, poll) in polls.iter().enumerate() {
            let expected = ms(3000 * i as u64);
            let actual = poll.at - start;
            assert!(actual >= expected && actual <= expected + ms(1), "poll {} at {:?}", i, actual);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_polls_after_stop() {
        let (store, mut tracker, id) = setup().await;
        tracker.start(&id);
        sleep(ms(4000)).await;
        assert_eq!(store.polls_for(&id), 2);

        tracker.stop();
        assert!(tracker.roster().is_empty());
        assert_eq!(tracker.document_id(), None);

        sleep(ms(30_000)).await;
        assert_eq!(store.polls_for(&id), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_poll_clears_roster() {
        let (store, mut tracker, id) = setup().await;
        tracker.start(&id);
        sleep(ms(10)).await;
        assert!(!tracker.roster().is_empty());

        store.fail_polls(true);
        sleep(ms(3000)).await;
        assert!(tracker.roster().is_empty());
        assert_eq!(tracker.document_id(), Some(id.clone()));

        store.fail_polls(false);
        sleep(ms(3000)).await;
        assert!(!tracker.roster().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_switches_document() {
        let (store, mut tracker, first) = setup().await;
        let second = store.create("Second").await.unwrap().id;

        tracker.start(&first);
        sleep(ms(1000)).await;
        tracker.start(&second);
        sleep(ms(7000)).await;

        assert_eq!(store.polls_for(&first), 1);
        assert_eq!(store.polls_for(&second), 3);
        assert_eq!(tracker.document_id(), Some(second));
    }
}
