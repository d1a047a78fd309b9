//! Debounced autosave of document content and titles
//!
//! Each document owns two channels, content and title. A notification
//! restarts the channel's quiet-window timer and replaces its pending
//! payload. When the timer expires the payload is queued on the channel's
//! writer, which issues store updates one at a time in fire order.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::core::codec;
use crate::core::config::AutosaveConfig;
use crate::core::content::ContentState;
use crate::core::document::{Document, DocumentId, DocumentUpdate};
use crate::store::{DocumentStore, StoreError};

/// Independent save channels of a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SaveChannel {
    Content,
    Title,
}

impl fmt::Display for SaveChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SaveChannel::Content => f.write_str("content"),
            SaveChannel::Title => f.write_str("title"),
        }
    }
}

/// Outcome of a save, delivered to the owner of the scheduler
#[derive(Debug, Clone, PartialEq)]
pub enum SaveEvent {
    /// The store accepted the write and returned the stored document
    Saved {
        channel: SaveChannel,
        document: Document,
    },
    /// The write failed. It is not retried.
    Failed {
        document_id: DocumentId,
        channel: SaveChannel,
        error: StoreError,
    },
}

/// Payload waiting for its quiet window to pass
enum Pending {
    Content(ContentState),
    Title(String),
}

impl Pending {
    fn into_update(self) -> Option<DocumentUpdate> {
        match self {
            Pending::Title(title) => Some(DocumentUpdate::title(title)),
            Pending::Content(content) => match codec::encode_to_string(&content) {
                Ok(json) => Some(DocumentUpdate::content(json)),
                Err(e) => {
                    tracing::error!("Failed to encode content: {}", e);
                    None
                }
            },
        }
    }
}

/// Timer and writer queue of one channel of one document
struct ChannelSlot {
    timer: Option<JoinHandle<()>>,
    queue: mpsc::UnboundedSender<DocumentUpdate>,
    /// Writes queued or in flight
    outstanding: Arc<AtomicUsize>,
}

impl ChannelSlot {
    fn cancel_timer(&mut self) -> bool {
        match self.timer.take() {
            Some(timer) => {
                timer.abort();
                true
            }
            None => false,
        }
    }
}

struct DocumentSlots {
    content: ChannelSlot,
    title: ChannelSlot,
}

impl DocumentSlots {
    fn channel_mut(&mut self, channel: SaveChannel) -> &mut ChannelSlot {
        match channel {
            SaveChannel::Content => &mut self.content,
            SaveChannel::Title => &mut self.title,
        }
    }
}

/// Collapses bursts of edits into single store writes per document
pub struct AutosaveScheduler {
    store: Arc<dyn DocumentStore>,
    config: AutosaveConfig,
    slots: Mutex<HashMap<DocumentId, DocumentSlots>>,
    events: mpsc::UnboundedSender<SaveEvent>,
}

impl AutosaveScheduler {
    /// Create a scheduler and the receiver its save outcomes are sent to.
    /// Must be used from within a tokio runtime.
    pub fn new(
        store: Arc<dyn DocumentStore>,
        config: AutosaveConfig,
    ) -> (Self, mpsc::UnboundedReceiver<SaveEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();
        let scheduler = Self {
            store,
            config,
            slots: Mutex::new(HashMap::new()),
            events,
        };
        (scheduler, receiver)
    }

    fn slots(&self) -> MutexGuard<'_, HashMap<DocumentId, DocumentSlots>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record new content for `doc_id`, restarting its content quiet window
    pub fn notify_content_change(&self, doc_id: &str, content: ContentState) {
        self.schedule(doc_id, SaveChannel::Content, Pending::Content(content));
    }

    /// Record a new title for `doc_id`, restarting its title quiet window
    pub fn notify_title_change(&self, doc_id: &str, title: impl Into<String>) {
        self.schedule(doc_id, SaveChannel::Title, Pending::Title(title.into()));
    }

    fn schedule(&self, doc_id: &str, channel: SaveChannel, pending: Pending) {
        let delay = match channel {
            SaveChannel::Content => self.config.content_quiet(),
            SaveChannel::Title => self.config.title_quiet(),
        };

        let mut guard = self.slots();
        let slots = guard
            .entry(doc_id.to_string())
            .or_insert_with(|| self.open_slots(doc_id));
        let slot = slots.channel_mut(channel);
        slot.cancel_timer();

        let queue = slot.queue.clone();
        let outstanding = Arc::clone(&slot.outstanding);
        let doc_id = doc_id.to_string();
        slot.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let Some(update) = pending.into_update() else {
                return;
            };
            tracing::debug!("Quiet window elapsed, saving {} of {}", channel, doc_id);
            outstanding.fetch_add(1, Ordering::SeqCst);
            if queue.send(update).is_err() {
                outstanding.fetch_sub(1, Ordering::SeqCst);
            }
        }));
    }

    fn open_slots(&self, doc_id: &str) -> DocumentSlots {
        DocumentSlots {
            content: self.open_channel(doc_id, SaveChannel::Content),
            title: self.open_channel(doc_id, SaveChannel::Title),
        }
    }

    /// Spawn the writer that drains one channel's queue
    fn open_channel(&self, doc_id: &str, channel: SaveChannel) -> ChannelSlot {
        let (queue, mut writes) = mpsc::unbounded_channel::<DocumentUpdate>();
        let outstanding = Arc::new(AtomicUsize::new(0));

        let store = Arc::clone(&self.store);
        let events = self.events.clone();
        let in_writer = Arc::clone(&outstanding);
        let doc_id = doc_id.to_string();
        tokio::spawn(async move {
            while let Some(update) = writes.recv().await {
                let event = match store.update(&doc_id, update).await {
                    Ok(document) => {
                        tracing::debug!("Saved {} of {}", channel, doc_id);
                        SaveEvent::Saved { channel, document }
                    }
                    Err(error) => {
                        tracing::error!("Failed to save {} of {}: {}", channel, doc_id, error);
                        SaveEvent::Failed {
                            document_id: doc_id.clone(),
                            channel,
                            error,
                        }
                    }
                };
                in_writer.fetch_sub(1, Ordering::SeqCst);
                // Nobody listening is not an error for the writer
                let _ = events.send(event);
            }
        });

        ChannelSlot {
            timer: None,
            queue,
            outstanding,
        }
    }

    /// Drop the pending content and title saves of `doc_id` and release its
    /// slots. Writes already queued or handed to the store still complete,
    /// after which the channel writers exit.
    pub fn cancel(&self, doc_id: &str) {
        if let Some(mut slots) = self.slots().remove(doc_id) {
            let content = slots.content.cancel_timer();
            let title = slots.title.cancel_timer();
            if content || title {
                tracing::debug!("Cancelled pending saves of {}", doc_id);
            }
        }
    }

    /// Cancel pending saves of every document
    pub fn cancel_all(&self) {
        for (_, mut slots) in self.slots().drain() {
            slots.content.cancel_timer();
            slots.title.cancel_timer();
        }
    }

    /// Documents currently holding autosave slots
    #[cfg(test)]
    pub(crate) fn tracked_documents(&self) -> usize {
        self.slots().len()
    }

    /// Whether a save of `doc_id` is waiting on or talking to the store
    pub fn is_saving(&self, doc_id: &str) -> bool {
        self.slots().get(doc_id).is_some_and(|slots| {
            slots.content.outstanding.load(Ordering::SeqCst) > 0
                || slots.title.outstanding.load(Ordering::SeqCst) > 0
        })
    }

    /// Whether a quiet-window timer is armed for `doc_id`
    pub fn has_pending(&self, doc_id: &str) -> bool {
        self.slots().get(doc_id).is_some_and(|slots| {
            [&slots.content, &slots.title]
                .iter()
                .any(|slot| slot.timer.as_ref().is_some_and(|t| !t.is_finished()))
        })
    }
}

impl Drop for AutosaveScheduler {
    fn drop(&mut self) {
        self.cancel_all();
    }
}
