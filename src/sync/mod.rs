//! Synchronization with the document store: debounced autosave and presence polling

pub mod autosave;
pub mod presence;

pub use autosave::{AutosaveScheduler, SaveEvent};
pub use presence::{Presence, PresenceTracker};
