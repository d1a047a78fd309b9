//! Editing session state and coordination

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::core::config::AppConfig;
use crate::core::content::Selection;
use crate::core::document::{Collaborator, Document, ShareLink};
use crate::editor::{EditorState, TabDirection};
use crate::store::{DocumentStore, StoreError};
use crate::sync::{AutosaveScheduler, Presence, PresenceTracker, SaveEvent};

/// Editing session against one document store
pub struct EditorApp {
    store: Arc<dyn DocumentStore>,
    /// Application configuration
    pub config: AppConfig,
    /// Known documents, most recently created first
    pub documents: Vec<Document>,
    /// Currently open document
    current: Option<Document>,
    /// Editor state of the open document
    editor: Option<EditorState>,
    autosave: AutosaveScheduler,
    save_events: mpsc::UnboundedReceiver<SaveEvent>,
    presence: Box<dyn Presence>,
}

impl EditorApp {
    /// Create a session. Must be called from within a tokio runtime.
    pub fn new(store: Arc<dyn DocumentStore>, config: AppConfig) -> Self {
        let presence = PresenceTracker::new(Arc::clone(&store), config.presence.poll_interval());
        Self::with_presence(store, config, Box::new(presence))
    }

    /// Create a session with a custom presence source
    pub fn with_presence(
        store: Arc<dyn DocumentStore>,
        config: AppConfig,
        presence: Box<dyn Presence>,
    ) -> Self {
        let (autosave, save_events) =
            AutosaveScheduler::new(Arc::clone(&store), config.autosave.clone());
        Self {
            store,
            config,
            documents: Vec::new(),
            current: None,
            editor: None,
            autosave,
            save_events,
            presence,
        }
    }

    /// Refresh the document list
    pub async fn load_documents(&mut self) {
        match self.store.list().await {
            Ok(documents) => self.documents = documents,
            Err(e) => tracing::error!("Failed to load documents: {}", e),
        }
    }

    /// Open a document, replacing the current one. Returns false and keeps
    /// the current document when it cannot be fetched. Opening the document
    /// that is already open keeps its editor state and pending saves.
    pub async fn open_document(&mut self, id: &str) -> bool {
        if self.current.as_ref().is_some_and(|d| d.id == id) {
            return true;
        }

        let doc = match self.store.get(id).await {
            Ok(doc) => doc,
            Err(e) => {
                tracing::error!("Failed to open document: {}", e);
                return false;
            }
        };

        self.close_document();

        let decoded = doc.decode_content();
        if let Some(warning) = &decoded.warning {
            tracing::warn!("Content of {} is unreadable, starting empty: {}", doc.id, warning);
        }
        self.editor = Some(
            EditorState::new(decoded.content).with_undo_limit(self.config.editor.undo_limit),
        );
        self.presence.start(&doc.id);
        tracing::info!("Opened document {} ({})", doc.display_title(), doc.id);
        self.current = Some(doc);
        true
    }

    /// Close the open document. Pending saves are dropped, not flushed, and
    /// its autosave slots are released.
    pub fn close_document(&mut self) {
        if let Some(doc) = self.current.take() {
            self.autosave.cancel(&doc.id);
            self.presence.stop();
            tracing::debug!("Closed document {}", doc.id);
        }
        self.editor = None;
    }

    /// Create a document and open it
    pub async fn create_document(&mut self, title: &str) -> Result<Document, StoreError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(StoreError::InvalidRequest("title must not be empty".to_string()));
        }

        let doc = self.store.create(title).await.inspect_err(|e| {
            tracing::error!("Failed to create document: {}", e);
        })?;
        self.documents.insert(0, doc.clone());
        if !self.open_document(&doc.id).await {
            tracing::warn!("Created document {} but could not open it", doc.id);
        }
        Ok(doc)
    }

    /// Delete a document, closing it first if it is open
    pub async fn delete_document(&mut self, id: &str) -> bool {
        if let Err(e) = self.store.remove(id).await {
            tracing::error!("Failed to delete document: {}", e);
            return false;
        }

        self.documents.retain(|d| d.id != id);
        if self.current.as_ref().is_some_and(|d| d.id == id) {
            self.close_document();
        }
        self.autosave.cancel(id);
        true
    }

    /// Create a share link for the open document
    pub async fn share_link(&self) -> Result<ShareLink, StoreError> {
        let doc = self
            .current
            .as_ref()
            .ok_or_else(|| StoreError::InvalidRequest("no document is open".to_string()))?;
        self.store.create_share_link(&doc.id).await
    }

    /// Get the open document
    pub fn current_document(&self) -> Option<&Document> {
        self.current.as_ref()
    }

    /// Get the editor state of the open document
    pub fn editor(&self) -> Option<&EditorState> {
        self.editor.as_ref()
    }

    /// Apply an editor operation to the open document. Returns whether the
    /// content changed, in which case a content save is scheduled.
    pub fn edit(&mut self, f: impl FnOnce(&EditorState) -> EditorState) -> bool {
        let (Some(doc), Some(editor)) = (&self.current, &self.editor) else {
            return false;
        };

        let next = f(editor);
        let changed = next.content() != editor.content();
        if changed {
            self.autosave
                .notify_content_change(&doc.id, next.content().clone());
        }
        self.editor = Some(next);
        changed
    }

    /// Run a named key command. Returns whether the command was recognized.
    pub fn handle_key_command(&mut self, command: &str) -> bool {
        let mut handled = false;
        self.edit(|state| {
            let outcome = state.handle_key_command(command);
            handled = outcome.handled;
            outcome.state
        });
        handled
    }

    pub fn handle_tab(&mut self, direction: TabDirection) -> bool {
        self.edit(|state| state.handle_tab(direction))
    }

    /// Move the selection of the open document
    pub fn select(&mut self, selection: Selection) {
        self.edit(|state| state.select(selection));
    }

    pub fn undo(&mut self) -> bool {
        self.edit(EditorState::undo)
    }

    pub fn redo(&mut self) -> bool {
        self.edit(EditorState::redo)
    }

    /// Rename the open document and schedule a title save
    pub fn set_title(&mut self, title: &str) {
        if let Some(doc) = &mut self.current {
            doc.title = title.to_string();
            self.autosave.notify_title_change(&doc.id, title);
        }
    }

    /// Apply finished saves. Returns the number of store responses merged.
    pub fn apply_save_events(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(event) = self.save_events.try_recv() {
            let document = match event {
                SaveEvent::Saved { channel, document } => {
                    tracing::debug!("Applying saved {} of {}", channel, document.id);
                    document
                }
                SaveEvent::Failed {
                    document_id,
                    channel,
                    error,
                } => {
                    tracing::debug!(
                        "Keeping local {} of {} after failed save: {}",
                        channel,
                        document_id,
                        error
                    );
                    continue;
                }
            };

            if let Some(current) = &mut self.current {
                current.apply_response(&document);
            }
            if let Some(entry) = self.documents.iter_mut().find(|d| d.id == document.id) {
                let collaborators = entry.collaborators;
                *entry = document;
                entry.collaborators = collaborators;
            }
            applied += 1;
        }
        applied
    }

    /// Whether a save of the open document is in flight
    pub fn is_saving(&self) -> bool {
        self.current
            .as_ref()
            .is_some_and(|doc| self.autosave.is_saving(&doc.id))
    }

    /// Whether the open document has edits waiting for their quiet window
    pub fn has_unsaved_changes(&self) -> bool {
        self.current
            .as_ref()
            .is_some_and(|doc| self.autosave.has_pending(&doc.id))
    }

    /// Collaborators of the open document
    pub fn collaborators(&self) -> Vec<Collaborator> {
        let tracked = self.presence.document_id();
        match &self.current {
            Some(doc) if tracked.as_deref() == Some(doc.id.as_str()) => self.presence.roster(),
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::codec;
    use crate::core::content::{BlockType, ContentState};
    use crate::core::document::DocumentUpdate;
    use crate::store::testing::RecordingStore;
    use std::time::Duration;
    use tokio::time::sleep;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    async fn setup() -> (Arc<RecordingStore>, EditorApp, String, String) {
        let store = Arc::new(RecordingStore::new());
        let a = store.create("A").await.unwrap().id;
        let b = store.create("B").await.unwrap().id;
        let mut app = EditorApp::new(store.clone(), AppConfig::default());
        app.load_documents().await;
        (store, app, a, b)
    }

    fn text_of(app: &EditorApp) -> String {
        app.editor().unwrap().content().plain_text()
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_decodes_and_tracks_presence() {
        let (store, mut app, a, _) = setup().await;
        assert_eq!(app.documents.len(), 2);

        assert!(app.open_document(&a).await);
        assert_eq!(app.current_document().unwrap().id, a);
        assert_eq!(app.editor().unwrap().content(), &ContentState::empty());

        sleep(ms(10)).await;
        assert_eq!(store.polls_for(&a), 1);
        assert!(!app.collaborators().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_missing_document_keeps_current() {
        let (_, mut app, a, _) = setup().await;
        app.open_document(&a).await;
        assert!(!app.open_document("missing").await);
        assert_eq!(app.current_document().unwrap().id, a);
    }

    #[tokio::test(start_paused = true)]
    async fn test_corrupt_content_opens_empty() {
        let (store, mut app, a, _) = setup().await;
        store
            .update(&a, DocumentUpdate::content("{not valid json"))
            .await
            .unwrap();

        assert!(app.open_document(&a).await);
        assert_eq!(app.editor().unwrap().content(), &ContentState::empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_switch_drops_pending_save_of_previous_document() {
        let (store, mut app, a, b) = setup().await;
        app.open_document(&a).await;
        assert!(app.edit(|s| s.insert_text("draft for A")));
        assert!(app.has_unsaved_changes());

        sleep(ms(500)).await;
        app.open_document(&b).await;
        assert!(!app.has_unsaved_changes());
        sleep(ms(5000)).await;

        assert!(store.updates().is_empty());
        assert_eq!(store.polls_for(&a), 1);
        assert!(store.polls_for(&b) >= 2);
        assert!(!app.collaborators().is_empty());
        assert!(text_of(&app).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reopening_open_document_keeps_pending_edit() {
        let (store, mut app, a, _) = setup().await;
        app.open_document(&a).await;
        app.edit(|s| s.insert_text("typed"));

        sleep(ms(300)).await;
        assert!(app.open_document(&a).await);
        assert_eq!(text_of(&app), "typed");
        assert!(app.has_unsaved_changes());

        sleep(ms(5000)).await;
        let updates = store.updates();
        assert_eq!(updates.len(), 1);
        let saved = codec::decode(updates[0].payload.content.as_deref().unwrap());
        assert_eq!(saved.content.plain_text(), "typed");
        assert_eq!(store.polls_for(&a), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_only_open_document_holds_autosave_slots() {
        let (store, mut app, a, b) = setup().await;
        let mut ids = vec![a, b];
        for i in 0..6 {
            ids.push(store.create(&format!("Doc {}", i)).await.unwrap().id);
        }

        for id in &ids {
            app.open_document(id).await;
            app.edit(|s| s.insert_text("x"));
            app.set_title("renamed");
            assert_eq!(app.autosave.tracked_documents(), 1);
            sleep(ms(100)).await;
        }

        app.close_document();
        assert_eq!(app.autosave.tracked_documents(), 0);
        sleep(ms(5000)).await;
        assert!(store.updates().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_edit_saves_after_quiet_window() {
        let (store, mut app, a, _) = setup().await;
        app.open_document(&a).await;
        app.edit(|s| s.insert_text("Hello"));
        app.handle_key_command("bold");

        sleep(ms(999)).await;
        assert!(store.updates().is_empty());
        sleep(ms(50)).await;

        let updates = store.updates();
        assert_eq!(updates.len(), 1);
        let saved = codec::decode(updates[0].payload.content.as_deref().unwrap());
        assert!(saved.warning.is_none());
        assert_eq!(saved.content.plain_text(), "Hello");

        assert_eq!(app.apply_save_events(), 1);
        assert!(!app.is_saving());
        assert_eq!(
            Some(&app.current_document().unwrap().content),
            updates[0].payload.content.as_ref()
        );
        assert_eq!(text_of(&app), "Hello");
    }

    #[tokio::test(start_paused = true)]
    async fn test_unhandled_or_noop_commands_do_not_save() {
        let (store, mut app, a, _) = setup().await;
        app.open_document(&a).await;

        assert!(!app.handle_key_command("select-all"));
        assert!(app.handle_key_command("backspace"));
        assert!(!app.handle_tab(TabDirection::Indent));
        sleep(ms(3000)).await;
        assert!(store.updates().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_tab_on_list_item_saves() {
        let (store, mut app, a, _) = setup().await;
        app.open_document(&a).await;
        app.edit(|s| s.toggle_block_type(BlockType::UnorderedListItem));
        assert!(app.handle_tab(TabDirection::Indent));
        assert_eq!(app.editor().unwrap().content().first().depth, 1);

        sleep(ms(1100)).await;
        assert_eq!(store.updates().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_title_saved_on_its_own_channel() {
        let (store, mut app, a, _) = setup().await;
        app.open_document(&a).await;
        app.set_title("Renamed");
        assert_eq!(app.current_document().unwrap().title, "Renamed");

        sleep(ms(600)).await;
        let updates = store.updates();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].payload, DocumentUpdate::title("Renamed"));

        app.apply_save_events();
        let entry = app.documents.iter().find(|d| d.id == a).unwrap();
        assert_eq!(entry.title, "Renamed");
        assert_eq!(entry.collaborators, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_save_leaves_document_untouched() {
        let (store, mut app, a, _) = setup().await;
        app.open_document(&a).await;
        store.fail_updates(true);
        app.edit(|s| s.insert_text("lost"));

        sleep(ms(1100)).await;
        assert_eq!(store.updates().len(), 1);
        assert_eq!(app.apply_save_events(), 0);
        assert!(app.current_document().unwrap().content.is_empty());
        assert_eq!(text_of(&app), "lost");
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_prepends_and_opens() {
        let (_, mut app, _, _) = setup().await;
        let doc = app.create_document("  Fresh  ").await.unwrap();
        assert_eq!(doc.title, "Fresh");
        assert_eq!(app.documents[0].id, doc.id);
        assert_eq!(app.current_document().unwrap().id, doc.id);

        assert!(matches!(
            app.create_document("   ").await,
            Err(StoreError::InvalidRequest(_))
        ));
        assert_eq!(app.documents.len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_succeeds_when_document_cannot_be_opened() {
        let (store, mut app, a, _) = setup().await;
        app.open_document(&a).await;
        store.fail_gets(true);

        let doc = app.create_document("Offline").await.unwrap();
        assert_eq!(app.documents[0].id, doc.id);
        assert_eq!(app.current_document().unwrap().id, a);
    }

    #[tokio::test(start_paused = true)]
    async fn test_undo_and_redo_are_saved() {
        let (store, mut app, a, _) = setup().await;
        app.open_document(&a).await;
        app.edit(|s| s.insert_text("abc"));
        app.select(Selection::range("b0", 0, "b0", 3));
        assert!(!app.editor().unwrap().selection().is_collapsed());

        assert!(app.undo());
        assert!(text_of(&app).is_empty());
        assert!(app.editor().unwrap().can_redo());
        assert!(!app.undo());

        sleep(ms(1100)).await;
        assert_eq!(store.updates().len(), 1);

        assert!(app.redo());
        assert_eq!(text_of(&app), "abc");
        sleep(ms(1100)).await;
        let updates = store.updates();
        assert_eq!(updates.len(), 2);
        let saved = codec::decode(updates[1].payload.content.as_deref().unwrap());
        assert_eq!(saved.content.plain_text(), "abc");
    }

    #[tokio::test(start_paused = true)]
    async fn test_delete_open_document_closes_it() {
        let (store, mut app, a, b) = setup().await;
        app.open_document(&a).await;
        app.edit(|s| s.insert_text("x"));

        assert!(app.delete_document(&a).await);
        assert!(app.current_document().is_none());
        assert!(app.editor().is_none());
        assert!(app.collaborators().is_empty());
        assert_eq!(app.documents.len(), 1);
        assert_eq!(app.documents[0].id, b);

        sleep(ms(5000)).await;
        assert!(store.updates().is_empty());
        assert!(!app.delete_document(&a).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_share_link_requires_open_document() {
        let (_, mut app, a, _) = setup().await;
        assert!(app.share_link().await.is_err());

        app.open_document(&a).await;
        let link = app.share_link().await.unwrap();
        assert_eq!(link.document_id, a);
        assert!(link.url.ends_with(&format!("/document/{}", a)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_edit_without_document_is_ignored() {
        let (_, mut app, _, _) = setup().await;
        assert!(!app.edit(|s| s.insert_text("nowhere")));
        assert!(!app.handle_key_command("bold"));
        app.set_title("Nothing");
        assert!(!app.is_saving());
    }
}
