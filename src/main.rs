//! Quillsync - collaborative rich-text document editing
//!
//! Runs a short scripted editing session against an in-process store.

mod app;
mod core;
mod editor;
mod store;
mod sync;

use std::sync::Arc;
use std::time::Duration;

use crate::app::EditorApp;
use crate::core::config::AppConfig;
use crate::core::content::{BlockType, InlineStyle, Selection};
use crate::editor::TabDirection;
use crate::store::InMemoryStore;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::filter::LevelFilter::INFO)
        .init();

    tracing::info!("Starting Quillsync...");

    let config = AppConfig::load().unwrap_or_else(|e| {
        tracing::warn!("Using default configuration: {:#}", e);
        AppConfig::default()
    });
    let store = Arc::new(InMemoryStore::new(config.store.base_url.clone()));
    let mut app = EditorApp::new(store, config);

    app.load_documents().await;
    let doc = app.create_document("Meeting notes").await?;

    app.edit(|s| s.toggle_block_type(BlockType::HeaderOne));
    app.edit(|s| s.insert_text("Agenda"));
    app.handle_key_command("split-block");
    app.edit(|s| s.toggle_block_type(BlockType::UnorderedListItem));
    app.edit(|s| s.insert_text("Release plan"));
    app.handle_key_command("split-block");
    app.handle_tab(TabDirection::Indent);
    app.handle_tab(TabDirection::Indent);
    app.handle_tab(TabDirection::Outdent);
    app.handle_key_command("bold");
    log_toolbar(&app);
    app.edit(|s| s.insert_text("Ship on Friday"));

    // Italicize "Ship" in the current item
    if let Some(key) = app.editor().map(|e| e.selection().focus_key.clone()) {
        app.select(Selection::range(key.clone(), 0, key, 4));
        app.handle_key_command("italic");
        log_toolbar(&app);
    }

    app.edit(|s| s.insert_text(" (tentative)"));
    app.undo();
    log_toolbar(&app);
    app.redo();
    app.undo();

    if let Some(first) = app.editor().map(|e| e.content().first().key.clone()) {
        app.edit(|s| s.collapse_to(&first, 0));
        log_toolbar(&app);
    }
    app.set_title("Weekly meeting notes");

    while app.has_unsaved_changes() || app.is_saving() {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    let saved = app.apply_save_events();

    if let Some(current) = app.current_document() {
        tracing::info!(
            "Saved {} change(s) to {} (created {:.3}, updated {:.3}, {} bytes of content)",
            saved,
            current.display_title(),
            current.created_at,
            current.updated_at,
            current.content.len()
        );
    }
    if let Some(editor) = app.editor() {
        tracing::info!("Document text:\n{}", editor.content().plain_text());
    }
    for collaborator in app.collaborators() {
        match collaborator.cursor_position {
            Some(position) => tracing::info!(
                "#{} {} ({}) is editing at {}",
                collaborator.id,
                collaborator.name,
                collaborator.color,
                position
            ),
            None => tracing::info!(
                "#{} {} ({}) is {}",
                collaborator.id,
                collaborator.name,
                collaborator.color,
                if collaborator.active { "active" } else { "away" }
            ),
        }
    }

    let link = app.share_link().await?;
    tracing::info!("Share link for {}: {}", link.document_id, link.url);

    app.delete_document(&doc.id).await;
    Ok(())
}

/// Log the formatting state a toolbar would show
fn log_toolbar(app: &EditorApp) {
    let Some(editor) = app.editor() else {
        return;
    };
    let styles: Vec<_> = editor
        .current_inline_style()
        .into_iter()
        .map(InlineStyle::as_tag)
        .collect();
    tracing::info!(
        "Toolbar: {} [{}]{}{} undo={} redo={}",
        editor.current_block_type().as_tag(),
        styles.join(", "),
        if editor.selection().is_collapsed() { "" } else { " selection" },
        if editor.has_pending_override() { " pending" } else { "" },
        editor.can_undo(),
        editor.can_redo()
    );
}
