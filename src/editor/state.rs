//! Editor state: content, selection and pending inline style override

use std::collections::BTreeSet;

use super::history::History;
use crate::core::content::{BlockType, ContentState, InlineStyle, Position, Selection, Span};

/// Immutable editor state. Every operation returns a new value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorState {
    pub(super) content: ContentState,
    pub(super) selection: Selection,
    /// Styles for the next inserted text while the selection is collapsed
    pub(super) style_override: Option<BTreeSet<InlineStyle>>,
    pub(super) history: History,
}

impl Default for EditorState {
    fn default() -> Self {
        Self::new(ContentState::empty())
    }
}

impl EditorState {
    /// Create a state with the caret at the start of the first block
    pub fn new(content: ContentState) -> Self {
        let selection = Selection::caret(content.first().key.clone(), 0);
        Self {
            content,
            selection,
            style_override: None,
            history: History::default(),
        }
    }

    /// Replace the history with one of the given capacity
    pub fn with_undo_limit(mut self, limit: usize) -> Self {
        self.history = History::new(limit);
        self
    }

    pub fn content(&self) -> &ContentState {
        &self.content
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn has_pending_override(&self) -> bool {
        self.style_override.is_some()
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Move the selection. Offsets are clamped and any pending override is dropped.
    pub fn select(&self, selection: Selection) -> Self {
        let mut next = self.clone();
        next.selection = selection.clamp(&self.content);
        next.style_override = None;
        next
    }

    /// Collapse the selection to a caret
    pub fn collapse_to(&self, key: &str, offset: usize) -> Self {
        self.select(Selection::caret(key, offset))
    }

    pub(super) fn span(&self) -> Span {
        self.selection.span(&self.content).unwrap_or(Span {
            start: Position { block: 0, offset: 0 },
            end: Position { block: 0, offset: 0 },
        })
    }

    pub(super) fn caret_at(&self, content: &ContentState, position: Position) -> Selection {
        let block = &content.blocks()[position.block];
        Selection::caret(block.key.clone(), position.offset)
    }

    /// Styles the next typed char would get, the toolbar's active styles
    pub fn current_inline_style(&self) -> BTreeSet<InlineStyle> {
        if let Some(styles) = &self.style_override {
            return styles.clone();
        }
        let span = self.span();
        let block = &self.content.blocks()[span.start.block];
        if span.is_collapsed() {
            match span.start.offset.checked_sub(1) {
                Some(before) => block.styles_at(before),
                None => BTreeSet::new(),
            }
        } else {
            block.styles_at(span.start.offset)
        }
    }

    /// Type of the block holding the selection start
    pub fn current_block_type(&self) -> BlockType {
        self.content.blocks()[self.span().start.block].block_type
    }

    /// Commit new content: record the old content for undo when it changed,
    /// set the selection and clear the override.
    pub(super) fn commit(&self, content: ContentState, selection: Selection) -> Self {
        let mut history = self.history.clone();
        if content != self.content {
            history.record(self.content.clone());
        }
        Self {
            selection: selection.clamp(&content),
            content,
            style_override: None,
            history,
        }
    }
}
