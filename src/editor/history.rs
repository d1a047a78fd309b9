//! Bounded undo/redo history of content snapshots

use std::collections::VecDeque;
use std::sync::Arc;

use crate::core::content::ContentState;

/// Default number of undo levels kept
pub const DEFAULT_UNDO_LIMIT: usize = 100;

/// Undo and redo stacks. Only content is recorded, never the selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct History {
    undo_stack: VecDeque<Arc<ContentState>>,
    redo_stack: Vec<Arc<ContentState>>,
    max_undo_levels: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::new(DEFAULT_UNDO_LIMIT)
    }
}

impl History {
    pub fn new(max_undo_levels: usize) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: Vec::new(),
            max_undo_levels,
        }
    }

    /// Record the content as it was before a change
    pub fn record(&mut self, previous: ContentState) {
        if self.max_undo_levels == 0 {
            return;
        }
        self.undo_stack.push_back(Arc::new(previous));
        if self.undo_stack.len() > self.max_undo_levels {
            self.undo_stack.pop_front();
        }
        // A new change invalidates everything that was undone
        self.redo_stack.clear();
    }

    /// Step back, handing over the current content for redo
    pub fn undo(&mut self, current: ContentState) -> Option<ContentState> {
        let previous = self.undo_stack.pop_back()?;
        self.redo_stack.push(Arc::new(current));
        Some(Arc::unwrap_or_clone(previous))
    }

    /// Step forward, handing over the current content for undo
    pub fn redo(&mut self, current: ContentState) -> Option<ContentState> {
        let next = self.redo_stack.pop()?;
        self.undo_stack.push_back(Arc::new(current));
        Some(Arc::unwrap_or_clone(next))
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }
}
