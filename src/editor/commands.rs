//! Editing operations on [`EditorState`]
//!
//! Every operation is a pure function from the current state to a new one.

use super::state::EditorState;
use crate::core::content::{BlockType, InlineStyle, Position, Selection, MAX_LIST_DEPTH};

/// Recognized key commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyCommand {
    Bold,
    Italic,
    Underline,
    SplitBlock,
    DeleteBackward,
    DeleteForward,
}

impl KeyCommand {
    /// Parse a key binding command name
    pub fn parse(command: &str) -> Option<Self> {
        match command {
            "bold" => Some(KeyCommand::Bold),
            "italic" => Some(KeyCommand::Italic),
            "underline" => Some(KeyCommand::Underline),
            "split-block" => Some(KeyCommand::SplitBlock),
            "backspace" | "delete-backward" => Some(KeyCommand::DeleteBackward),
            "delete" | "delete-forward" => Some(KeyCommand::DeleteForward),
            _ => None,
        }
    }
}

/// Direction of a tab key press
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TabDirection {
    Indent,
    Outdent,
}

/// Result of [`EditorState::handle_key_command`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyCommandOutcome {
    /// `false` means the caller should fall back to its default key handling
    pub handled: bool,
    pub state: EditorState,
}

impl EditorState {
    /// Flip `style` across the selection, or the pending override for a caret
    pub fn toggle_inline_style(&self, style: InlineStyle) -> Self {
        let span = self.span();
        if span.is_collapsed() {
            let mut styles = self.current_inline_style();
            if !styles.remove(&style) {
                styles.insert(style);
            }
            let mut next = self.clone();
            next.style_override = Some(styles);
            return next;
        }

        let segments: Vec<_> = self
            .content
            .segments(span)
            .into_iter()
            .filter(|(_, start, end)| start < end)
            .collect();
        if segments.is_empty() {
            return self.clone();
        }

        let blocks = self.content.blocks();
        let covered = segments
            .iter()
            .all(|&(i, start, end)| blocks[i].has_style(style, start, end));

        let mut content = self.content.clone();
        for (i, start, end) in segments {
            let block = &mut content.blocks_mut()[i];
            if covered {
                block.remove_style(style, start, end);
            } else {
                block.add_style(style, start, end);
            }
        }
        self.commit(content, self.selection.clone())
    }

    /// Set the type of every block touched by the selection. Toggling the
    /// type the first selected block already has reverts to paragraph.
    pub fn toggle_block_type(&self, block_type: BlockType) -> Self {
        let span = self.span();
        // A selection ending at the very start of a block leaves that block alone
        let last = if span.end.offset == 0 && span.end.block > span.start.block {
            span.end.block - 1
        } else {
            span.end.block
        };

        let target = if self.content.blocks()[span.start.block].block_type == block_type {
            BlockType::Paragraph
        } else {
            block_type
        };

        let mut content = self.content.clone();
        for block in &mut content.blocks_mut()[span.start.block..=last] {
            block.block_type = target;
            if !target.is_list() {
                block.depth = 0;
            }
        }
        self.commit(content, self.selection.clone())
    }

    /// Change the depth of list blocks in the selection. Returns an identical
    /// state when nothing changes.
    pub fn handle_tab(&self, direction: TabDirection) -> Self {
        let span = self.span();
        let mut content = self.content.clone();
        let mut changed = false;
        for block in &mut content.blocks_mut()[span.start.block..=span.end.block] {
            if !block.block_type.is_list() {
                continue;
            }
            let depth = match direction {
                TabDirection::Indent => (block.depth + 1).min(MAX_LIST_DEPTH),
                TabDirection::Outdent => block.depth.saturating_sub(1),
            };
            if depth != block.depth {
                block.depth = depth;
                changed = true;
            }
        }

        if !changed {
            return self.clone();
        }
        let mut next = self.commit(content, self.selection.clone());
        next.style_override = self.style_override.clone();
        next
    }

    /// Replace the selection with `text` and put the caret after it
    pub fn insert_text(&self, text: &str) -> Self {
        let span = self.span();
        if text.is_empty() && span.is_collapsed() {
            return self.clone();
        }

        let styles = self.current_inline_style();
        let mut content = self.content.clone();
        let caret = content.delete_span(span);
        content.blocks_mut()[caret.block].insert(caret.offset, text, &styles);

        let selection = self.caret_at(
            &content,
            Position {
                block: caret.block,
                offset: caret.offset + text.chars().count(),
            },
        );
        self.commit(content, selection)
    }

    /// Apply a named key command
    pub fn handle_key_command(&self, command: &str) -> KeyCommandOutcome {
        let Some(command) = KeyCommand::parse(command) else {
            return KeyCommandOutcome {
                handled: false,
                state: self.clone(),
            };
        };

        let state = match command {
            KeyCommand::Bold => self.toggle_inline_style(InlineStyle::Bold),
            KeyCommand::Italic => self.toggle_inline_style(InlineStyle::Italic),
            KeyCommand::Underline => self.toggle_inline_style(InlineStyle::Underline),
            KeyCommand::SplitBlock => self.split_block(),
            KeyCommand::DeleteBackward => self.delete_backward(),
            KeyCommand::DeleteForward => self.delete_forward(),
        };
        KeyCommandOutcome {
            handled: true,
            state,
        }
    }

    pub fn undo(&self) -> Self {
        let mut history = self.history.clone();
        let Some(previous) = history.undo(self.content.clone()) else {
            return self.clone();
        };
        Self {
            selection: self.selection.clamp(&previous),
            content: previous,
            style_override: None,
            history,
        }
    }

    pub fn redo(&self) -> Self {
        let mut history = self.history.clone();
        let Some(next) = history.redo(self.content.clone()) else {
            return self.clone();
        };
        Self {
            selection: self.selection.clamp(&next),
            content: next,
            style_override: None,
            history,
        }
    }

    fn split_block(&self) -> Self {
        let mut content = self.content.clone();
        let caret = content.delete_span(self.span());
        let key = content.fresh_key();
        let tail = content.blocks_mut()[caret.block].split_off(caret.offset, key.clone());
        content.blocks_mut().insert(caret.block + 1, tail);
        self.commit(content, Selection::caret(key, 0))
    }

    fn delete_backward(&self) -> Self {
        let span = self.span();
        let mut content = self.content.clone();
        if !span.is_collapsed() {
            let caret = content.delete_span(span);
            let selection = self.caret_at(&content, caret);
            return self.commit(content, selection);
        }

        let Position { block, offset } = span.start;
        if offset > 0 {
            content.blocks_mut()[block].delete(offset - 1, offset);
            let selection = self.caret_at(&content, Position { block, offset: offset - 1 });
            return self.commit(content, selection);
        }

        let current = &mut content.blocks_mut()[block];
        if current.block_type != BlockType::Paragraph || current.depth > 0 {
            current.block_type = BlockType::Paragraph;
            current.depth = 0;
            return self.commit(content, self.selection.clone());
        }
        if block == 0 {
            return self.clone();
        }

        let removed = content.blocks_mut().remove(block);
        let previous = &mut content.blocks_mut()[block - 1];
        let join = previous.len();
        previous.append(&removed);
        let selection = self.caret_at(&content, Position { block: block - 1, offset: join });
        self.commit(content, selection)
    }

    fn delete_forward(&self) -> Self {
        let span = self.span();
        let mut content = self.content.clone();
        if !span.is_collapsed() {
            let caret = content.delete_span(span);
            let selection = self.caret_at(&content, caret);
            return self.commit(content, selection);
        }

        let Position { block, offset } = span.start;
        if offset < content.blocks()[block].len() {
            content.blocks_mut()[block].delete(offset, offset + 1);
        } else if block + 1 < content.blocks().len() {
            let next = content.blocks_mut().remove(block + 1);
            content.blocks_mut()[block].append(&next);
        } else {
            return self.clone();
        }
        self.commit(content, self.selection.clone())
    }
}
