//! Rich text editor state machine
//!
//! [`EditorState`] is a value: style toggles, block type changes, key
//! commands, indentation, text insertion and undo/redo all take a state and
//! return a new one, independent of any rendering.

pub mod commands;
pub mod history;
pub mod state;

pub use commands::TabDirection;
pub use state::EditorState;
