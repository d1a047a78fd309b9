//! Core functionality: content model, serialization, documents and configuration

pub mod codec;
pub mod config;
pub mod content;
pub mod document;
