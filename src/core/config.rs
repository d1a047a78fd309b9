//! Application configuration management

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::editor::history::DEFAULT_UNDO_LIMIT;

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Autosave settings
    pub autosave: AutosaveConfig,
    /// Presence polling settings
    pub presence: PresenceConfig,
    /// Editor settings
    pub editor: EditorConfig,
    /// Document store settings
    pub store: StoreConfig,
}

/// Quiet windows of the autosave channels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutosaveConfig {
    /// Delay after the last content edit before saving, in milliseconds
    pub content_quiet_ms: u64,
    /// Delay after the last title edit before saving, in milliseconds
    pub title_quiet_ms: u64,
}

/// Presence settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PresenceConfig {
    /// Roster poll interval in milliseconds
    pub poll_interval_ms: u64,
}

/// Editor-specific settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Number of undo levels kept
    pub undo_limit: usize,
}

/// Document store settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Base URL used when issuing share links
    pub base_url: String,
}

impl Default for AutosaveConfig {
    fn default() -> Self {
        Self {
            content_quiet_ms: 1000,
            title_quiet_ms: 500,
        }
    }
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 3000,
        }
    }
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            undo_limit: DEFAULT_UNDO_LIMIT,
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
        }
    }
}

impl AutosaveConfig {
    pub fn content_quiet(&self) -> Duration {
        Duration::from_millis(self.content_quiet_ms)
    }

    pub fn title_quiet(&self) -> Duration {
        Duration::from_millis(self.title_quiet_ms)
    }
}

impl PresenceConfig {
    pub fn poll_interval(&self) -> Duration {
        // A zero period would make the poll loop spin
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

impl AppConfig {
    /// Get the config file path
    fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("com", "quillsync", "Quillsync")
            .map(|dirs| dirs.config_dir().join("config.json"))
    }

    /// Load configuration from disk
    pub fn load() -> Result<Self> {
        let path = Self::config_path()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;

        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        Self::from_json(&content)
            .with_context(|| format!("Failed to parse config: {}", path.display()))
    }

    /// Parse configuration. Missing sections and fields keep their defaults.
    pub fn from_json(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }
}
