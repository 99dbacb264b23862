/// Editor configuration: load, save, and sanitize.
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use scribe_mod_history::HistoryConfig;
use serde::{Deserialize, Serialize};

/// File name of the configuration file.
pub const CONFIG_FILE_NAME: &str = "scribe.json";

/// Upper bound for `history_max_size`.
pub const MAX_HISTORY_SIZE: usize = 10_000;

const VALID_BACKENDS: &[&str] = &["auto", "fallback", "host"];
const VALID_PROFILES: &[&str] = &["content", "paste"];

/// Top-level editor configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Maximum number of undo steps kept per editing surface (1..=10000).
    pub history_max_size: usize,
    /// Tree used for sanitization: "auto", "fallback" or "host".
    pub tree_backend: String,
    /// Allowlist profile used when none is requested: "content" or "paste".
    pub default_profile: String,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            history_max_size: 100,
            tree_backend: "auto".to_string(),
            default_profile: "content".to_string(),
        }
    }
}

impl EditorConfig {
    /// Returns the config file path: exe directory + `scribe.json`.
    pub fn config_path() -> PathBuf {
        std::env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(|d| d.join(CONFIG_FILE_NAME)))
            .unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME))
    }

    /// Loads config from `path`, creating a default file if it doesn't exist.
    /// Returns defaults on any error (unreadable file, parse error, etc.).
    pub fn load_or_create(path: &Path) -> Self {
        if path.exists() {
            match Self::load(path) {
                Ok(config) => return config,
                Err(e) => {
                    tracing::warn!("Failed to load config at {}: {e:#}", path.display());
                }
            }
            // Return defaults on error (don't overwrite broken file)
            Self::default()
        } else {
            let config = Self::default();
            if let Err(e) = config.save(path) {
                tracing::warn!("Failed to create default config at {}: {e:#}", path.display());
            }
            config
        }
    }

    /// Loads config from an explicitly given `path`. Missing or malformed
    /// files are errors.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let mut config: EditorConfig = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        config.sanitize();
        Ok(config)
    }

    /// Saves config to `path` as pretty-printed JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write config file: {}", path.display()))
    }

    /// Clamps values to valid ranges and resets invalid fields.
    pub fn sanitize(&mut self) {
        self.history_max_size = self.history_max_size.clamp(1, MAX_HISTORY_SIZE);

        self.tree_backend = self.tree_backend.trim().to_ascii_lowercase();
        if !VALID_BACKENDS.contains(&self.tree_backend.as_str()) {
            tracing::warn!("Unknown tree backend '{}', using auto", self.tree_backend);
            self.tree_backend = "auto".to_string();
        }

        self.default_profile = self.default_profile.trim().to_ascii_lowercase();
        if !VALID_PROFILES.contains(&self.default_profile.as_str()) {
            tracing::warn!("Unknown profile '{}', using content", self.default_profile);
            self.default_profile = "content".to_string();
        }
    }

    /// History settings for an editing surface built from this config.
    pub fn history_config(&self) -> HistoryConfig {
        HistoryConfig::with_max_size(self.history_max_size)
    }

    /// Whether the paste profile is the default.
    pub fn paste_by_default(&self) -> bool {
        self.default_profile == "paste"
    }
}
