// Application settings
// Loaded from ~/.config/econfab/settings.json

use econfab_core::{
    DEFAULT_CLEANER_ENDPOINT, DEFAULT_CLEANER_TIMEOUT_SECS, DEFAULT_DATASET_NAME, DEFAULT_MAX_FILES,
    DEFAULT_PREVIEW_ROWS, DEFAULT_SCRIPT_NAME,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to write {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize settings: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // Cleaning service
    #[serde(rename = "cleaner.endpoint")]
    pub cleaner_endpoint: String,

    #[serde(rename = "cleaner.timeoutSecs")]
    pub cleaner_timeout_secs: u64,

    #[serde(rename = "cleaner.useAi")]
    pub cleaner_use_ai: Option<bool>, // None = service default

    // Preview
    #[serde(rename = "preview.rows")]
    pub preview_rows: usize,

    // Upload
    #[serde(rename = "upload.maxFiles")]
    pub max_files: usize,

    // Output
    #[serde(rename = "output.scriptName")]
    pub script_name: String,

    #[serde(rename = "output.datasetName")]
    pub dataset_name: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            cleaner_endpoint: DEFAULT_CLEANER_ENDPOINT.to_string(),
            cleaner_timeout_secs: DEFAULT_CLEANER_TIMEOUT_SECS,
            cleaner_use_ai: None,
            preview_rows: DEFAULT_PREVIEW_ROWS,
            max_files: DEFAULT_MAX_FILES, // the cleaning service's own limit
            script_name: DEFAULT_SCRIPT_NAME.to_string(),
            dataset_name: DEFAULT_DATASET_NAME.to_string(),
        }
    }
}

impl Settings {
    /// Get the settings file path
    pub fn config_path() -> PathBuf {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("econfab");
        config_dir.join("settings.json")
    }

    /// Load settings from disk, falling back to defaults
    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    /// Load settings from `path`. A missing file, unreadable file, or
    /// invalid JSON gives the defaults; unknown keys are ignored.
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no settings file, using defaults");
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(contents) => {
                // Strip comments (lines starting with //)
                let cleaned: String = contents
                    .lines()
                    .filter(|line| !line.trim().starts_with("//"))
                    .collect::<Vec<_>>()
                    .join("\n");

                match serde_json::from_str::<Settings>(&cleaned) {
                    Ok(settings) => settings.sanitized(),
                    Err(e) => {
                        tracing::warn!(path = %path.display(), error = %e, "invalid settings.json, using defaults");
                        Self::default()
                    }
                }
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "unreadable settings.json, using defaults");
                Self::default()
            }
        }
    }

    /// Save settings to `path`, creating the directory if needed.
    pub fn save_to(&self, path: &Path) -> Result<(), SettingsError> {
        let write_err = |source| SettingsError::Write {
            path: path.display().to_string(),
            source,
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(write_err)?;
        }

        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).map_err(write_err)
    }

    /// Zero limits would make every upload or preview empty; treat them as unset.
    fn sanitized(mut self) -> Self {
        let defaults = Self::default();
        if self.preview_rows == 0 {
            self.preview_rows = defaults.preview_rows;
        }
        if self.max_files == 0 {
            self.max_files = defaults.max_files;
        }
        if self.cleaner_timeout_secs == 0 {
            self.cleaner_timeout_secs = defaults.cleaner_timeout_secs;
        }
        if self.script_name.trim().is_empty() {
            self.script_name = defaults.script_name;
        }
        if self.dataset_name.trim().is_empty() {
            self.dataset_name = defaults.dataset_name;
        }
        self
    }

    /// Get the config file path for display
    pub fn config_path_display() -> String {
        Self::config_path().to_string_lossy().to_string()
    }
}
