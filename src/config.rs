// SPDX-License-Identifier: GPL-3.0-only

use crate::constants::{
    DEFAULT_API_BASE_URL, DEFAULT_LANGUAGE, DEFAULT_REQUEST_TIMEOUT, MAX_DECODE_FPS,
    SNAPSHOT_SIZE, language,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Application theme preference
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AppTheme {
    #[default]
    Dark,
    Light,
}

impl AppTheme {
    pub fn toggled(self) -> Self {
        match self {
            Self::Dark => Self::Light,
            Self::Light => Self::Dark,
        }
    }

    pub fn is_dark(self) -> bool {
        self == Self::Dark
    }
}

/// Runtime configuration, assembled from defaults and command-line flags
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Lookup service base URL
    pub api_base_url: String,
    /// Decode attempts per second (capped at the maximum)
    pub decode_fps: u32,
    /// Side of the square still sent for analysis
    pub snapshot_size: u32,
    pub request_timeout: Duration,
    /// Start barcode scanning as soon as the barcode tab is shown
    pub auto_start_decode: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            decode_fps: MAX_DECODE_FPS,
            snapshot_size: SNAPSHOT_SIZE,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            auto_start_decode: true,
        }
    }
}

/// User choices persisted between runs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(rename = "selectedLanguage", default = "default_language")]
    pub language: String,
    #[serde(default)]
    pub theme: AppTheme,
}

fn default_language() -> String {
    DEFAULT_LANGUAGE.to_string()
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            language: default_language(),
            theme: AppTheme::default(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PrefsError {
    #[error("no configuration directory on this system")]
    NoConfigDir,
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("{}: {source}", path.display())]
    Format {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// JSON file holding [`Preferences`]
#[derive(Debug, Clone)]
pub struct PreferenceStore {
    path: PathBuf,
}

impl PreferenceStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<config_dir>/scan-japan/preferences.json`
    pub fn default_location() -> Result<Self, PrefsError> {
        let dir = dirs::config_dir().ok_or(PrefsError::NoConfigDir)?;
        Ok(Self::new(dir.join("scan-japan").join("preferences.json")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read preferences; a missing file yields the defaults
    pub fn try_load(&self) -> Result<Preferences, PrefsError> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No saved preferences");
                return Ok(Preferences::default());
            }
            Err(source) => {
                return Err(PrefsError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        let mut prefs: Preferences =
            serde_json::from_str(&text).map_err(|source| PrefsError::Format {
                path: self.path.clone(),
                source,
            })?;

        if language(&prefs.language).is_none() {
            warn!(language = %prefs.language, "Unknown saved language, using default");
            prefs.language = default_language();
        }
        Ok(prefs)
    }

    /// Read preferences, falling back to defaults on any error
    pub fn load(&self) -> Preferences {
        self.try_load().unwrap_or_else(|e| {
            warn!(error = %e, "Failed to load preferences, using defaults");
            Preferences::default()
        })
    }

    pub fn save(&self, prefs: &Preferences) -> Result<(), PrefsError> {
        let io_error = |source: std::io::Error| PrefsError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(io_error)?;
        }
        let json = serde_json::to_string_pretty(prefs).map_err(|source| PrefsError::Format {
            path: self.path.clone(),
            source,
        })?;
        std::fs::write(&self.path, json).map_err(io_error)?;

        info!(path = %self.path.display(), language = %prefs.language, theme = ?prefs.theme, "Preferences saved");
        Ok(())
    }
}
