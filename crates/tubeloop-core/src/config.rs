//! Session configuration management.
//!
//! Handles loading, saving, and defaulting the engine's tunables: storage
//! location, provider readiness polling, the error-advance delay, title
//! enrichment pacing, and the embed widget's construction options.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result, StorageError};

/// Default interval between provider readiness checks (100 ms).
pub const DEFAULT_READY_POLL_INTERVAL_MS: u64 = 100;

/// Default total wait for provider readiness (5 s).
pub const DEFAULT_READY_TIMEOUT_MS: u64 = 5_000;

/// Default pause between a playback error and the advance past it (1 s).
pub const DEFAULT_ERROR_ADVANCE_DELAY_MS: u64 = 1_000;

/// Default spacing between title lookup requests (500 ms).
pub const DEFAULT_TITLE_STAGGER_MS: u64 = 500;

/// Default timeout for a single title lookup request (10 s).
pub const DEFAULT_TITLE_TIMEOUT_SECS: u64 = 10;

/// Construction options for the embed widget.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct WidgetOptions {
    /// Start playback as soon as a video loads.
    #[serde(default = "default_true")]
    pub autoplay: bool,
    /// Show the provider's playback controls.
    #[serde(default = "default_true")]
    pub show_controls: bool,
    /// Reduce provider branding in the widget chrome.
    #[serde(default = "default_true")]
    pub modest_branding: bool,
    /// Offer related videos when playback stops.
    #[serde(default)]
    pub related_videos: bool,
    /// Show in-video annotations.
    #[serde(default)]
    pub annotations: bool,
}

const fn default_true() -> bool {
    true
}

impl Default for WidgetOptions {
    fn default() -> Self {
        Self {
            autoplay: true,
            show_controls: true,
            modest_branding: true,
            related_videos: false,
            annotations: false,
        }
    }
}

/// Engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionConfig {
    /// Directory where the persisted queue lives.
    pub data_dir: PathBuf,
    /// Interval between provider readiness checks, in milliseconds.
    #[serde(default = "default_ready_poll_interval")]
    pub ready_poll_interval_ms: u64,
    /// Total wait for provider readiness, in milliseconds.
    #[serde(default = "default_ready_timeout")]
    pub ready_timeout_ms: u64,
    /// Pause between a playback error and the advance, in milliseconds.
    #[serde(default = "default_error_advance_delay")]
    pub error_advance_delay_ms: u64,
    /// Spacing between title lookups, in milliseconds.
    #[serde(default = "default_title_stagger")]
    pub title_stagger_ms: u64,
    /// Timeout for a single title lookup, in seconds.
    #[serde(default = "default_title_timeout")]
    pub title_timeout_secs: u64,
    /// Embed widget construction options.
    #[serde(default)]
    pub widget: WidgetOptions,
}

const fn default_ready_poll_interval() -> u64 {
    DEFAULT_READY_POLL_INTERVAL_MS
}

const fn default_ready_timeout() -> u64 {
    DEFAULT_READY_TIMEOUT_MS
}

const fn default_error_advance_delay() -> u64 {
    DEFAULT_ERROR_ADVANCE_DELAY_MS
}

const fn default_title_stagger() -> u64 {
    DEFAULT_TITLE_STAGGER_MS
}

const fn default_title_timeout() -> u64 {
    DEFAULT_TITLE_TIMEOUT_SECS
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            data_dir: crate::persist::default_data_directory(),
            ready_poll_interval_ms: DEFAULT_READY_POLL_INTERVAL_MS,
            ready_timeout_ms: DEFAULT_READY_TIMEOUT_MS,
            error_advance_delay_ms: DEFAULT_ERROR_ADVANCE_DELAY_MS,
            title_stagger_ms: DEFAULT_TITLE_STAGGER_MS,
            title_timeout_secs: DEFAULT_TITLE_TIMEOUT_SECS,
            widget: WidgetOptions::default(),
        }
    }
}

impl SessionConfig {
    /// Create a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the data directory.
    #[must_use]
    pub fn with_data_dir(mut self, path: PathBuf) -> Self {
        self.data_dir = path;
        self
    }

    /// Set the provider readiness timeout.
    #[must_use]
    pub const fn with_ready_timeout_ms(mut self, ms: u64) -> Self {
        self.ready_timeout_ms = ms;
        self
    }

    /// Set the error-advance delay.
    #[must_use]
    pub const fn with_error_advance_delay_ms(mut self, ms: u64) -> Self {
        self.error_advance_delay_ms = ms;
        self
    }

    /// Set the widget construction options.
    #[must_use]
    pub const fn with_widget(mut self, widget: WidgetOptions) -> Self {
        self.widget = widget;
        self
    }

    /// Provider readiness poll interval.
    #[must_use]
    pub const fn ready_poll_interval(&self) -> Duration {
        Duration::from_millis(self.ready_poll_interval_ms)
    }

    /// Provider readiness deadline.
    #[must_use]
    pub const fn ready_timeout(&self) -> Duration {
        Duration::from_millis(self.ready_timeout_ms)
    }

    /// Delay before advancing past an errored entry.
    #[must_use]
    pub const fn error_advance_delay(&self) -> Duration {
        Duration::from_millis(self.error_advance_delay_ms)
    }

    /// Spacing between title lookup requests.
    #[must_use]
    pub const fn title_stagger(&self) -> Duration {
        Duration::from_millis(self.title_stagger_ms)
    }

    /// Timeout for a single title lookup request.
    #[must_use]
    pub const fn title_timeout(&self) -> Duration {
        Duration::from_secs(self.title_timeout_secs)
    }

    /// Load configuration from the default location, falling back to
    /// defaults when no file exists.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file exists but cannot be read or
    /// parsed.
    pub fn load() -> Result<Self> {
        Self::load_from(&config_file_path())
    }

    /// Load configuration from a specific path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("Config file not found, using defaults");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| {
            Error::Storage(StorageError::ReadFailed {
                key: path.display().to_string(),
                reason: e.to_string(),
            })
        })?;
        let config: Self = serde_json::from_str(&content)?;

        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Save configuration to the default location.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save(&self) -> Result<()> {
        self.save_to(&config_file_path())
    }

    /// Save configuration to a specific path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.exists()
        {
            fs::create_dir_all(parent).map_err(|e| {
                Error::Storage(StorageError::WriteFailed {
                    key: path.display().to_string(),
                    reason: format!("Failed to create {}: {e}", parent.display()),
                })
            })?;
        }

        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content).map_err(|e| {
            Error::Storage(StorageError::WriteFailed {
                key: path.display().to_string(),
                reason: e.to_string(),
            })
        })?;

        info!("Saved config to {}", path.display());
        Ok(())
    }
}

/// Path to the configuration file in the platform config directory.
#[must_use]
pub fn config_file_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tubeloop")
        .join("config.json")
}
