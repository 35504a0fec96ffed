//! Front-end configuration.
//!
//! Configuration is loaded from `~/.config/folio-chat/config.toml`. Every key
//! is optional; a missing file means defaults.
//!
//! ## Example Configuration
//!
//! ```toml
//! base_url = "http://localhost:5000"
//! timeout_seconds = 60
//!
//! [retry]
//! max_retries = 5
//! initial_delay_ms = 500
//! max_delay_ms = 10000
//! ```
//!
//! `FOLIO_CHAT_BASE_URL` overrides the file's `base_url`, and command-line
//! flags override both.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use folio_chat::client::{
    DEFAULT_BASE_URL, DEFAULT_GENERATE_PATH, DEFAULT_LEAVE_MESSAGE_PATH,
};
use folio_chat::{ClientConfig, RetryConfig};
use serde::{Deserialize, Serialize};

use crate::error::{CliError, Result};

/// Environment variable overriding the backend base URL.
pub const BASE_URL_ENV: &str = "FOLIO_CHAT_BASE_URL";

/// Front-end settings loaded from TOML.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Backend base URL.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Path of the streaming generation endpoint.
    #[serde(default = "default_generate_path")]
    pub generate_path: String,

    /// Path of the contact-form endpoint.
    #[serde(default = "default_leave_message_path")]
    pub leave_message_path: String,

    /// Request timeout in seconds (default: none)
    #[serde(default)]
    pub timeout_seconds: Option<u64>,

    /// Retry policy for generation requests.
    #[serde(default)]
    pub retry: RetrySettings,
}

/// Retry policy for generation requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrySettings {
    /// Maximum retry attempts (default: 3)
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Delay before the first retry in milliseconds (default: 1000)
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    /// Cap on the delay between retries in milliseconds (default: 30000)
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            generate_path: default_generate_path(),
            leave_message_path: default_leave_message_path(),
            timeout_seconds: None,
            retry: RetrySettings::default(),
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_generate_path() -> String {
    DEFAULT_GENERATE_PATH.to_string()
}

fn default_leave_message_path() -> String {
    DEFAULT_LEAVE_MESSAGE_PATH.to_string()
}

const fn default_max_retries() -> u32 {
    3
}

const fn default_initial_delay_ms() -> u64 {
    1_000
}

const fn default_max_delay_ms() -> u64 {
    30_000
}

impl Settings {
    /// Loads settings from `path`, or from the default location.
    ///
    /// A missing file at the default location yields defaults; an explicitly
    /// requested file must exist.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The config directory cannot be determined
    /// - An explicitly given file doesn't exist
    /// - The file cannot be read or deserialized
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (path, explicit) = match path {
            Some(path) => (path.to_path_buf(), true),
            None => (Self::config_path()?, false),
        };

        if !path.exists() {
            if explicit {
                return Err(CliError::Config(format!(
                    "Configuration file not found: {}",
                    path.display()
                )));
            }
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path)?;
        Self::from_toml(&contents)
    }

    /// Parses settings from TOML text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid TOML for these settings.
    pub fn from_toml(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Returns the default configuration file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the config directory cannot be determined.
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| CliError::Config("Failed to determine config directory".to_string()))?
            .join("folio-chat");

        Ok(config_dir.join("config.toml"))
    }

    /// Applies a base URL taken from the environment, if set and non-blank.
    pub fn apply_base_url_override(&mut self, value: Option<String>) {
        if let Some(base_url) = value.filter(|v| !v.trim().is_empty()) {
            self.base_url = base_url;
        }
    }

    /// Builds the client configuration.
    #[must_use]
    pub fn client_config(&self) -> ClientConfig {
        let mut config = ClientConfig::new(self.base_url.clone())
            .with_generate_path(self.generate_path.clone())
            .with_leave_message_path(self.leave_message_path.clone())
            .with_retry_config(RetryConfig {
                max_retries: self.retry.max_retries,
                initial_delay: Duration::from_millis(self.retry.initial_delay_ms),
                max_delay: Duration::from_millis(self.retry.max_delay_ms),
            });
        if let Some(timeout) = self.timeout_seconds {
            config = config.with_timeout(timeout);
        }
        config
    }

    /// Validates the settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the resulting client configuration is invalid.
    pub fn validate(&self) -> Result<()> {
        self.client_config()
            .validate()
            .map_err(|e| CliError::Config(e.to_string()))
    }
}
