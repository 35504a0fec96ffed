//! Error types for the terminal front-end.

use thiserror::Error;

/// Errors raised while loading the front-end's settings.
#[derive(Debug, Error)]
pub enum CliError {
    /// I/O error reading the configuration file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML deserialization error.
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for configuration loading.
pub type Result<T> = std::result::Result<T, CliError>;
