//! Error types for validator setup
//!
//! Validation failures are never errors; they come back as
//! [`ValidationResult::Invalid`](crate::ValidationResult::Invalid).
//! These variants cover the things a caller can get wrong before a
//! validation call even starts.

use thiserror::Error;

/// Result type for setup operations
pub type Result<T> = std::result::Result<T, SchemaError>;

/// Setup errors
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Invalid pattern for format '{name}': {source}")]
    InvalidFormat {
        name: String,
        #[source]
        source: regex::Error,
    },

    #[error("Configuration error: {0}")]
    Config(#[from] config_crate::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}
