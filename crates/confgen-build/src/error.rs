//! Error types for confgen-build.

use thiserror::Error;

/// Result type for confgen-build operations.
pub type Result<T> = std::result::Result<T, BuildError>;

/// Errors that can occur in build-system integration.
#[derive(Error, Debug)]
pub enum BuildError {
    /// Failed to read a configuration file.
    #[error("Failed to read config file: {0}")]
    ReadConfig(#[from] std::io::Error),

    /// Failed to parse TOML configuration.
    #[error("Failed to parse TOML config: {0}")]
    ParseToml(#[from] toml::de::Error),

    /// Failed to parse JSON (compile_commands.json).
    #[error("Failed to parse JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    /// The configured compiler could not be run.
    #[error("Failed to invoke compiler ({0})")]
    Compiler(String),
}
