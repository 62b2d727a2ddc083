//! Error types for the DCE analyzer.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, DceError>;

#[derive(Error, Debug)]
pub enum DceError {
    /// Failures from the configuration engine's collaborators.
    #[error(transparent)]
    Config(#[from] confgen_core::ConfigError),

    /// The trial-preprocess collaborator could not produce usable output.
    #[error("preprocessing pass failed ({0})")]
    Preprocess(String),

    /// An included template source could not be located anywhere.
    #[error("failed to find included file {0}")]
    MissingInclude(String),
}
