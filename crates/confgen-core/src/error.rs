//! Error types for the configuration engine.

use thiserror::Error;

/// Result type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Fatal configuration errors. Anything recoverable is reported through the
/// [`Reporter`](confgen_common::Reporter) instead and never reaches here.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A collaborator failed to read a required file.
    #[error("failed to load file ({0})")]
    FileLoad(String),

    /// A collaborator failed to write a generated file.
    #[error("failed opening output file ({0})")]
    FileWrite(String),

    /// A collaborator failed to create a directory.
    #[error("failed to create directory ({0})")]
    CreateDir(String),

    /// The descriptor does not contain the `#define <PROJECT>_CONFIG_H`
    /// start marker.
    #[error("failed finding config.h start parameters")]
    MissingConfigMarker,

    /// The fixed `#define` block is not terminated.
    #[error("failed finding config.h parameters end")]
    MissingConfigEnd,

    /// A `$var` substitution in the fixed block has no known value.
    #[error("unknown configuration operation found ({0})")]
    UnknownSubstitution(String),

    /// A required named list is missing from the descriptor.
    #[error("failed finding config list ({0})")]
    MissingList(String),

    /// A list declaration invokes a helper this engine does not know.
    #[error("unknown list function ({function}) found in list ({list})")]
    UnknownListFunction { function: String, list: String },

    /// The user explicitly referenced an option that does not exist.
    #[error("unknown config option ({0})")]
    UnknownOption(String),

    /// A command directive is not of any recognized form.
    #[error("unknown command line option ({0})")]
    UnknownDirective(String),

    /// A `#define` in a re-used configuration header carries a value other
    /// than `0` or `1`.
    #[error("invalid config value ({value}) for option ({option})")]
    InvalidValue { option: String, value: String },

    /// An enabled option is not permitted under the selected license.
    #[error("current license does not allow for option ({0})")]
    LicenseConflict(String),
}
