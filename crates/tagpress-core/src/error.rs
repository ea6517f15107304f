//! Error types for tagpress-core

use thiserror::Error;

/// Errors that can occur while assembling configuration.
///
/// Covers both configuration files and the CI environment the release
/// runs in. Every variant is fatal and is reported before any remote call.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to deserialize configuration.
    #[error("invalid configuration: {0}")]
    Deserialize(#[from] Box<figment::Error>),

    /// A required secret was not provided.
    #[error("'{name}' is not defined")]
    MissingSecret {
        /// The environment variable name.
        name: &'static str,
    },

    /// A required environment variable is unset or empty.
    #[error("env.var '{name}' is empty or not defined")]
    MissingVar {
        /// The environment variable name.
        name: &'static str,
    },

    /// An environment variable does not have the expected shape.
    #[error("malformed env.var '{name}': expected to match regex '{pattern}', got '{value}'")]
    MalformedVar {
        /// The environment variable name.
        name: &'static str,
        /// The pattern the value was checked against.
        pattern: String,
        /// The offending value.
        value: String,
    },
}

/// Result type alias using [`ConfigError`].
pub type ConfigResult<T> = Result<T, ConfigError>;
