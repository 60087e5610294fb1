//! Telemetry error types.

use thiserror::Error;

/// Errors that can occur while setting up logging.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The level or one of the directives could not be parsed.
    #[error("invalid log filter '{directive}': {message}")]
    InvalidFilter {
        /// The offending level or directive text.
        directive: String,
        /// Parser message.
        message: String,
    },

    /// The configuration names an unsupported format or target.
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// A global subscriber was already installed, or the writer failed to
    /// initialize.
    #[error("initialization error: {0}")]
    InitError(String),

    /// IO error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;
