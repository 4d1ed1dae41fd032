//! Error types for workflow operations

use crate::types::Operation;
use thiserror::Error;

/// Result type alias for workflow operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the workflow
///
/// The first three kinds are raised locally, before any call reaches the
/// roster. The remaining kinds originate at the roster and carry the
/// operation that produced them.
#[derive(Debug, Error)]
pub enum Error {
    /// Bad or empty roster
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Malformed hex or address
    #[error("encoding error: {0}")]
    Encoding(String),

    /// Well-formed bytes that are not a valid group element
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// Roster unreachable or internally failed
    #[error("service error during {op}: {message}")]
    Service { op: Operation, message: String },

    /// Roster refused a decryption
    #[error("authorization error during {op}: {message}")]
    Authorization { op: Operation, message: String },

    /// Referenced LTS, write or read does not exist at the roster
    #[error("not found during {op}: {message}")]
    NotFound { op: Operation, message: String },
}

impl Error {
    /// Stable name of the error kind
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Configuration(_) => "configuration",
            Error::Encoding(_) => "encoding",
            Error::InvalidKey(_) => "invalid_key",
            Error::Service { .. } => "service",
            Error::Authorization { .. } => "authorization",
            Error::NotFound { .. } => "not_found",
        }
    }

    /// Whether the error was raised before contacting the roster
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            Error::Configuration(_) | Error::Encoding(_) | Error::InvalidKey(_)
        )
    }
}
