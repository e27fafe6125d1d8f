//! Error types for s1flow-core

use crate::types::SessionId;
use thiserror::Error;

/// Main error type for the s1flow-core library
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV parsing or writing error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Parse error for a capture export
    #[error("parse error in {source_name}: {message}")]
    Parse {
        source_name: String,
        message: String,
    },

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// A record could not be turned into an event (missing message name, no usable fields)
    #[error("malformed event at record {seq}: {reason}")]
    MalformedEvent { seq: u64, reason: String },

    /// An event's keys match several open sessions equally well
    #[error("ambiguous correlation: event matches sessions {candidates:?}")]
    AmbiguousCorrelation { candidates: Vec<SessionId> },

    /// Session not found
    #[error("session not found: {0}")]
    SessionNotFound(SessionId),
}

/// Result type alias for s1flow-core
pub type Result<T> = std::result::Result<T, Error>;
