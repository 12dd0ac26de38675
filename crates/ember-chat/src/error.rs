//! Error types for ember-chat

use thiserror::Error;

use crate::conversation::ChatState;

/// Result type alias using ember-chat Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during chat operations
#[derive(Error, Debug)]
pub enum Error {
    /// An error from the streaming layer
    #[error(transparent)]
    Stream(#[from] ember_stream::Error),

    /// Operation not allowed in the current state
    #[error("Cannot {operation} while {state}")]
    RejectedState {
        operation: &'static str,
        state: ChatState,
    },

    /// Prompt was empty or whitespace only
    #[error("Prompt is empty")]
    EmptyPrompt,

    /// A signal arrived for an exchange that is no longer current
    #[error("Exchange {0} is no longer active")]
    StaleExchange(crate::conversation::ExchangeId),

    /// A stored transcript could not be parsed
    #[error("Corrupt transcript '{name}': {reason}")]
    CorruptData { name: String, reason: String },

    /// No transcript with this name
    #[error("Transcript not found: {0}")]
    NotFound(String),

    /// Transcript name unusable as a file name
    #[error("Invalid transcript name '{0}'")]
    InvalidName(String),

    /// Filesystem failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization failure while saving
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Whether this error is a caller mistake rather than an environmental failure
    pub fn is_usage_error(&self) -> bool {
        matches!(
            self,
            Error::RejectedState { .. }
                | Error::EmptyPrompt
                | Error::StaleExchange(_)
                | Error::InvalidName(_)
        )
    }
}
