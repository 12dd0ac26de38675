//! Error types for ember-stream

use thiserror::Error;

/// Result type alias using ember-stream Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while opening or reading a generation stream
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP request failed (connection refused, reset, body read failure)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Server answered with a non-success status before streaming
    #[error("Server returned {status}: {message}")]
    Status { status: u16, message: String },

    /// Fragment contains a line break and cannot be framed
    #[error("Fragment cannot be framed, it contains a line break: {0:?}")]
    InvalidFragment(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// Create a status error from a response code and its raw body.
    ///
    /// JSON bodies of the form `{"detail": "..."}` are reduced to the detail text.
    pub fn status(status: u16, body: impl AsRef<str>) -> Self {
        Self::Status {
            status,
            message: error_detail(body.as_ref()),
        }
    }

    /// Whether the server reported it cannot serve requests right now
    pub fn is_unavailable(&self) -> bool {
        match self {
            Error::Status { status, .. } => *status == 503,
            Error::Http(e) => e.is_connect() || e.is_timeout(),
            _ => false,
        }
    }
}

fn error_detail(body: &str) -> String {
    let body = body.trim();
    if let Ok(serde_json::Value::Object(map)) = serde_json::from_str::<serde_json::Value>(body) {
        if let Some(detail) = map.get("detail").and_then(|d| d.as_str()) {
            return detail.to_string();
        }
    }
    if body.is_empty() {
        "empty response body".to_string()
    } else {
        body.to_string()
    }
}
