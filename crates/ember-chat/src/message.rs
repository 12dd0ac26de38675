//! Transcript message types

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Who authored a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    /// Label used when rendering a transcript
    pub fn label(&self) -> &'static str {
        match self {
            Role::User => "You",
            Role::Assistant => "Assistant",
        }
    }
}

/// Lifecycle status of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    /// Fully delivered
    #[default]
    Complete,
    /// Finalized early because the stream failed
    Partial,
    /// Synthetic marker describing a failed exchange
    Failed,
}

/// A single transcript entry.
///
/// Only `role` and `content` are required when reading a stored document;
/// the remaining fields are synthesized when absent or unreadable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    #[serde(default = "new_id", deserialize_with = "lenient_id")]
    pub id: String,
    pub role: Role,
    pub content: String,
    #[serde(
        default = "Utc::now",
        alias = "timestamp",
        deserialize_with = "lenient_time"
    )]
    pub created_at: DateTime<Utc>,
    #[serde(default, deserialize_with = "lenient_status")]
    pub status: MessageStatus,
}

impl Message {
    /// Create a message with a fresh id and the current time
    pub fn new(role: Role, content: impl Into<String>, status: MessageStatus) -> Self {
        Self {
            id: new_id(),
            role,
            content: content.into(),
            created_at: Utc::now(),
            status,
        }
    }

    /// Create a complete user message
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content, MessageStatus::Complete)
    }

    /// Create an assistant message with the given status
    pub fn assistant(content: impl Into<String>, status: MessageStatus) -> Self {
        Self::new(Role::Assistant, content, status)
    }

    pub fn is_user(&self) -> bool {
        self.role == Role::User
    }

    pub fn is_failed(&self) -> bool {
        self.status == MessageStatus::Failed
    }
}

fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

fn lenient_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) if !s.is_empty() => s,
        serde_json::Value::Number(n) => n.to_string(),
        _ => new_id(),
    })
}

/// Accepts RFC 3339 strings or Unix milliseconds; anything else becomes "now".
fn lenient_time<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    let parsed = match &value {
        serde_json::Value::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        serde_json::Value::Number(n) => n
            .as_i64()
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single()),
        _ => None,
    };
    Ok(parsed.unwrap_or_else(Utc::now))
}

fn lenient_status<'de, D>(deserializer: D) -> Result<MessageStatus, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}
