//! Chat event types

use serde::{Deserialize, Serialize};

use crate::conversation::ExchangeId;
use crate::message::Message;

/// Events emitted by a [`Conversation`](crate::Conversation) as it changes state
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatEvent {
    /// A user prompt was accepted and appended
    UserMessage {
        exchange: ExchangeId,
        message: Message,
    },

    /// The response stream is open
    StreamingStarted { exchange: ExchangeId },

    /// Live preview of the pending assistant message
    Preview {
        exchange: ExchangeId,
        fragment: String,
        content: String,
    },

    /// An assistant message was appended to the transcript
    MessageFinalized { message: Message },

    /// The exchange is over; `error` is set when it failed
    ExchangeFinished {
        exchange: ExchangeId,
        error: Option<String>,
    },

    /// Transcript and pending response were discarded
    Reset,

    /// Transcript was replaced wholesale (e.g. loaded from disk)
    TranscriptReplaced { message_count: usize },
}

impl ChatEvent {
    /// Check if this event ends an exchange
    pub fn is_terminal(&self) -> bool {
        matches!(self, ChatEvent::ExchangeFinished { .. })
    }
}
