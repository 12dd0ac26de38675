//! ember-chat: conversation runtime for a single-turn streaming backend
//!
//! This crate owns the transcript and the in-flight response, drives one
//! exchange at a time through a [`Transport`](ember_stream::Transport), and
//! persists transcripts as JSON documents.

pub mod conversation;
pub mod dispatcher;
pub mod error;
pub mod events;
pub mod message;
pub mod store;

pub use conversation::{ChatState, Conversation, ExchangeId, PendingResponse};
pub use dispatcher::{Dispatcher, ExchangeReport};
pub use error::{Error, Result};
pub use events::ChatEvent;
pub use message::{Message, MessageStatus, Role};
pub use store::{SavedTranscriptSummary, TranscriptStore};
