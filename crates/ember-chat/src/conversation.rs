//! Conversation state: transcript, pending response, and exchange lifecycle.
//!
//! ```text
//! Idle --submit--> Submitting --begin_streaming--> Streaming --on_completed--> Idle
//!                      |                               |
//!                      +-----------on_failed-----------+--------------------> Idle
//! ```
//!
//! Every exchange gets a fresh [`ExchangeId`]. Signals carrying an id other than
//! the current one are rejected, so a stream orphaned by [`Conversation::reset`]
//! can never write into the transcript that replaced it.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::error::{Error, Result};
use crate::events::ChatEvent;
use crate::message::{Message, MessageStatus};

/// Identifier of one prompt/response exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExchangeId(u64);

impl fmt::Display for ExchangeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Where the conversation is in the exchange lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ChatState {
    #[default]
    Idle,
    /// Prompt accepted, waiting for the transport to open
    Submitting,
    /// Fragments are arriving
    Streaming,
}

impl fmt::Display for ChatState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ChatState::Idle => "idle",
            ChatState::Submitting => "submitting",
            ChatState::Streaming => "streaming",
        })
    }
}

/// The assistant message under construction
#[derive(Debug, Clone)]
pub struct PendingResponse {
    pub id: ExchangeId,
    pub accumulated_content: String,
    pub started_at: DateTime<Utc>,
    /// Number of fragments applied so far
    pub fragments: usize,
}

/// Single-writer owner of the transcript and the in-flight response
pub struct Conversation {
    state: ChatState,
    messages: Vec<Message>,
    pending: Option<PendingResponse>,
    next_exchange: u64,
    event_tx: broadcast::Sender<ChatEvent>,
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}

impl Conversation {
    /// Create an idle conversation with an empty transcript
    pub fn new() -> Self {
        let (event_tx, _) = broadcast::channel(256);
        Self {
            state: ChatState::Idle,
            messages: Vec::new(),
            pending: None,
            next_exchange: 1,
            event_tx,
        }
    }

    /// Subscribe to conversation events
    pub fn subscribe(&self) -> broadcast::Receiver<ChatEvent> {
        self.event_tx.subscribe()
    }

    pub fn state(&self) -> ChatState {
        self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state == ChatState::Idle
    }

    /// Finalized messages, oldest first
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn pending(&self) -> Option<&PendingResponse> {
        self.pending.as_ref()
    }

    /// Text accumulated so far for the in-flight response
    pub fn preview(&self) -> Option<&str> {
        self.pending.as_ref().map(|p| p.accumulated_content.as_str())
    }

    fn emit(&self, event: ChatEvent) {
        let _ = self.event_tx.send(event);
    }

    /// Accept a prompt and open a new exchange
    pub fn submit(&mut self, prompt: &str) -> Result<ExchangeId> {
        if self.state != ChatState::Idle {
            return Err(Error::RejectedState {
                operation: "submit",
                state: self.state,
            });
        }
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(Error::EmptyPrompt);
        }

        let id = ExchangeId(self.next_exchange);
        self.next_exchange += 1;

        let message = Message::user(prompt);
        self.messages.push(message.clone());
        self.pending = Some(PendingResponse {
            id,
            accumulated_content: String::new(),
            started_at: Utc::now(),
            fragments: 0,
        });
        self.state = ChatState::Submitting;

        tracing::debug!("Exchange {} submitted", id);
        self.emit(ChatEvent::UserMessage {
            exchange: id,
            message,
        });
        Ok(id)
    }

    /// The transport produced a fragment sequence for `exchange`
    pub fn begin_streaming(&mut self, exchange: ExchangeId) -> Result<()> {
        self.ensure_current(exchange, "begin streaming", &[ChatState::Submitting])?;
        self.state = ChatState::Streaming;
        self.emit(ChatEvent::StreamingStarted { exchange });
        Ok(())
    }

    /// Append one fragment to the pending response
    pub fn on_fragment(&mut self, exchange: ExchangeId, text: &str) -> Result<()> {
        self.ensure_current(exchange, "append a fragment", &[ChatState::Streaming])?;
        let Some(pending) = self.pending.as_mut() else {
            return Err(Error::StaleExchange(exchange));
        };
        pending.accumulated_content.push_str(text);
        pending.fragments += 1;

        let content = pending.accumulated_content.clone();
        self.emit(ChatEvent::Preview {
            exchange,
            fragment: text.to_string(),
            content,
        });
        Ok(())
    }

    /// The stream ended cleanly: finalize the pending response
    pub fn on_completed(&mut self, exchange: ExchangeId) -> Result<Message> {
        self.ensure_current(exchange, "complete", &[ChatState::Streaming])?;
        let Some(pending) = self.pending.take() else {
            return Err(Error::StaleExchange(exchange));
        };
        self.state = ChatState::Idle;

        let message = Message::assistant(pending.accumulated_content, MessageStatus::Complete);
        tracing::debug!(
            "Exchange {} completed ({} fragments)",
            exchange,
            pending.fragments
        );
        self.append_assistant(message.clone());
        self.emit(ChatEvent::ExchangeFinished {
            exchange,
            error: None,
        });
        Ok(message)
    }

    /// The exchange failed: keep any partial text, then record the failure
    pub fn on_failed(&mut self, exchange: ExchangeId, reason: impl fmt::Display) -> Result<()> {
        self.ensure_current(
            exchange,
            "fail",
            &[ChatState::Submitting, ChatState::Streaming],
        )?;
        let Some(pending) = self.pending.take() else {
            return Err(Error::StaleExchange(exchange));
        };
        self.state = ChatState::Idle;

        let reason = reason.to_string();
        tracing::warn!(
            "Exchange {} failed after {} fragments: {}",
            exchange,
            pending.fragments,
            reason
        );
        if !pending.accumulated_content.is_empty() {
            self.append_assistant(Message::assistant(
                pending.accumulated_content,
                MessageStatus::Partial,
            ));
        }
        self.append_assistant(Message::assistant(reason.clone(), MessageStatus::Failed));
        self.emit(ChatEvent::ExchangeFinished {
            exchange,
            error: Some(reason),
        });
        Ok(())
    }

    /// Start over: drop the transcript and any in-flight response
    pub fn reset(&mut self) {
        if let Some(pending) = self.pending.take() {
            tracing::debug!(
                "Discarding exchange {} ({} chars pending)",
                pending.id,
                pending.accumulated_content.len()
            );
        }
        self.messages.clear();
        self.state = ChatState::Idle;
        self.emit(ChatEvent::Reset);
    }

    /// Replace the transcript wholesale. Only allowed while idle.
    pub fn replace_transcript(&mut self, messages: Vec<Message>) -> Result<()> {
        if self.state != ChatState::Idle {
            return Err(Error::RejectedState {
                operation: "replace the transcript",
                state: self.state,
            });
        }
        self.messages = messages;
        self.emit(ChatEvent::TranscriptReplaced {
            message_count: self.messages.len(),
        });
        Ok(())
    }

    fn append_assistant(&mut self, message: Message) {
        self.messages.push(message.clone());
        self.emit(ChatEvent::MessageFinalized { message });
    }

    fn ensure_current(
        &self,
        exchange: ExchangeId,
        operation: &'static str,
        allowed: &[ChatState],
    ) -> Result<()> {
        match &self.pending {
            Some(pending) if pending.id == exchange => {}
            _ => return Err(Error::StaleExchange(exchange)),
        }
        if !allowed.contains(&self.state) {
            return Err(Error::RejectedState {
                operation,
                state: self.state,
            });
        }
        Ok(())
    }
}
