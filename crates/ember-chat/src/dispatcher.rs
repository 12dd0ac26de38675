//! Runs one exchange at a time from prompt to finalized transcript entry

use std::sync::Arc;
use std::time::{Duration, Instant};

use ember_stream::{FailureReason, StreamItem, Termination, Transport, consume};
use futures::StreamExt;
use tokio::sync::broadcast;

use crate::conversation::{Conversation, ExchangeId};
use crate::error::Result;
use crate::events::ChatEvent;

/// Outcome of a finished exchange
#[derive(Debug, Clone)]
pub struct ExchangeReport {
    pub exchange: ExchangeId,
    pub termination: Termination,
    /// Fragments applied to the pending response
    pub fragments: usize,
    pub elapsed: Duration,
    /// The server refused or could not be reached because it is not ready
    pub server_unavailable: bool,
}

/// Wires a [`Transport`] through the stream consumer into a [`Conversation`]
pub struct Dispatcher {
    conversation: Conversation,
    transport: Arc<dyn Transport>,
}

impl Dispatcher {
    /// Create a dispatcher with a fresh conversation
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self::with_conversation(Conversation::new(), transport)
    }

    pub fn with_conversation(conversation: Conversation, transport: Arc<dyn Transport>) -> Self {
        Self {
            conversation,
            transport,
        }
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn conversation_mut(&mut self) -> &mut Conversation {
        &mut self.conversation
    }

    /// Subscribe to conversation events
    pub fn subscribe(&self) -> broadcast::Receiver<ChatEvent> {
        self.conversation.subscribe()
    }

    /// Send a prompt and stream the response into the transcript.
    ///
    /// Returns `Err` only for usage errors (busy conversation, blank prompt).
    /// Transport and protocol failures end up in the transcript and in the
    /// report's `termination`.
    pub async fn send(&mut self, prompt: &str) -> Result<ExchangeReport> {
        let started = Instant::now();
        let exchange = self.conversation.submit(prompt)?;
        let prompt = prompt.trim();

        let body = match self.transport.open(prompt).await {
            Ok(body) => body,
            Err(e) => {
                let server_unavailable = e.is_unavailable();
                let reason = FailureReason::Transport(e.to_string());
                self.conversation.on_failed(exchange, &reason)?;
                return Ok(ExchangeReport {
                    exchange,
                    termination: Termination::Failed(reason),
                    fragments: 0,
                    elapsed: started.elapsed(),
                    server_unavailable,
                });
            }
        };
        self.conversation.begin_streaming(exchange)?;

        let mut items = consume(body);
        let mut fragments = 0;
        let mut termination = Termination::Failed(FailureReason::Truncated);
        while let Some(item) = items.next().await {
            match item {
                StreamItem::Fragment(text) => {
                    self.conversation.on_fragment(exchange, &text)?;
                    fragments += 1;
                }
                StreamItem::Finished(t) => {
                    termination = t;
                    break;
                }
            }
        }

        match termination.failure() {
            Some(reason) => self.conversation.on_failed(exchange, reason)?,
            None => {
                self.conversation.on_completed(exchange)?;
            }
        }

        Ok(ExchangeReport {
            exchange,
            termination,
            fragments,
            elapsed: started.elapsed(),
            server_unavailable: false,
        })
    }
}
