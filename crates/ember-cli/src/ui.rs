//! Plain terminal rendering of conversation events

use std::io::{self, Write};

use ember_chat::{ChatEvent, ExchangeId, Message, MessageStatus, Role};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

/// Render a transcript for display after loading
pub fn render_transcript(messages: &[Message]) -> String {
    let mut output = String::new();
    for message in messages {
        let marker = match message.status {
            MessageStatus::Complete => "",
            MessageStatus::Partial => " (partial)",
            MessageStatus::Failed => " (failed)",
        };
        output.push_str(&format!(
            "{}{}: {}\n",
            message.role.label(),
            marker,
            message.content
        ));
    }
    output
}

/// Terminal output for one event
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Output {
    pub stdout: String,
    pub stderr: Option<String>,
    /// The exchange is over and everything for it has been rendered
    pub finished: bool,
}

/// Tracks how much of the in-flight response is already on screen.
///
/// Output is derived from the accumulated content carried by each event rather
/// than from individual fragments, so events skipped by a lagging receiver are
/// caught up by the next one.
#[derive(Debug, Default)]
pub struct LiveView {
    exchange: Option<ExchangeId>,
    printed: usize,
}

impl LiveView {
    pub fn apply(&mut self, event: &ChatEvent) -> Output {
        let mut out = Output::default();
        match event {
            ChatEvent::UserMessage { exchange, .. } | ChatEvent::StreamingStarted { exchange } => {
                self.start(*exchange);
            }
            ChatEvent::Preview {
                exchange, content, ..
            } => {
                if self.exchange != Some(*exchange) {
                    self.start(*exchange);
                }
                out.stdout = self.catch_up(content);
            }
            ChatEvent::MessageFinalized { message } if message.role == Role::Assistant => {
                match message.status {
                    MessageStatus::Complete => out.stdout = self.catch_up(&message.content),
                    MessageStatus::Partial => {
                        out.stdout = self.catch_up(&message.content);
                        out.stderr = Some("\n[partial response kept]".to_string());
                    }
                    MessageStatus::Failed => {
                        out.stderr = Some(format!("\n[error] {}", message.content));
                    }
                }
            }
            ChatEvent::ExchangeFinished { .. } => {
                out.stdout.push('\n');
                *self = Self::default();
            }
            ChatEvent::Reset | ChatEvent::TranscriptReplaced { .. } => *self = Self::default(),
            ChatEvent::MessageFinalized { .. } => {}
        }
        out.finished = event.is_terminal();
        out
    }

    fn start(&mut self, exchange: ExchangeId) {
        self.exchange = Some(exchange);
        self.printed = 0;
    }

    /// The part of `content` not printed yet
    fn catch_up(&mut self, content: &str) -> String {
        match content.get(self.printed..) {
            Some(rest) if !rest.is_empty() => {
                self.printed = content.len();
                rest.to_string()
            }
            _ => String::new(),
        }
    }
}

/// Feed events through a [`LiveView`] until the channel closes
async fn render_events(
    mut events: broadcast::Receiver<ChatEvent>,
    mut sink: impl FnMut(Output),
) {
    let mut view = LiveView::default();
    loop {
        let event = match events.recv().await {
            Ok(event) => event,
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::debug!("Renderer skipped {} events, catching up", skipped);
                continue;
            }
            Err(broadcast::error::RecvError::Closed) => break,
        };
        sink(view.apply(&event));
    }
}

/// Print events as they arrive.
///
/// The returned receiver gets one `()` per finished exchange, once everything
/// for that exchange has been printed.
pub fn spawn_renderer(
    events: broadcast::Receiver<ChatEvent>,
) -> (JoinHandle<()>, mpsc::UnboundedReceiver<()>) {
    let (done_tx, done_rx) = mpsc::unbounded_channel();
    let handle = tokio::spawn(render_events(events, move |out| {
        if !out.stdout.is_empty() {
            print!("{}", out.stdout);
            let _ = io::stdout().flush();
        }
        if let Some(note) = out.stderr {
            eprintln!("{}", note);
        }
        if out.finished {
            let _ = done_tx.send(());
        }
    }));
    (handle, done_rx)
}
