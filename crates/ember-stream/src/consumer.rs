//! Byte stream to fragment stream, with a single terminal classification

use std::fmt;
use std::pin::Pin;

use async_stream::stream;
use futures::StreamExt;
use tokio_stream::Stream;

use crate::frame::{Frame, FrameDecoder};

/// Why a stream ended unsuccessfully
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// The transport failed (connection refused or reset, non-success status, body read error)
    Transport(String),
    /// The source ended in the middle of a frame
    Truncated,
    /// The server sent an error frame
    Remote(String),
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::Transport(msg) => write!(f, "Transport error: {}", msg),
            FailureReason::Truncated => write!(f, "Response was cut off mid-stream"),
            FailureReason::Remote(msg) => write!(f, "Generation failed: {}", msg),
        }
    }
}

/// How a stream ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Termination {
    /// Clean end after at least one fragment
    Completed,
    /// Clean end without any fragment
    Empty,
    /// Transport fault, error frame, or truncation
    Failed(FailureReason),
}

impl Termination {
    /// Completed and Empty both count as success
    pub fn is_success(&self) -> bool {
        !matches!(self, Termination::Failed(_))
    }

    /// The failure reason, if any
    pub fn failure(&self) -> Option<&FailureReason> {
        match self {
            Termination::Failed(reason) => Some(reason),
            _ => None,
        }
    }
}

/// Items yielded by [`consume`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamItem {
    /// A decoded text fragment
    Fragment(String),
    /// Terminal classification, always the last item
    Finished(Termination),
}

/// A lazy, single-use stream of fragments followed by one `Finished` item
pub type FragmentStream = Pin<Box<dyn Stream<Item = StreamItem> + Send>>;

fn clean_end(fragments: usize) -> Termination {
    if fragments == 0 {
        Termination::Empty
    } else {
        Termination::Completed
    }
}

/// Drive `source` to completion, yielding fragments as soon as their frame is complete.
///
/// The returned stream owns the source; once it has yielded `Finished` it yields
/// nothing more, and a new `consume` call is needed for another response.
pub fn consume<S, B, E>(source: S) -> FragmentStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: fmt::Display + Send + 'static,
{
    Box::pin(stream! {
        let mut source = Box::pin(source);
        let mut decoder = FrameDecoder::new();
        let mut fragments = 0usize;

        let termination = 'pull: loop {
            match source.next().await {
                Some(Ok(chunk)) => {
                    for frame in decoder.push(chunk.as_ref()) {
                        match frame {
                            Frame::Data(text) => {
                                fragments += 1;
                                yield StreamItem::Fragment(text);
                            }
                            Frame::End => break 'pull clean_end(fragments),
                            Frame::Error(reason) => {
                                break 'pull Termination::Failed(FailureReason::Remote(reason));
                            }
                        }
                    }
                }
                Some(Err(e)) => {
                    tracing::warn!("Stream source failed after {} fragments: {}", fragments, e);
                    break Termination::Failed(FailureReason::Transport(e.to_string()));
                }
                None => {
                    if decoder.has_pending() {
                        let dropped = decoder.discard();
                        tracing::warn!("Discarding {} bytes of unterminated frame", dropped);
                        break Termination::Failed(FailureReason::Truncated);
                    }
                    break clean_end(fragments);
                }
            }
        };

        tracing::debug!("Stream finished: {:?} ({} fragments)", termination, fragments);
        yield StreamItem::Finished(termination);
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{encode_data, encode_end, encode_error};

    async fn collect(items: FragmentStream) -> (Vec<String>, Termination) {
        let items: Vec<StreamItem> = items.collect().await;
        let mut fragments = Vec::new();
        let mut termination = None;
        for item in items {
            assert!(termination.is_none(), "item after Finished");
            match item {
                StreamItem::Fragment(text) => fragments.push(text),
                StreamItem::Finished(t) => termination = Some(t),
            }
        }
        (fragments, termination.expect("stream must finish"))
    }

    fn chunks(parts: &[&str]) -> Vec<Result<Vec<u8>, String>> {
        parts.iter().map(|p| Ok(p.as_bytes().to_vec())).collect()
    }

    #[tokio::test]
    async fn test_completed() {
        let wire = format!("{}{}", encode_data("Hel").unwrap(), encode_data("lo").unwrap());
        let source = futures::stream::iter(chunks(&[wire.as_str()]));
        let (fragments, termination) = collect(consume(source)).await;
        assert_eq!(fragments, vec!["Hel", "lo"]);
        assert_eq!(termination, Termination::Completed);
    }

    #[tokio::test]
    async fn test_fragments_across_chunks() {
        let source = futures::stream::iter(chunks(&["da", "ta: 4", "\n", "\ndata:", " 2\n\n"]));
        let (fragments, termination) = collect(consume(source)).await;
        assert_eq!(fragments, vec!["4", "2"]);
        assert_eq!(termination, Termination::Completed);
    }

    #[tokio::test]
    async fn test_empty_source() {
        let source = futures::stream::iter(chunks(&[]));
        let (fragments, termination) = collect(consume(source)).await;
        assert!(fragments.is_empty());
        assert_eq!(termination, Termination::Empty);
        assert!(termination.is_success());
    }

    #[tokio::test]
    async fn test_only_ignored_lines_is_empty() {
        let source = futures::stream::iter(chunks(&[": ping\n\n", "retry: 10\n"]));
        let (_, termination) = collect(consume(source)).await;
        assert_eq!(termination, Termination::Empty);
    }

    #[tokio::test]
    async fn test_transport_fault_after_fragments() {
        let source = futures::stream::iter(vec![
            Ok(b"data: Hel\n\n".to_vec()),
            Err("connection reset".to_string()),
            Ok(b"data: never\n\n".to_vec()),
        ]);
        let (fragments, termination) = collect(consume(source)).await;
        assert_eq!(fragments, vec!["Hel"]);
        assert_eq!(
            termination,
            Termination::Failed(FailureReason::Transport("connection reset".to_string()))
        );
    }

    #[tokio::test]
    async fn test_truncated_tail() {
        let source = futures::stream::iter(chunks(&["data: Hel\n\n", "data: lo"]));
        let (fragments, termination) = collect(consume(source)).await;
        assert_eq!(fragments, vec!["Hel"]);
        assert_eq!(termination, Termination::Failed(FailureReason::Truncated));
    }

    #[tokio::test]
    async fn test_whitespace_tail_is_clean_end() {
        let source = futures::stream::iter(chunks(&["data: 4\n", "\r\n  "]));
        let (fragments, termination) = collect(consume(source)).await;
        assert_eq!(fragments, vec!["4"]);
        assert_eq!(termination, Termination::Completed);
    }

    #[tokio::test]
    async fn test_unterminated_ignored_line_is_truncated() {
        let source = futures::stream::iter(chunks(&["data: 4\n\n", ": ping"]));
        let (fragments, termination) = collect(consume(source)).await;
        assert_eq!(fragments, vec!["4"]);
        assert_eq!(termination, Termination::Failed(FailureReason::Truncated));
    }

    #[tokio::test]
    async fn test_error_frame() {
        let wire = format!(
            "{}{}{}",
            encode_data("x").unwrap(),
            encode_error("oom"),
            encode_data("y").unwrap()
        );
        let source = futures::stream::iter(chunks(&[wire.as_str()]));
        let (fragments, termination) = collect(consume(source)).await;
        assert_eq!(fragments, vec!["x"]);
        assert_eq!(
            termination,
            Termination::Failed(FailureReason::Remote("oom".to_string()))
        );
    }

    #[tokio::test]
    async fn test_end_frame_stops_consumption() {
        let wire = format!(
            "{}{}{}",
            encode_data("4").unwrap(),
            encode_end(),
            encode_data("ignored").unwrap()
        );
        let source = futures::stream::iter(chunks(&[wire.as_str(), "data: also ignored"]));
        let (fragments, termination) = collect(consume(source)).await;
        assert_eq!(fragments, vec!["4"]);
        assert_eq!(termination, Termination::Completed);
    }

    #[tokio::test]
    async fn test_fragments_are_lazy() {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel::<Result<Vec<u8>, String>>();
        let mut items = consume(tokio_stream::wrappers::UnboundedReceiverStream::new(rx));

        tx.send(Ok(b"data: first\n\n".to_vec())).unwrap();
        assert_eq!(items.next().await, Some(StreamItem::Fragment("first".into())));

        tx.send(Ok(b"data: second\n\n".to_vec())).unwrap();
        assert_eq!(items.next().await, Some(StreamItem::Fragment("second".into())));

        drop(tx);
        assert_eq!(items.next().await, Some(StreamItem::Finished(Termination::Completed)));
        assert_eq!(items.next().await, None);
    }

    #[test]
    fn test_failure_display() {
        assert_eq!(
            FailureReason::Transport("refused".into()).to_string(),
            "Transport error: refused"
        );
        assert_eq!(
            Termination::Failed(FailureReason::Truncated).failure(),
            Some(&FailureReason::Truncated)
        );
        assert!(Termination::Completed.failure().is_none());
    }
}
