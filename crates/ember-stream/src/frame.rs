//! Line-oriented wire framing
//!
//! Each line of the response body is one frame. Lines beginning with the data
//! sentinel carry a text fragment; a small set of control lines mark an explicit
//! end or a server-side error. Everything else (blank separators, comments,
//! unknown fields) is ignored so that servers can add out-of-band lines freely.

use crate::error::{Error, Result};

/// Prefix of a line carrying a text fragment
pub const DATA_PREFIX: &str = "data:";

/// Prefix of a line reporting a server-side failure
pub const ERROR_PREFIX: &str = "error:";

/// Line marking an explicit end of the response
pub const END_MARKER: &str = "event: end";

/// A single decoded unit from the wire
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// A text fragment
    Data(String),
    /// Explicit end of stream
    End,
    /// Server-reported failure with a reason
    Error(String),
}

/// Output of one decode step
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Decoded {
    /// Complete frames, in arrival order
    pub frames: Vec<Frame>,
    /// Unterminated tail to carry into the next step
    pub remainder: Vec<u8>,
}

/// Decode every complete line in `carry + chunk`.
///
/// Buffering is byte-based, so a multi-byte character split across chunks is
/// reassembled before its line is decoded.
pub fn decode(carry: &[u8], chunk: &[u8]) -> Decoded {
    if chunk.is_empty() {
        return Decoded {
            frames: Vec::new(),
            remainder: carry.to_vec(),
        };
    }

    let mut buffer = Vec::with_capacity(carry.len() + chunk.len());
    buffer.extend_from_slice(carry);
    buffer.extend_from_slice(chunk);

    let mut frames = Vec::new();
    let mut start = 0;
    while let Some(offset) = buffer[start..].iter().position(|&b| b == b'\n') {
        let end = start + offset;
        if let Some(frame) = parse_line(&buffer[start..end]) {
            frames.push(frame);
        }
        start = end + 1;
    }
    buffer.drain(..start);

    Decoded {
        frames,
        remainder: buffer,
    }
}

/// Classify one line (without its `\n`). Returns `None` for ignored lines.
pub fn parse_line(line: &[u8]) -> Option<Frame> {
    let line = match line {
        [rest @ .., b'\r'] => rest,
        _ => line,
    };
    let line = String::from_utf8_lossy(line);

    if let Some(payload) = line.strip_prefix(DATA_PREFIX) {
        // One space after the colon belongs to the framing, anything beyond is payload
        let payload = payload.strip_prefix(' ').unwrap_or(payload);
        return Some(Frame::Data(payload.to_string()));
    }
    if let Some(reason) = line.strip_prefix(ERROR_PREFIX) {
        return Some(Frame::Error(reason.trim().to_string()));
    }
    if line.trim_end() == END_MARKER {
        return Some(Frame::End);
    }
    None
}

/// Incremental decoder holding the carry-over buffer between chunks
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buffer: Vec<u8>,
}

impl FrameDecoder {
    /// Create an empty decoder
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk and return the frames it completed
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Frame> {
        let Decoded { frames, remainder } = decode(&self.buffer, chunk);
        self.buffer = remainder;
        frames
    }

    /// Whether an unterminated frame is buffered. Trailing whitespace alone does not count.
    pub fn has_pending(&self) -> bool {
        self.buffer.iter().any(|b| !b.is_ascii_whitespace())
    }

    /// Drop any buffered partial frame, returning how many bytes were discarded
    pub fn discard(&mut self) -> usize {
        let dropped = self.buffer.len();
        self.buffer.clear();
        dropped
    }
}

/// Wire form of a data frame.
///
/// A frame ends at the first line break, so fragments containing `\n` or `\r`
/// cannot be carried and are rejected.
pub fn encode_data(fragment: &str) -> Result<String> {
    if fragment.contains(|c| c == '\n' || c == '\r') {
        return Err(Error::InvalidFragment(fragment.to_string()));
    }
    Ok(format!("{} {}\n\n", DATA_PREFIX, fragment))
}

/// Wire form of the explicit end marker
pub fn encode_end() -> String {
    format!("{}\n\n", END_MARKER)
}

/// Wire form of a server error frame
pub fn encode_error(reason: &str) -> String {
    format!("{} {}\n\n", ERROR_PREFIX, reason.replace('\n', " "))
}
