//! ember-stream: wire framing and streaming consumption for the ember chat protocol
//!
//! This crate turns the raw byte stream of a generation endpoint into an ordered,
//! lazy sequence of text fragments followed by exactly one terminal classification.

pub mod consumer;
pub mod error;
pub mod frame;
pub mod transport;

pub use consumer::{FailureReason, FragmentStream, StreamItem, Termination, consume};
pub use error::{Error, Result};
pub use frame::{Frame, FrameDecoder};
pub use transport::{ByteStream, HttpTransport, Transport};
