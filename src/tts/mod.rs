//! Speech synthesis: the event producer contract and the streaming bridge.

pub mod bridge;
pub mod edge;

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use thiserror::Error;

/// An item emitted by a synthesis producer.
///
/// Only `Audio` carries response payload; `Metadata` covers the service's
/// boundary and bookkeeping messages, which the bridge discards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TtsEvent {
    /// An opaque, ordered fragment of the encoded audio stream.
    Audio(Vec<u8>),
    /// A non-audio service message (turn boundaries, offsets, ...).
    Metadata(String),
}

#[derive(Debug, Error)]
pub enum TtsError {
    #[error("synthesis connection failed: {0}")]
    Connect(String),
    #[error("synthesis protocol error: {0}")]
    Protocol(String),
    #[error("synthesis stream failed: {0}")]
    Stream(String),
}

/// A finite, non-restartable sequence of synthesis events.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<TtsEvent, TtsError>> + Send>>;

/// Abstraction over speech synthesis backends.
///
/// `open` performs the connection and handshake, so provider failures
/// surface here, before any byte reaches the response; everything after
/// that is a stream concern.
#[async_trait]
pub trait Synthesizer: Send + Sync {
    async fn open(&self, text: &str, voice: &str) -> Result<EventStream, TtsError>;
}

pub use bridge::AudioStream;
pub use edge::EdgeSynthesizer;
