//! Bridge between a cooperatively-scheduled synthesis producer and a
//! pull-based consumer.
//!
//! The producer runs to completion on its own tokio task (one per stream,
//! never shared across requests) and hands audio chunks through a
//! capacity-1 channel: a bounded lookahead of one, no prefetch queue. The
//! consumer side is usable both as a `futures::Stream` (driving a chunked
//! HTTP body) and as a blocking pull for thread-based writers. Dropping the
//! consumer aborts the producer task, so the execution context is released
//! on every exit path, including mid-stream client disconnects.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures::{Stream, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::{EventStream, TtsError, TtsEvent};

pub struct AudioStream {
    rx: mpsc::Receiver<Result<Vec<u8>, TtsError>>,
    producer: JoinHandle<()>,
}

impl AudioStream {
    /// Spawns the producer and returns the consumer half.
    ///
    /// Audio chunks are forwarded in production order; metadata events are
    /// discarded. A producer error is forwarded once and terminates the
    /// sequence. Exhaustion terminates it cleanly, with no trailing empty
    /// chunk.
    pub fn spawn(mut events: EventStream) -> Self {
        let (tx, rx) = mpsc::channel(1);
        let producer = tokio::spawn(async move {
            while let Some(item) = events.next().await {
                let forwarded = match item {
                    Ok(TtsEvent::Audio(chunk)) => Ok(chunk),
                    Ok(TtsEvent::Metadata(_)) => continue,
                    Err(e) => Err(e),
                };
                let failed = forwarded.is_err();
                if tx.send(forwarded).await.is_err() {
                    // Consumer dropped; nothing left to produce for.
                    return;
                }
                if failed {
                    return;
                }
            }
        });
        Self { rx, producer }
    }

    /// Pulls the next chunk, blocking the calling thread.
    ///
    /// For thread-based consumers only; calling this from an async context
    /// panics (tokio refuses to block a runtime worker).
    pub fn blocking_next(&mut self) -> Option<Result<Vec<u8>, TtsError>> {
        self.rx.blocking_recv()
    }
}

impl Stream for AudioStream {
    type Item = Result<Vec<u8>, TtsError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

impl Drop for AudioStream {
    fn drop(&mut self) {
        self.producer.abort();
    }
}
