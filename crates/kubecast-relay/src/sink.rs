use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::Mutex;

/// Hard deadline for delivering the close handshake during teardown.
pub const CLOSE_DEADLINE: Duration = Duration::from_secs(5);

/// Error from the underlying message transport.
#[derive(Debug, Error)]
pub enum SinkError {
    /// The transport rejected or failed a send. The connection is dead;
    /// callers must not retry.
    #[error("transport send failed: {0}")]
    Send(String),

    /// The close handshake did not complete within [`CLOSE_DEADLINE`].
    #[error("close handshake timed out")]
    Deadline,
}

/// A message-framed transport carrying binary frames and a close handshake.
#[async_trait]
pub trait MessageSink: Send {
    /// Send one binary frame.
    async fn send_binary(&mut self, payload: Vec<u8>) -> Result<(), SinkError>;

    /// Send the close handshake with a normal-closure code.
    async fn send_close(&mut self) -> Result<(), SinkError>;
}

/// Writes log chunks as discrete binary frames on one duplex connection.
///
/// Writes are serialized internally so aggregator workers can share one
/// writer; the underlying transport does not support concurrent writers.
pub struct FrameWriter<S> {
    sink: Mutex<S>,
}

impl<S: MessageSink> FrameWriter<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink: Mutex::new(sink),
        }
    }

    /// Send one chunk as exactly one binary frame.
    ///
    /// A frame is atomic: it is sent whole or the write fails and the
    /// connection must be treated as dead.
    pub async fn write(&self, chunk: &[u8]) -> Result<(), SinkError> {
        let mut sink = self.sink.lock().await;
        sink.send_binary(chunk.to_vec()).await
    }

    /// Send the termination signal, bounded by [`CLOSE_DEADLINE`].
    ///
    /// The deadline covers lock acquisition too, so a stuck in-flight write
    /// cannot extend teardown past it.
    pub async fn send_termination(&self) -> Result<(), SinkError> {
        let close = async {
            let mut sink = self.sink.lock().await;
            sink.send_close().await
        };
        match tokio::time::timeout(CLOSE_DEADLINE, close).await {
            Ok(result) => result,
            Err(_) => Err(SinkError::Deadline),
        }
    }

    /// Consume the writer and return the transport.
    pub fn into_inner(self) -> S {
        self.sink.into_inner()
    }
}
