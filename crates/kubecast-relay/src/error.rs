use thiserror::Error;

use crate::sink::SinkError;

/// Why a relay ended other than by end-of-stream.
#[derive(Debug, Error)]
pub enum RelayError {
    /// Reading from a log source failed mid-stream.
    #[error("log source read failed: {0}")]
    Source(#[from] std::io::Error),

    /// Opening the log sources failed before any frame was written.
    #[error("failed to open log sources: {0:#}")]
    Open(anyhow::Error),

    /// The transport rejected a write. The connection is dead.
    #[error("transport write failed: {0}")]
    Transport(#[from] SinkError),
}

impl RelayError {
    /// True when the duplex connection itself is unusable and no further
    /// writes, including the close handshake, may be attempted.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}
