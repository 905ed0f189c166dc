//! Relay core for kubecast
//!
//! This crate turns open-ended container log streams into framed WebSocket
//! messages: the frame writer that owns the connection's sink half, the
//! single-source relay, and the multi-source aggregator.

mod error;
mod multi;
mod single;
mod sink;
mod ws;

pub use error::RelayError;
pub use multi::{SourceFailure, relay_multiple};
pub use single::{CHUNK_SIZE, relay_single};
pub use sink::{CLOSE_DEADLINE, FrameWriter, MessageSink, SinkError};
pub use ws::WsSink;

#[cfg(test)]
mod test_support;
