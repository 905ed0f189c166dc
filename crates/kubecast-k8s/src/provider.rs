use std::pin::Pin;

use anyhow::Result;
use async_trait::async_trait;
use futures::io::AsyncRead;

use kubecast_types::{LogTarget, TailOptions};

/// An open log source: the ordered byte stream of one container's output,
/// historical and/or live-following. Reading zero bytes is the terminal
/// end-of-stream signal.
pub type LogByteStream = Pin<Box<dyn AsyncRead + Send>>;

/// Capability to resolve running containers and open their log streams.
///
/// The gatekeeper and the multi-source aggregator consume this seam; tests
/// substitute scripted implementations.
#[async_trait]
pub trait LogSourceProvider: Send + Sync {
    /// Open the log stream for one container.
    async fn open(&self, target: &LogTarget, tail: &TailOptions) -> Result<LogByteStream>;

    /// Resolve the running containers matching any of the image selectors.
    async fn resolve(&self, namespace: &str, image_selectors: &[String])
    -> Result<Vec<LogTarget>>;
}
