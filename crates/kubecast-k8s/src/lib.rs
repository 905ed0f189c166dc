//! Kubernetes log source provider for kubecast
//!
//! This crate resolves containers from the cluster API and opens their log
//! streams. The gateway consumes it through the [`LogSourceProvider`] trait.

mod client;
mod provider;

pub use client::KubeProvider;
pub use provider::{LogByteStream, LogSourceProvider};

// Re-export types that are used in our public API
pub use kubecast_types::{LogTarget, TailOptions};
