//! Shared types for kubecast
//!
//! This crate contains data structures used across multiple kubecast crates.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Default number of historical log lines replayed per source before
/// following new output.
pub const DEFAULT_TAIL_LINES: i64 = 100;

/// One concrete container whose log stream can be opened.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LogTarget {
    pub namespace: String,
    pub pod: String,
    pub container: String,
}

impl LogTarget {
    pub fn new(namespace: String, pod: String, container: String) -> Self {
        Self {
            namespace,
            pod,
            container,
        }
    }
}

impl fmt::Display for LogTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.namespace, self.pod, self.container)
    }
}

/// How much history a source replays and whether it follows new output.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TailOptions {
    /// Historical lines to replay per source; `None` replays everything.
    pub tail_lines: Option<i64>,

    /// Keep the stream open for new output after the history is replayed.
    pub follow: bool,
}

impl Default for TailOptions {
    fn default() -> Self {
        Self {
            tail_lines: Some(DEFAULT_TAIL_LINES),
            follow: true,
        }
    }
}

impl TailOptions {
    /// Default options with an explicit tail limit.
    pub fn with_tail(tail_lines: i64) -> Self {
        Self {
            tail_lines: Some(tail_lines),
            ..Self::default()
        }
    }
}

/// Validated parameters of one inbound streaming request.
///
/// Exactly one mode is selected per request. Construction happens after
/// parameter validation, so the required fields for the selected mode are
/// always present and non-empty.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StreamRequest {
    /// Stream one named container.
    Single { target: LogTarget, tail: TailOptions },

    /// Stream every container matched by the image selectors in a namespace.
    Multi {
        namespace: String,
        image_selectors: Vec<String>,
        tail: TailOptions,
    },
}

impl StreamRequest {
    /// Tail options for either mode.
    pub fn tail(&self) -> TailOptions {
        match self {
            Self::Single { tail, .. } => *tail,
            Self::Multi { tail, .. } => *tail,
        }
    }
}
