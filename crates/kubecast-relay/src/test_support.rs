//! Scripted transports, sources, and providers for relay tests.

use std::collections::{HashMap, HashSet, VecDeque};
use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use anyhow::Result;
use async_trait::async_trait;
use futures::io::AsyncRead;

use kubecast_k8s::{LogByteStream, LogSourceProvider};
use kubecast_types::{LogTarget, TailOptions};

use crate::sink::{MessageSink, SinkError};

/// Everything observed on a scripted sink, shared with the test body.
#[derive(Clone, Default)]
pub struct SinkLog {
    frames: Arc<Mutex<Vec<Vec<u8>>>>,
    closed: Arc<AtomicBool>,
}

impl SinkLog {
    pub fn frames(&self) -> Vec<Vec<u8>> {
        self.frames.lock().unwrap().clone()
    }

    pub fn closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

/// Sink that records frames; optionally fails once `fail_after` frames have
/// been recorded, or stalls forever on close.
pub struct ScriptedSink {
    log: SinkLog,
    fail_after: Option<usize>,
    stall_close: bool,
}

impl ScriptedSink {
    pub fn recording(log: SinkLog) -> Self {
        Self {
            log,
            fail_after: None,
            stall_close: false,
        }
    }

    pub fn failing_after(log: SinkLog, frames: usize) -> Self {
        Self {
            log,
            fail_after: Some(frames),
            stall_close: false,
        }
    }

    pub fn stalled(log: SinkLog) -> Self {
        Self {
            log,
            fail_after: None,
            stall_close: true,
        }
    }
}

#[async_trait]
impl MessageSink for ScriptedSink {
    async fn send_binary(&mut self, payload: Vec<u8>) -> Result<(), SinkError> {
        let mut frames = self.log.frames.lock().unwrap();
        if let Some(limit) = self.fail_after {
            if frames.len() >= limit {
                return Err(SinkError::Send("scripted failure".to_string()));
            }
        }
        frames.push(payload);
        Ok(())
    }

    async fn send_close(&mut self) -> Result<(), SinkError> {
        if self.stall_close {
            futures::future::pending::<()>().await;
        }
        self.log.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Source that replays scripted read results, then signals end-of-stream.
pub struct ScriptedSource {
    chunks: VecDeque<io::Result<Vec<u8>>>,
    reads: Arc<AtomicUsize>,
}

impl ScriptedSource {
    pub fn new(chunks: Vec<io::Result<Vec<u8>>>) -> Self {
        Self {
            chunks: chunks.into(),
            reads: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn ok(chunks: &[&[u8]]) -> Self {
        Self::new(chunks.iter().map(|c| Ok(c.to_vec())).collect())
    }

    /// Counter of reads served, shared with the test body.
    pub fn reads_handle(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.reads)
    }
}

impl AsyncRead for ScriptedSource {
    fn poll_read(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut [u8],
    ) -> Poll<io::Result<usize>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        match self.chunks.pop_front() {
            Some(Ok(chunk)) => {
                buf[..chunk.len()].copy_from_slice(&chunk);
                Poll::Ready(Ok(chunk.len()))
            }
            Some(Err(e)) => Poll::Ready(Err(e)),
            None => Poll::Ready(Ok(0)),
        }
    }
}

/// Source that yields the same chunk forever, returning control to the
/// scheduler between reads so cancellation can run.
struct EndlessSource {
    chunk: Vec<u8>,
    yield_next: bool,
}

impl AsyncRead for EndlessSource {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut [u8],
    ) -> Poll<io::Result<usize>> {
        if self.yield_next {
            self.yield_next = false;
            cx.waker().wake_by_ref();
            return Poll::Pending;
        }
        self.yield_next = true;
        buf[..self.chunk.len()].copy_from_slice(&self.chunk);
        Poll::Ready(Ok(self.chunk.len()))
    }
}

/// Provider serving scripted sources keyed by pod name.
#[derive(Default)]
pub struct ScriptedProvider {
    sources: Mutex<HashMap<String, Vec<io::Result<Vec<u8>>>>>,
    endless: Mutex<HashMap<String, Vec<u8>>>,
    fail_open: HashSet<String>,
    targets: Vec<LogTarget>,
}

impl ScriptedProvider {
    pub fn with_source(self, pod: &str, chunks: Vec<io::Result<Vec<u8>>>) -> Self {
        self.sources.lock().unwrap().insert(pod.to_string(), chunks);
        self
    }

    pub fn with_endless_source(self, pod: &str, chunk: &[u8]) -> Self {
        self.endless
            .lock()
            .unwrap()
            .insert(pod.to_string(), chunk.to_vec());
        self
    }

    pub fn with_open_failure(mut self, pod: &str) -> Self {
        self.fail_open.insert(pod.to_string());
        self
    }

    pub fn with_targets(mut self, targets: Vec<LogTarget>) -> Self {
        self.targets = targets;
        self
    }
}

#[async_trait]
impl LogSourceProvider for ScriptedProvider {
    async fn open(&self, target: &LogTarget, _tail: &TailOptions) -> Result<LogByteStream> {
        if self.fail_open.contains(&target.pod) {
            anyhow::bail!("scripted open failure for {}", target.pod);
        }
        if let Some(chunk) = self.endless.lock().unwrap().remove(&target.pod) {
            return Ok(Box::pin(EndlessSource {
                chunk,
                yield_next: false,
            }) as LogByteStream);
        }
        let chunks = self
            .sources
            .lock()
            .unwrap()
            .remove(&target.pod)
            .ok_or_else(|| anyhow::anyhow!("no scripted source for {}", target.pod))?;
        Ok(Box::pin(ScriptedSource::new(chunks)) as LogByteStream)
    }

    async fn resolve(
        &self,
        _namespace: &str,
        _image_selectors: &[String],
    ) -> Result<Vec<LogTarget>> {
        Ok(self.targets.clone())
    }
}
