use std::sync::Arc;

use futures::future::try_join_all;
use futures::io::AsyncReadExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use kubecast_k8s::{LogByteStream, LogSourceProvider};
use kubecast_types::{LogTarget, TailOptions};

use crate::error::RelayError;
use crate::single::CHUNK_SIZE;
use crate::sink::{FrameWriter, MessageSink};

/// A failure from one source, reported off the data path.
#[derive(Debug)]
pub struct SourceFailure {
    pub target: LogTarget,
    pub error: RelayError,
}

/// Fan logs from every target into one frame writer concurrently.
///
/// Sources are opened up front; any open failure aborts the whole aggregate
/// before a single frame is written. After that, one worker per source feeds
/// the shared writer until its source ends. Per-source FIFO is preserved;
/// there is no ordering across sources.
///
/// A read failure in one source is reported on `failures` and the others
/// keep streaming. A write failure cancels `cancel` so every worker stops
/// promptly, since the connection itself is dead. Cancelling the token from
/// outside (remote peer gone) abandons all reads the same way.
pub async fn relay_multiple<S>(
    provider: &dyn LogSourceProvider,
    targets: &[LogTarget],
    tail: &TailOptions,
    writer: &Arc<FrameWriter<S>>,
    failures: mpsc::UnboundedSender<SourceFailure>,
    cancel: CancellationToken,
) -> Result<(), RelayError>
where
    S: MessageSink + 'static,
{
    let opens = targets.iter().map(|target| provider.open(target, tail));
    let streams = try_join_all(opens).await.map_err(RelayError::Open)?;

    let mut workers: Vec<JoinHandle<()>> = Vec::with_capacity(targets.len());
    for (target, stream) in targets.iter().cloned().zip(streams) {
        let writer = Arc::clone(writer);
        let failures = failures.clone();
        let cancel = cancel.clone();
        workers.push(tokio::spawn(async move {
            relay_source(target, stream, writer, failures, cancel).await;
        }));
    }

    for worker in workers {
        let _ = worker.await;
    }
    Ok(())
}

/// One worker: pump a single source until EOF, error, or cancellation.
async fn relay_source<S>(
    target: LogTarget,
    mut stream: LogByteStream,
    writer: Arc<FrameWriter<S>>,
    failures: mpsc::UnboundedSender<SourceFailure>,
    cancel: CancellationToken,
) where
    S: MessageSink,
{
    let mut buf = vec![0u8; CHUNK_SIZE];
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,

            result = stream.read(&mut buf) => {
                match result {
                    Ok(0) => {
                        debug!(%target, "log source ended");
                        break;
                    }
                    Ok(n) => {
                        if let Err(e) = writer.write(&buf[..n]).await {
                            // Connection is dead; stop every worker.
                            cancel.cancel();
                            let _ = failures.send(SourceFailure {
                                target,
                                error: e.into(),
                            });
                            break;
                        }
                    }
                    Err(e) => {
                        let _ = failures.send(SourceFailure {
                            target,
                            error: RelayError::Source(e),
                        });
                        break;
                    }
                }
            }
        }
    }
}
