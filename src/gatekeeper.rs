//! Request gatekeeper
//!
//! Validates streaming requests, applies the upgrade policy, resolves log
//! sources, performs the WebSocket upgrade, dispatches to the matching
//! relay, and guarantees teardown on every exit path.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use futures::StreamExt;
use futures::stream::SplitStream;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use kubecast_k8s::{LogByteStream, LogSourceProvider};
use kubecast_relay::{FrameWriter, SourceFailure, relay_multiple, relay_single};
use kubecast_types::{LogTarget, StreamRequest, TailOptions};

use crate::params;

/// Origin policy applied before any upgrade.
///
/// Injected state rather than a process-wide setting, so deployments and
/// tests can override it.
#[derive(Clone, Debug)]
pub struct UpgradePolicy {
    allowed_origins: Option<Vec<String>>,
}

impl UpgradePolicy {
    /// Accept any origin.
    pub fn allow_any() -> Self {
        Self {
            allowed_origins: None,
        }
    }

    /// Accept only the listed origins. Requests without an Origin header
    /// still pass: non-browser clients do not send one.
    pub fn allow_list(origins: Vec<String>) -> Self {
        Self {
            allowed_origins: Some(origins),
        }
    }

    fn permits(&self, origin: Option<&str>) -> bool {
        match (&self.allowed_origins, origin) {
            (None, _) => true,
            (Some(_), None) => true,
            (Some(allowed), Some(origin)) => allowed.iter().any(|a| a == origin),
        }
    }
}

/// Shared state behind the streaming endpoints.
pub struct AppState {
    pub provider: Arc<dyn LogSourceProvider>,
    pub policy: UpgradePolicy,
}

/// GET /api/logs: stream one named container.
pub async fn logs(
    State(state): State<Arc<AppState>>,
    Query(pairs): Query<Vec<(String, String)>>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Response {
    match params::single_request(&pairs) {
        Ok(request) => dispatch(state, &headers, ws, request).await,
        Err(e) => (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
    }
}

/// GET /api/logs-multiple: stream every container matched by the selectors.
pub async fn logs_multiple(
    State(state): State<Arc<AppState>>,
    Query(pairs): Query<Vec<(String, String)>>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Response {
    match params::multi_request(&pairs) {
        Ok(request) => dispatch(state, &headers, ws, request).await,
        Err(e) => (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
    }
}

/// Apply the upgrade policy, resolve sources, and hand the connection to the
/// matching relay. Sources are resolved (and, for single mode, opened)
/// before the upgrade so failures surface as plain HTTP errors.
async fn dispatch(
    state: Arc<AppState>,
    headers: &HeaderMap,
    ws: WebSocketUpgrade,
    request: StreamRequest,
) -> Response {
    let origin = headers.get(header::ORIGIN).and_then(|v| v.to_str().ok());
    if !state.policy.permits(origin) {
        warn!(?origin, "rejected upgrade from disallowed origin");
        return (StatusCode::FORBIDDEN, "origin not allowed").into_response();
    }

    match request {
        StreamRequest::Single { target, tail } => {
            let source = match state.provider.open(&target, &tail).await {
                Ok(source) => source,
                Err(e) => {
                    error!(%target, error = ?e, "failed to open log source");
                    return (StatusCode::INTERNAL_SERVER_ERROR, format!("{e:#}")).into_response();
                }
            };

            info!(%target, "streaming single log source");
            ws.on_failed_upgrade(|e| warn!(error = %e, "websocket upgrade failed"))
                .on_upgrade(move |socket| stream_single(socket, source, target))
        }
        StreamRequest::Multi {
            namespace,
            image_selectors,
            tail,
        } => {
            let targets = match state.provider.resolve(&namespace, &image_selectors).await {
                Ok(targets) => targets,
                Err(e) => {
                    error!(%namespace, error = ?e, "failed to resolve selectors");
                    return (StatusCode::INTERNAL_SERVER_ERROR, format!("{e:#}")).into_response();
                }
            };
            if targets.is_empty() {
                return (
                    StatusCode::BAD_REQUEST,
                    "no containers matched the image selectors",
                )
                    .into_response();
            }

            info!(%namespace, count = targets.len(), "streaming aggregated log sources");
            let provider = Arc::clone(&state.provider);
            ws.on_failed_upgrade(|e| warn!(error = %e, "websocket upgrade failed"))
                .on_upgrade(move |socket| stream_multiple(socket, provider, targets, tail))
        }
    }
}

/// Relay one opened source, then tear the connection down.
async fn stream_single(socket: WebSocket, source: LogByteStream, target: LogTarget) {
    let (sink, stream) = socket.split();
    let writer = FrameWriter::new(sink);
    let cancel = CancellationToken::new();
    let watchdog = tokio::spawn(watch_peer(stream, cancel.clone()));

    let result = tokio::select! {
        _ = cancel.cancelled() => {
            info!(%target, "peer closed the connection");
            watchdog.abort();
            return;
        }
        result = relay_single(source, &writer) => result,
    };

    match result {
        Ok(()) => {
            info!(%target, "log source drained");
            if let Err(e) = writer.send_termination().await {
                warn!(%target, error = %e, "close handshake failed");
            }
        }
        Err(e) if e.is_transport() => {
            // No further writes, not even the close handshake.
            warn!(%target, error = %e, "transport write failed");
        }
        Err(e) => {
            // A mid-stream source error ends the connection without a
            // graceful handshake; the client sees it simply close.
            warn!(%target, error = %e, "log source failed mid-stream");
        }
    }

    watchdog.abort();
}

/// Relay an aggregate of sources, then tear the connection down.
async fn stream_multiple(
    socket: WebSocket,
    provider: Arc<dyn LogSourceProvider>,
    targets: Vec<LogTarget>,
    tail: TailOptions,
) {
    let (sink, stream) = socket.split();
    let writer = Arc::new(FrameWriter::new(sink));
    let cancel = CancellationToken::new();
    let watchdog = tokio::spawn(watch_peer(stream, cancel.clone()));

    // Per-source failures arrive off the data path; the remaining sources
    // keep streaming while the monitor records them.
    let (failure_tx, mut failure_rx) = mpsc::unbounded_channel::<SourceFailure>();
    let monitor = tokio::spawn(async move {
        while let Some(failure) = failure_rx.recv().await {
            warn!(target = %failure.target, error = %failure.error, "log source failed");
        }
    });

    let result = relay_multiple(
        provider.as_ref(),
        &targets,
        &tail,
        &writer,
        failure_tx,
        cancel.clone(),
    )
    .await;

    match result {
        Ok(()) if cancel.is_cancelled() => {
            // Peer gone or a write failed; the connection is already dead.
            info!("aggregated stream cancelled");
        }
        Ok(()) => {
            info!("aggregated log sources drained");
            if let Err(e) = writer.send_termination().await {
                warn!(error = %e, "close handshake failed");
            }
        }
        Err(e) => {
            // Nothing was streamed; the connection is still usable for the
            // close handshake.
            error!(error = %e, "aggregated stream failed to start");
            let _ = writer.send_termination().await;
        }
    }

    watchdog.abort();
    let _ = monitor.await;
}

/// Watch the peer half; cancel when the client closes or the transport
/// errors so in-flight reads are abandoned promptly.
async fn watch_peer(mut stream: SplitStream<WebSocket>, cancel: CancellationToken) {
    while let Some(message) = stream.next().await {
        match message {
            Ok(Message::Close(_)) | Err(_) => break,
            // Inbound data is not part of the protocol; ignore it.
            Ok(_) => {}
        }
    }
    cancel.cancel();
}
