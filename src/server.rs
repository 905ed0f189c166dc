//! HTTP server wiring
//!
//! Builds the axum router and binds the listener. `build_app` is separated
//! from `run_server` so tests can drive the router without TCP.

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use tokio::net::TcpListener;
use tracing::info;

use crate::gatekeeper::{self, AppState};

/// Build the application router.
pub fn build_app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/logs", get(gatekeeper::logs))
        .route("/api/logs-multiple", get(gatekeeper::logs_multiple))
        .with_state(state)
}

/// Bind and serve until the process exits.
pub async fn run_server(host: &str, port: u16, state: Arc<AppState>) -> Result<(), std::io::Error> {
    let app = build_app(state);

    let listener = TcpListener::bind(format!("{host}:{port}")).await?;
    info!(host, port, "kubecast listening");

    axum::serve(listener, app).await
}
