use std::sync::Arc;

use anyhow::Result;
use clap::Parser;

use kubecast_k8s::KubeProvider;

mod gatekeeper;
mod params;
mod server;


use gatekeeper::{AppState, UpgradePolicy};

/// Kubecast - a WebSocket gateway for streaming Kubernetes container logs
#[derive(Parser, Debug)]
#[command(name = "kubecast")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Address to bind
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Port to listen on
    #[arg(long, default_value = "8090")]
    port: u16,

    /// Origin allowed to upgrade (repeatable); any origin when omitted
    #[arg(long = "allow-origin", value_name = "ORIGIN")]
    allow_origins: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let result = run_app(args).await;

    if let Err(e) = &result {
        eprintln!("Error: {:#}", e);
    }

    result
}

async fn run_app(args: Args) -> Result<()> {
    let provider = KubeProvider::new().await?;

    let policy = if args.allow_origins.is_empty() {
        UpgradePolicy::allow_any()
    } else {
        UpgradePolicy::allow_list(args.allow_origins)
    };

    let state = Arc::new(AppState {
        provider: Arc::new(provider),
        policy,
    });

    server::run_server(&args.host, args.port, state).await?;
    Ok(())
}
