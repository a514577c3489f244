//! fastci webhook gateway server.

use fastci_config::GatewayConfig;
use fastci_gateway::{AppState, routes};
use fastci_scheduler::BuildQueue;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Arc::new(GatewayConfig::from_env()?);
    let queue = Arc::new(BuildQueue::new(&config.queue_dir)?);
    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()?;

    let state = AppState::new(config.clone(), queue, http);
    let app = routes::router(state).layer(TraceLayer::new_for_http());

    info!("starting webhook gateway on {}", config.listen_addr);
    let listener = TcpListener::bind(config.listen_addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
