//! Paddock Server
//!
//! HTTP API serving qualifying and race session summaries

use anyhow::Result;
use paddock_server::{api, config::ServerConfig, state::AppState};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!("Starting Paddock Server");

    let config = ServerConfig::from_env()?;
    let engine = config.load_engine_config()?;
    let source = config.build_source();
    info!(
        "Using {} source, elimination cutoffs {:?}",
        source.name(),
        engine.elimination_cutoffs
    );

    let state = AppState::new(source, engine);
    let app = api::create_router(state);

    info!("Server listening on http://{}", config.addr);
    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
