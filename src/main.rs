// Main entry point - Dependency injection and server setup
use anyhow::Context;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use bahn_dashboard::application::deviation_service::DeviationService;
use bahn_dashboard::application::metadata_service::MetadataService;
use bahn_dashboard::application::streaming_service::StreamingDeviationService;
use bahn_dashboard::application::task_poller::TaskPoller;
use bahn_dashboard::application::trajectory_service::TrajectoryService;
use bahn_dashboard::infrastructure::api_repository::ApiRepository;
use bahn_dashboard::infrastructure::config::load_config;
use bahn_dashboard::presentation::app_state::AppState;
use bahn_dashboard::presentation::router::build_router;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Load configuration
    let config = load_config()?;

    // Create repository (infrastructure layer)
    let repository = Arc::new(ApiRepository::new(
        config.api.base_url.clone(),
        config.api.endpoints.clone(),
        Duration::from_secs(config.api.timeout_secs),
    )?);

    // Create services (application layer)
    let deviation_service = DeviationService::new(repository.clone(), config.cache.ttl());
    let poller = TaskPoller::new(
        repository.clone(),
        config.polling.interval(),
        config.polling.max_duration(),
    );
    let state = Arc::new(AppState {
        streaming_service: StreamingDeviationService::new(deviation_service.clone()),
        trajectory_service: TrajectoryService::new(repository),
        metadata_service: MetadataService::new(poller, deviation_service.clone(), config.cache.ttl()),
        deviation_service,
        compress: config.server.compress,
    });

    // Build router (presentation layer)
    // Compression is handled in the response builders, so no CompressionLayer here
    let router = build_router(state);

    // Start server
    let addr: SocketAddr = config
        .server
        .bind_addr
        .parse()
        .with_context(|| format!("Invalid bind address '{}'", config.server.bind_addr))?;
    tracing::info!(%addr, api = %config.api.base_url, "Starting bahn-dashboard service");

    axum::serve(tokio::net::TcpListener::bind(addr).await?, router).await?;

    Ok(())
}
