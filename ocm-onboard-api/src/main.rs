//! Standalone host for the cluster onboarding plugin
//!
//! Mounts the plugin's HTTP and WebSocket routers on a single listener, the
//! same way a plugin host would.

use std::sync::Arc;
use std::time::Duration;

use ocm_onboard_api::config::PluginConfig;
use ocm_onboard_api::logging;
use ocm_onboard_api::shutdown::{CleanupRunner, PluginCleanup, ShutdownCoordinator};
use ocm_onboard_api::{ClusterPlugin, Plugin};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if std::env::args().any(|arg| arg == "--print-config") {
        print!("{}", PluginConfig::generate_sample());
        return Ok(());
    }

    // Load configuration
    let config = PluginConfig::load()?;
    if let Err(e) = config.validate() {
        eprintln!("Configuration validation failed: {}", e);
        return Err(anyhow::anyhow!("Invalid configuration: {}", e));
    }

    // Initialize tracing; the guard flushes the file writer on drop
    let _log_guard = logging::init(&config.logging)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;
    info!("Configuration loaded successfully");

    let plugin = Arc::new(ClusterPlugin::new(config.clone()));
    plugin.initialize().await?;

    let app = plugin
        .app()
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    // Set up graceful shutdown
    let timeout = Duration::from_secs(config.server.shutdown_timeout_secs);
    let coordinator = ShutdownCoordinator::with_timeout(timeout);
    let mut cleanup = CleanupRunner::new(timeout);
    cleanup.add(PluginCleanup::new(plugin.clone()));

    let signal_watcher = coordinator.clone();
    tokio::spawn(async move {
        signal_watcher.wait_for_signal().await;
    });

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!(
        "Cluster plugin listening on {} (api: {}, ws: {})",
        addr, config.endpoints.api_base, config.endpoints.ws_base
    );

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(coordinator.signal())
        .await
    {
        error!("Server error: {}", e);
    }

    // Run cleanup after server stops
    info!("Server stopped, running cleanup...");
    cleanup.run_all().await;
    info!("Cleanup complete, exiting");

    Ok(())
}
