/**
 * Roomline Server Entry Point
 *
 * Loads configuration, initializes tracing and serves the REST API and the
 * WebSocket gateway until Ctrl-C.
 */
use roomline::backend::server::{create_app, ServerConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env file if present
    dotenv::dotenv().ok();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,roomline=debug"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let config = ServerConfig::from_env()?;
    let addr = config.bind_addr;
    tracing::info!("[STARTUP] Server initialization started");

    let app = create_app(config).await?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("[STARTUP] Listening on {}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("[STARTUP] Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("[STARTUP] Failed to listen for Ctrl-C: {}", e);
        return;
    }
    tracing::info!("[STARTUP] Shutdown signal received");
}
