//! Gather HTTP server entry point.

use gather_auth::providers::DevTokenProvider;
use gather_core::SystemClock;
use gather_postgres::PostgresStore;
use gather_server::{build_router, AppState, Config};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // .env is optional; ignore a missing file.
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gather_server=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Gather HTTP server");

    let config = Config::from_env();
    info!(
        database_url = %config.database.url,
        host = %config.server.host,
        port = config.server.port,
        "Configuration loaded"
    );

    // Metrics exporter
    let metrics_addr: SocketAddr =
        format!("{}:{}", config.server.metrics_host, config.server.metrics_port).parse()?;
    if let Err(err) = PrometheusBuilder::new()
        .with_http_listener(metrics_addr)
        .install()
    {
        warn!(error = %err, "metrics exporter not started");
    } else {
        info!(address = %metrics_addr, "metrics exporter listening");
    }
    gather_server::metrics::register_business_metrics();

    // Entity store
    info!("Connecting to entity store...");
    let store = PostgresStore::connect(&config.database.url).await?;
    store.migrate().await?;
    info!("Entity store ready");

    // Identity resolution is an external collaborator; the dev provider
    // stands in until a deployment wires its identity service here.
    warn!("Using DevTokenProvider for identity resolution; not for production use");
    let identity = Arc::new(DevTokenProvider::new());

    let state = AppState::new(
        Arc::new(store),
        identity,
        Arc::new(SystemClock),
        &config.registration,
    );

    let app = build_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(address = %addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

/// Resolves when SIGINT or SIGTERM arrives.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!(error = %err, "failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => warn!(error = %err, "failed to install SIGTERM handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Shutdown signal received");
}
