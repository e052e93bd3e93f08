use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use streamfind_core::{
    load_config, validate_config, CacheStore, CatalogProvider, KvStore, Resolver, SqliteKvStore,
    XtreamClient, XtreamConfig,
};
use streamfind_server::{api::create_router, state::AppState};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine config path
    let config_path = std::env::var("STREAMFIND_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;

    info!("Configuration loaded successfully");
    info!("Database path: {:?}", config.database.path);

    // Persistent store behind the cache tiers
    let store: Arc<dyn KvStore> = Arc::new(
        SqliteKvStore::new(&config.database.path).context("Failed to open cache database")?,
    );
    let cache = Arc::new(CacheStore::new(&config.cache, store));
    info!(
        resolved = cache.resolved.len(),
        bindings = cache.bindings.len(),
        "Cache store initialized"
    );

    // Provider client
    let client_config = match &config.provider {
        Some(provider) => {
            info!("Using provider {}", provider.credentials().provider_key());
            provider.client_config()
        }
        None => {
            warn!("No provider configured, serving cached answers only");
            XtreamConfig::default()
        }
    };
    let provider: Arc<dyn CatalogProvider> =
        Arc::new(XtreamClient::new(client_config).context("Failed to create provider client")?);

    let resolver = Arc::new(Resolver::new(
        config.resolver.clone(),
        provider,
        config.credentials(),
        cache,
    ));

    // Create app state
    let state = Arc::new(AppState::new(config.clone(), resolver));

    // Create router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shut down");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
