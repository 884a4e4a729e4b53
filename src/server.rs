//! Server entry point

use std::sync::Arc;

use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use super::{
    config::Config,
    routes::{AppState, router},
    store::spawn_cleanup,
};

/// Installs the global tracing subscriber
///
/// `RUST_LOG` wins over the configured filter. Calling this twice is harmless.
pub fn init_tracing(config: &Config) {
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| config.log_filter.clone());
    let _ = tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(filter))
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}

/// Runs the server until Ctrl-C
///
/// # Errors
///
/// Returns an error if the listener cannot be bound or the server fails.
pub async fn serve(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    init_tracing(&config);

    let addr = config.addr();
    let ttl = config.session_ttl();
    let interval = config.cleanup_interval();
    let state = Arc::new(AppState::new(config));

    let cleanup = spawn_cleanup(Arc::clone(&state.store), interval, ttl);

    let listener = TcpListener::bind(addr).await?;
    tracing::info!(
        %addr,
        ttl_secs = ttl.as_secs(),
        max_sessions = state.config.max_sessions,
        "buzzboard listening"
    );

    let result = axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await;
    cleanup.abort();
    result?;
    Ok(())
}
