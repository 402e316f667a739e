use std::net::SocketAddr;
use std::sync::Arc;

use service_core::observability::logging::init_tracing;
use signin_service::{
    build_router,
    config::SigninConfig,
    services::{MemoryQueryEngine, MemoryStore, SigninService, TokenIssuer},
    AppState,
};
use tokio::signal;

#[tokio::main]
async fn main() -> Result<(), service_core::error::AppError> {
    // Load configuration - fail fast if invalid
    let config = SigninConfig::from_env()?;

    init_tracing(&config.log_level);

    tracing::info!(
        service = %config.service_name,
        version = %config.service_version,
        environment = ?config.environment,
        "Starting sign-in service"
    );

    // The storage and query engines are integration seams; the in-memory
    // implementations back local runs until a deployment wires real ones.
    let store = Arc::new(MemoryStore::default());
    let query = Arc::new(MemoryQueryEngine::default());

    let tokens = TokenIssuer::new(config.token.issuer.clone());
    let signin = SigninService::new(store.clone(), query, tokens);

    let state = AppState {
        config: config.clone(),
        store,
        signin,
    };

    let app = build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
    tracing::info!(address = %addr, "Listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    service_core::axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Service shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT, starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}
