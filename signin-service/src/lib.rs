pub mod config;
pub mod dtos;
pub mod handlers;
pub mod models;
pub mod services;
pub mod utils;

use std::sync::Arc;

use service_core::axum::{
    extract::State,
    middleware::from_fn,
    routing::{get, post},
    Json, Router,
};
use service_core::error::AppError;
use service_core::middleware::request_id::{request_id_middleware, RequestId};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

use crate::config::SigninConfig;
use crate::services::{SigninService, TransactionSource};

#[derive(OpenApi)]
#[openapi(
    paths(health_check, handlers::signin::signin),
    components(schemas(dtos::SigninRequest, dtos::ErrorResponse)),
    tags(
        (name = "Authentication", description = "Sign-in and session token issuance"),
        (name = "Observability", description = "Service health and monitoring"),
    )
)]
pub struct ApiDoc;

#[derive(Clone)]
pub struct AppState {
    pub config: SigninConfig,
    pub store: Arc<dyn TransactionSource>,
    pub signin: SigninService,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/signin", post(handlers::signin))
        .route("/health", get(health_check))
        .route(
            "/.well-known/openapi.json",
            get(|| async { Json(ApiDoc::openapi()) }),
        )
        .with_state(state)
        // Tracing spans carry the id assigned below.
        .layer(TraceLayer::new_for_http().make_span_with(
            |request: &service_core::axum::http::Request<_>| {
                let request_id = request
                    .extensions()
                    .get::<RequestId>()
                    .map(|id| id.0.as_str())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                )
            },
        ))
        .layer(from_fn(request_id_middleware))
}

/// Service health: verifies a storage snapshot can be opened.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy"),
        (status = 500, description = "Storage engine is unavailable")
    ),
    tag = "Observability"
)]
pub async fn health_check(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    // The snapshot is dropped, and thereby released, straight away.
    state.store.begin_read().await.map_err(|e| {
        tracing::error!(error = %e, "Storage health check failed");
        AppError::InternalError(anyhow::anyhow!("storage engine unavailable"))
    })?;

    Ok(Json(serde_json::json!({
        "status": "healthy",
        "service": state.config.service_name,
        "version": state.config.service_version,
        "environment": format!("{:?}", state.config.environment),
    })))
}
