use serde_json::{Map, Value};
use service_core::axum::{extract::State, http::StatusCode, response::IntoResponse, Json};

use crate::{services::SigninError, AppState};

/// Resolve a sign-in request into a signed session token.
///
/// The body is taken as a raw field map: which fields matter is decided by
/// classification, and the whole map is handed to a scope's signin
/// statement as bound variables.
#[utoipa::path(
    post,
    path = "/signin",
    request_body = SigninRequest,
    responses(
        (status = 200, description = "Sign-in successful, body is the signed token", body = String),
        (status = 403, description = "Authentication failure", body = ErrorResponse),
        (status = 500, description = "Storage transaction could not be started", body = ErrorResponse),
        (status = 501, description = "Scope signin statement execution failed", body = ErrorResponse)
    ),
    tag = "Authentication"
)]
pub async fn signin(
    State(state): State<AppState>,
    Json(vars): Json<Map<String, Value>>,
) -> Result<impl IntoResponse, SigninError> {
    let token = state.signin.signin(vars).await.map_err(|e| {
        tracing::warn!(kind = ?e.kind, error = %e, "Sign-in rejected");
        e
    })?;

    Ok((StatusCode::OK, token))
}
