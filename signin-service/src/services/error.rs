use service_core::axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::dtos::ErrorResponse;

/// Everything that can terminate a sign-in attempt.
///
/// Exactly one kind is attached to every failure; the transport mapping
/// lives in [`SigninErrorKind::status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SigninErrorKind {
    MissingParameters,
    TransactionBegin,
    ScopeNotFound,
    ScopeSigninExecution,
    ScopeSigninShape,
    LoginNotFound,
    CredentialMismatch,
    Signing,
    UnclassifiedRequest,
}

impl SigninErrorKind {
    /// Only a failed transaction start is a server fault. A failing
    /// tenant-defined statement maps to 501 to keep it apart from plain
    /// credential rejections; everything else is an authentication failure.
    pub fn status(self) -> StatusCode {
        match self {
            SigninErrorKind::TransactionBegin => StatusCode::INTERNAL_SERVER_ERROR,
            SigninErrorKind::ScopeSigninExecution => StatusCode::NOT_IMPLEMENTED,
            _ => StatusCode::FORBIDDEN,
        }
    }
}

/// Identifiers echoed back with a failure: `ns`, `db` and one of `sc`
/// (scope name), `du` (database user) or `nu` (namespace user). Never
/// carries passwords or signing secrets.
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    pub ns: Option<String>,
    pub db: Option<String>,
    pub sc: Option<String>,
    pub du: Option<String>,
    pub nu: Option<String>,
}

impl ErrorContext {
    pub fn scope(ns: &str, db: &str, sc: &str) -> Self {
        Self {
            ns: Some(ns.to_owned()),
            db: Some(db.to_owned()),
            sc: Some(sc.to_owned()),
            ..Self::default()
        }
    }

    pub fn database_user(ns: &str, db: &str, user: &str) -> Self {
        Self {
            ns: Some(ns.to_owned()),
            db: Some(db.to_owned()),
            du: Some(user.to_owned()),
            ..Self::default()
        }
    }

    pub fn namespace_user(ns: &str, user: &str) -> Self {
        Self {
            ns: Some(ns.to_owned()),
            nu: Some(user.to_owned()),
            ..Self::default()
        }
    }
}

/// Terminal sign-in failure: an enumerated kind, the identifiers that were
/// recognised, and a human-readable message.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct SigninError {
    pub kind: SigninErrorKind,
    pub context: ErrorContext,
    pub message: String,
}

impl SigninError {
    pub fn new(kind: SigninErrorKind, context: ErrorContext, message: impl Into<String>) -> Self {
        Self {
            kind,
            context,
            message: message.into(),
        }
    }

    pub fn unclassified() -> Self {
        Self::new(
            SigninErrorKind::UnclassifiedRequest,
            ErrorContext::default(),
            "Authentication details are missing",
        )
    }
}

impl IntoResponse for SigninError {
    fn into_response(self) -> Response {
        let status = self.kind.status();
        let body = ErrorResponse {
            error: self.message,
            ns: self.context.ns,
            db: self.context.db,
            sc: self.context.sc,
            du: self.context.du,
            nu: self.context.nu,
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_transaction_begin_is_a_server_error() {
        assert_eq!(
            SigninErrorKind::TransactionBegin.status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn execution_errors_are_distinguished_from_shape_errors() {
        assert_eq!(
            SigninErrorKind::ScopeSigninExecution.status(),
            StatusCode::NOT_IMPLEMENTED
        );
        assert_eq!(
            SigninErrorKind::ScopeSigninShape.status(),
            StatusCode::FORBIDDEN
        );
    }

    #[test]
    fn all_credential_failures_are_403() {
        for kind in [
            SigninErrorKind::MissingParameters,
            SigninErrorKind::ScopeNotFound,
            SigninErrorKind::LoginNotFound,
            SigninErrorKind::CredentialMismatch,
            SigninErrorKind::Signing,
            SigninErrorKind::UnclassifiedRequest,
        ] {
            assert_eq!(kind.status(), StatusCode::FORBIDDEN);
        }
    }

    #[test]
    fn responses_echo_context_and_status() {
        let err = SigninError::new(
            SigninErrorKind::ScopeNotFound,
            ErrorContext::scope("acme", "crm", "account"),
            "Authentication scope does not exist",
        );

        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }
}
