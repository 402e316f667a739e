use std::sync::Arc;

use serde_json::{Map, Value};

use crate::{
    services::{
        classify, ClassifiedRequest, ErrorContext, QueryEngine, SigninError, SigninErrorKind,
        StatementResult, TokenIssuer, TransactionSource,
    },
    utils::verify_password,
};

/// Resolves sign-in requests into signed session tokens.
///
/// One instance is shared by all requests. Every call classifies the
/// request, resolves it at exactly one trust level and signs a token; the
/// first failure is terminal, no step is retried and no other trust level
/// is attempted.
#[derive(Clone)]
pub struct SigninService {
    store: Arc<dyn TransactionSource>,
    query: Arc<dyn QueryEngine>,
    tokens: TokenIssuer,
}

impl SigninService {
    pub fn new(
        store: Arc<dyn TransactionSource>,
        query: Arc<dyn QueryEngine>,
        tokens: TokenIssuer,
    ) -> Self {
        Self {
            store,
            query,
            tokens,
        }
    }

    pub async fn signin(&self, vars: Map<String, Value>) -> Result<String, SigninError> {
        match classify(vars) {
            ClassifiedRequest::Scope { ns, db, sc, vars } => {
                self.scope_signin(&ns, &db, &sc, vars).await
            }
            ClassifiedRequest::Database { ns, db, user, pass } => {
                self.database_signin(&ns, &db, &user, &pass).await
            }
            ClassifiedRequest::Namespace { ns, user, pass } => {
                self.namespace_signin(&ns, &user, &pass).await
            }
            ClassifiedRequest::Invalid => Err(SigninError::unclassified()),
        }
    }

    /// Scope-level sign-in: run the scope's own signin statement against a
    /// read snapshot and issue a token around the single row it returns.
    async fn scope_signin(
        &self,
        ns: &str,
        db: &str,
        sc: &str,
        vars: Map<String, Value>,
    ) -> Result<String, SigninError> {
        let ctx = ErrorContext::scope(ns, db, sc);

        // Released when `txn` drops, on every path out of this function.
        let txn = self.store.begin_read().await.map_err(|e| {
            tracing::error!(error = %e, "could not begin read transaction");
            SigninError::new(
                SigninErrorKind::TransactionBegin,
                ctx.clone(),
                "Could not begin storage transaction",
            )
        })?;

        let scope = match txn.scope(ns, db, sc).await {
            Ok(Some(scope)) => scope,
            Ok(None) => {
                return Err(SigninError::new(
                    SigninErrorKind::ScopeNotFound,
                    ctx,
                    "Authentication scope does not exist",
                ));
            }
            Err(e) => {
                tracing::error!(error = %e, ns, db, sc, "scope lookup failed");
                return Err(SigninError::new(
                    SigninErrorKind::ScopeNotFound,
                    ctx,
                    "Authentication scope does not exist",
                ));
            }
        };

        let results = self
            .query
            .execute(txn.as_ref(), &scope.signin, &vars)
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, ns, db, sc, "scope signin statement failed");
                SigninError::new(
                    SigninErrorKind::ScopeSigninExecution,
                    ctx.clone(),
                    "Authentication scope signin was unsuccessful",
                )
            })?;

        let auth = single_row(results).ok_or_else(|| {
            SigninError::new(
                SigninErrorKind::ScopeSigninShape,
                ctx.clone(),
                "Authentication scope signin was unsuccessful",
            )
        })?;

        self.tokens
            .issue_scope_token(ns, db, sc, &scope, auth)
            .map_err(|e| {
                tracing::error!(error = %e, "token signing failed");
                SigninError::new(SigninErrorKind::Signing, ctx, "Problem with signing token")
            })
    }

    /// Database-level sign-in: look up the stored login under
    /// `(ns, db, user)` and verify the supplied password.
    async fn database_signin(
        &self,
        ns: &str,
        db: &str,
        user: &str,
        pass: &str,
    ) -> Result<String, SigninError> {
        let ctx = ErrorContext::database_user(ns, db, user);

        // Checked before any transaction is opened.
        if user.is_empty() || pass.is_empty() {
            return Err(SigninError::new(
                SigninErrorKind::MissingParameters,
                ctx,
                "Username or password is missing",
            ));
        }

        let txn = self.store.begin_read().await.map_err(|e| {
            tracing::error!(error = %e, "could not begin read transaction");
            SigninError::new(
                SigninErrorKind::TransactionBegin,
                ctx.clone(),
                "Could not begin storage transaction",
            )
        })?;

        let login = match txn.database_login(ns, db, user).await {
            Ok(Some(login)) => login,
            Ok(None) => {
                // Same outward message as a bad password: the response must
                // not reveal whether the login exists.
                return Err(SigninError::new(
                    SigninErrorKind::LoginNotFound,
                    ctx,
                    "Database signin was unsuccessful",
                ));
            }
            Err(e) => {
                tracing::error!(error = %e, ns, db, "database login lookup failed");
                return Err(SigninError::new(
                    SigninErrorKind::LoginNotFound,
                    ctx,
                    "Database signin was unsuccessful",
                ));
            }
        };

        if verify_password(pass, &login.password_hash).is_err() {
            return Err(SigninError::new(
                SigninErrorKind::CredentialMismatch,
                ctx,
                "Database signin was unsuccessful",
            ));
        }

        self.tokens.issue_database_token(ns, db, &login).map_err(|e| {
            tracing::error!(error = %e, "token signing failed");
            SigninError::new(SigninErrorKind::Signing, ctx, "Problem with signing token")
        })
    }

    /// Namespace-level sign-in: like the database flow, against the
    /// namespace-wide logins.
    async fn namespace_signin(
        &self,
        ns: &str,
        user: &str,
        pass: &str,
    ) -> Result<String, SigninError> {
        let ctx = ErrorContext::namespace_user(ns, user);

        if user.is_empty() || pass.is_empty() {
            return Err(SigninError::new(
                SigninErrorKind::MissingParameters,
                ctx,
                "Username or password is missing",
            ));
        }

        let txn = self.store.begin_read().await.map_err(|e| {
            tracing::error!(error = %e, "could not begin read transaction");
            SigninError::new(
                SigninErrorKind::TransactionBegin,
                ctx.clone(),
                "Could not begin storage transaction",
            )
        })?;

        let login = match txn.namespace_login(ns, user).await {
            Ok(Some(login)) => login,
            Ok(None) => {
                return Err(SigninError::new(
                    SigninErrorKind::LoginNotFound,
                    ctx,
                    "Namespace signin was unsuccessful",
                ));
            }
            Err(e) => {
                tracing::error!(error = %e, ns, "namespace login lookup failed");
                return Err(SigninError::new(
                    SigninErrorKind::LoginNotFound,
                    ctx,
                    "Namespace signin was unsuccessful",
                ));
            }
        };

        if verify_password(pass, &login.password_hash).is_err() {
            return Err(SigninError::new(
                SigninErrorKind::CredentialMismatch,
                ctx,
                "Namespace signin was unsuccessful",
            ));
        }

        self.tokens.issue_namespace_token(ns, &login).map_err(|e| {
            tracing::error!(error = %e, "token signing failed");
            SigninError::new(SigninErrorKind::Signing, ctx, "Problem with signing token")
        })
    }
}

/// Exactly one statement result containing exactly one row; anything else
/// is a shape violation.
fn single_row(results: Vec<StatementResult>) -> Option<Value> {
    if results.len() != 1 {
        return None;
    }
    let mut rows = results.into_iter().next()?.rows;
    if rows.len() != 1 {
        return None;
    }
    rows.pop()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{LoginDefinition, ScopeDefinition, SigningSecret};
    use crate::services::{MemoryQueryEngine, MemoryStore};
    use crate::utils::hash_password;
    use serde_json::json;

    fn service() -> (SigninService, MemoryStore, MemoryQueryEngine) {
        let store = MemoryStore::default();
        let query = MemoryQueryEngine::default();
        let service = SigninService::new(
            Arc::new(store.clone()),
            Arc::new(query.clone()),
            TokenIssuer::new("Stratum"),
        );
        (service, store, query)
    }

    fn vars(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected a JSON object"),
        }
    }

    #[tokio::test]
    async fn scope_signin_returns_a_token_for_a_single_row() {
        let (service, store, query) = service();
        store.define_scope(
            "acme",
            "crm",
            ScopeDefinition::new("account", "SIGNIN", SigningSecret::new(b"k".to_vec()), 3600),
        );
        query.script("SIGNIN", vec![StatementResult::new(vec![json!({"id": 1})])]);

        let outcome = service
            .signin(vars(json!({"NS": "acme", "DB": "crm", "SC": "account"})))
            .await;

        assert!(outcome.is_ok());
        assert_eq!(store.transactions_begun(), 1);
        assert_eq!(store.transactions_released(), 1);
    }

    #[tokio::test]
    async fn unknown_scope_fails_closed() {
        let (service, store, _query) = service();

        let err = service
            .signin(vars(json!({"NS": "acme", "DB": "crm", "SC": "missing"})))
            .await
            .unwrap_err();

        assert_eq!(err.kind, SigninErrorKind::ScopeNotFound);
        assert_eq!(err.context.sc.as_deref(), Some("missing"));
        assert_eq!(store.transactions_released(), 1);
    }

    #[tokio::test]
    async fn statement_errors_and_shape_errors_are_distinct_kinds() {
        let (service, store, query) = service();
        store.define_scope(
            "acme",
            "crm",
            ScopeDefinition::new("account", "SIGNIN", SigningSecret::new(b"k".to_vec()), 3600),
        );

        query.script_failure("SIGNIN", "index missing");
        let err = service
            .signin(vars(json!({"NS": "acme", "DB": "crm", "SC": "account"})))
            .await
            .unwrap_err();
        assert_eq!(err.kind, SigninErrorKind::ScopeSigninExecution);

        // Zero rows.
        query.script("SIGNIN", vec![StatementResult::new(vec![])]);
        let err = service
            .signin(vars(json!({"NS": "acme", "DB": "crm", "SC": "account"})))
            .await
            .unwrap_err();
        assert_eq!(err.kind, SigninErrorKind::ScopeSigninShape);

        // Two rows.
        query.script(
            "SIGNIN",
            vec![StatementResult::new(vec![json!(1), json!(2)])],
        );
        let err = service
            .signin(vars(json!({"NS": "acme", "DB": "crm", "SC": "account"})))
            .await
            .unwrap_err();
        assert_eq!(err.kind, SigninErrorKind::ScopeSigninShape);

        // Two statement results of one row each.
        query.script(
            "SIGNIN",
            vec![
                StatementResult::new(vec![json!(1)]),
                StatementResult::new(vec![json!(2)]),
            ],
        );
        let err = service
            .signin(vars(json!({"NS": "acme", "DB": "crm", "SC": "account"})))
            .await
            .unwrap_err();
        assert_eq!(err.kind, SigninErrorKind::ScopeSigninShape);

        assert_eq!(store.transactions_begun(), store.transactions_released());
    }

    #[tokio::test]
    async fn database_signin_verifies_the_stored_hash() {
        let (service, store, _query) = service();
        let hash = hash_password("letmein").expect("Failed to hash password");
        store.define_database_login(
            "acme",
            "crm",
            LoginDefinition::new("admin", hash, SigningSecret::new(b"k".to_vec())),
        );

        let ok = service
            .signin(vars(
                json!({"NS": "acme", "DB": "crm", "user": "admin", "pass": "letmein"}),
            ))
            .await;
        assert!(ok.is_ok());

        let err = service
            .signin(vars(
                json!({"NS": "acme", "DB": "crm", "user": "admin", "pass": "wrong"}),
            ))
            .await
            .unwrap_err();
        assert_eq!(err.kind, SigninErrorKind::CredentialMismatch);

        let err = service
            .signin(vars(
                json!({"NS": "acme", "DB": "crm", "user": "ghost", "pass": "letmein"}),
            ))
            .await
            .unwrap_err();
        assert_eq!(err.kind, SigninErrorKind::LoginNotFound);

        assert_eq!(store.transactions_begun(), store.transactions_released());
    }

    #[tokio::test]
    async fn missing_credentials_fail_before_any_transaction() {
        let (service, store, _query) = service();

        let err = service
            .signin(vars(json!({"NS": "acme", "DB": "crm"})))
            .await
            .unwrap_err();
        assert_eq!(err.kind, SigninErrorKind::MissingParameters);

        let err = service
            .signin(vars(json!({"NS": "acme", "user": "root", "pass": ""})))
            .await
            .unwrap_err();
        assert_eq!(err.kind, SigninErrorKind::MissingParameters);

        assert_eq!(store.transactions_begun(), 0);
    }

    #[tokio::test]
    async fn namespace_signin_uses_namespace_logins_only() {
        let (service, store, _query) = service();
        let hash = hash_password("letmein").expect("Failed to hash password");
        store.define_namespace_login(
            "acme",
            LoginDefinition::new("root", hash, SigningSecret::new(b"k".to_vec())),
        );

        let ok = service
            .signin(vars(json!({"NS": "acme", "user": "root", "pass": "letmein"})))
            .await;
        assert!(ok.is_ok());

        // The same login is not visible at database level.
        let err = service
            .signin(vars(
                json!({"NS": "acme", "DB": "crm", "user": "root", "pass": "letmein"}),
            ))
            .await
            .unwrap_err();
        assert_eq!(err.kind, SigninErrorKind::LoginNotFound);
    }

    #[tokio::test]
    async fn unclassifiable_requests_are_rejected() {
        let (service, store, _query) = service();

        let err = service.signin(Map::new()).await.unwrap_err();
        assert_eq!(err.kind, SigninErrorKind::UnclassifiedRequest);
        assert_eq!(store.transactions_begun(), 0);
    }
}
