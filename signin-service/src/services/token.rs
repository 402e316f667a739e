use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::{LoginDefinition, ScopeDefinition, SigningSecret};

/// Token-name tag stamped into every issued session token.
pub const TOKEN_NAME: &str = "default";

/// Database- and namespace-level sessions always last one hour.
const LOGIN_SESSION_TTL_SECS: i64 = 3600;

/// Claims for a scope-level session. `auth` carries the single row the
/// scope's signin statement produced, verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScopeClaims {
    #[serde(rename = "NS")]
    pub ns: String,
    #[serde(rename = "DB")]
    pub db: String,
    #[serde(rename = "SC")]
    pub sc: String,
    #[serde(rename = "TK")]
    pub tk: String,
    pub iss: String,
    pub iat: i64,
    pub nbf: i64,
    pub exp: i64,
    pub auth: Value,
}

/// Claims for a database-level session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseClaims {
    #[serde(rename = "US")]
    pub us: String,
    #[serde(rename = "NS")]
    pub ns: String,
    #[serde(rename = "DB")]
    pub db: String,
    #[serde(rename = "TK")]
    pub tk: String,
    pub iss: String,
    pub iat: i64,
    pub nbf: i64,
    pub exp: i64,
}

/// Claims for a namespace-level session. No database claim: the session is
/// valid across the whole namespace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamespaceClaims {
    #[serde(rename = "US")]
    pub us: String,
    #[serde(rename = "NS")]
    pub ns: String,
    #[serde(rename = "TK")]
    pub tk: String,
    pub iss: String,
    pub iat: i64,
    pub nbf: i64,
    pub exp: i64,
}

/// Builds and signs session tokens.
///
/// Signing is HMAC-SHA512 keyed by the secret of whichever scope or login
/// authenticated the request; there is no service-wide signing key.
#[derive(Clone)]
pub struct TokenIssuer {
    issuer: String,
}

impl TokenIssuer {
    pub fn new(issuer: impl Into<String>) -> Self {
        Self {
            issuer: issuer.into(),
        }
    }

    /// Token for a scope-level session, keyed by the scope's secret and
    /// expiring after the scope's configured time-to-live.
    pub fn issue_scope_token(
        &self,
        ns: &str,
        db: &str,
        sc: &str,
        scope: &ScopeDefinition,
        auth: Value,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        let now = Utc::now().timestamp();
        let claims = ScopeClaims {
            ns: ns.to_owned(),
            db: db.to_owned(),
            sc: sc.to_owned(),
            tk: TOKEN_NAME.to_owned(),
            iss: self.issuer.clone(),
            iat: now,
            nbf: now,
            exp: now + scope.session_ttl_secs,
            auth,
        };

        self.sign(&claims, &scope.secret)
    }

    /// Token for a database-level session, keyed by the login's secret.
    pub fn issue_database_token(
        &self,
        ns: &str,
        db: &str,
        login: &LoginDefinition,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        let now = Utc::now().timestamp();
        let claims = DatabaseClaims {
            us: login.user.clone(),
            ns: ns.to_owned(),
            db: db.to_owned(),
            tk: TOKEN_NAME.to_owned(),
            iss: self.issuer.clone(),
            iat: now,
            nbf: now,
            exp: now + LOGIN_SESSION_TTL_SECS,
        };

        self.sign(&claims, &login.secret)
    }

    /// Token for a namespace-level session, keyed by the login's secret.
    pub fn issue_namespace_token(
        &self,
        ns: &str,
        login: &LoginDefinition,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        let now = Utc::now().timestamp();
        let claims = NamespaceClaims {
            us: login.user.clone(),
            ns: ns.to_owned(),
            tk: TOKEN_NAME.to_owned(),
            iss: self.issuer.clone(),
            iat: now,
            nbf: now,
            exp: now + LOGIN_SESSION_TTL_SECS,
        };

        self.sign(&claims, &login.secret)
    }

    fn sign<T: Serialize>(
        &self,
        claims: &T,
        secret: &SigningSecret,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        encode(
            &Header::new(Algorithm::HS512),
            claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{decode, DecodingKey, Validation};
    use serde_json::json;

    fn issuer() -> TokenIssuer {
        TokenIssuer::new("Stratum")
    }

    fn decode_with<T: serde::de::DeserializeOwned>(token: &str, secret: &[u8]) -> T {
        decode::<T>(
            token,
            &DecodingKey::from_secret(secret),
            &Validation::new(Algorithm::HS512),
        )
        .expect("token should decode")
        .claims
    }

    #[test]
    fn scope_tokens_carry_the_auth_row_and_scope_ttl() {
        let scope = ScopeDefinition::new(
            "account",
            "SIGNIN",
            SigningSecret::new(b"scope-secret".to_vec()),
            7200,
        );
        let row = json!({"id": "user:1", "email": "a@b.c"});

        let token = issuer()
            .issue_scope_token("acme", "crm", "account", &scope, row.clone())
            .expect("signing failed");

        let claims: ScopeClaims = decode_with(&token, b"scope-secret");
        assert_eq!(claims.ns, "acme");
        assert_eq!(claims.db, "crm");
        assert_eq!(claims.sc, "account");
        assert_eq!(claims.tk, TOKEN_NAME);
        assert_eq!(claims.iss, "Stratum");
        assert_eq!(claims.auth, row);
        assert_eq!(claims.exp - claims.iat, 7200);
        assert_eq!(claims.nbf, claims.iat);
    }

    #[test]
    fn database_tokens_expire_after_one_hour() {
        let login = LoginDefinition::new("admin", "hash", SigningSecret::new(b"db-secret".to_vec()));

        let token = issuer()
            .issue_database_token("acme", "crm", &login)
            .expect("signing failed");

        let claims: DatabaseClaims = decode_with(&token, b"db-secret");
        assert_eq!(claims.us, "admin");
        assert_eq!(claims.ns, "acme");
        assert_eq!(claims.db, "crm");
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn namespace_tokens_have_no_database_claim() {
        let login = LoginDefinition::new("root", "hash", SigningSecret::new(b"ns-secret".to_vec()));

        let token = issuer()
            .issue_namespace_token("acme", &login)
            .expect("signing failed");

        let claims: serde_json::Value = decode_with(&token, b"ns-secret");
        assert_eq!(claims.get("US"), Some(&json!("root")));
        assert_eq!(claims.get("NS"), Some(&json!("acme")));
        assert!(claims.get("DB").is_none());
        assert!(claims.get("auth").is_none());
    }

    #[test]
    fn tokens_do_not_verify_under_a_different_secret() {
        let login = LoginDefinition::new("root", "hash", SigningSecret::new(b"ns-secret".to_vec()));

        let token = issuer()
            .issue_namespace_token("acme", &login)
            .expect("signing failed");

        let outcome = decode::<NamespaceClaims>(
            &token,
            &DecodingKey::from_secret(b"other-secret"),
            &Validation::new(Algorithm::HS512),
        );
        assert!(outcome.is_err());
    }
}
