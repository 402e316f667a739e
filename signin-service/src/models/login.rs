use crate::models::SigningSecret;

/// A stored login: username, password hash and signing secret.
///
/// Whether it grants database- or namespace-level access is decided by
/// where the catalog keeps it, not by the definition itself.
#[derive(Debug, Clone)]
pub struct LoginDefinition {
    pub user: String,
    /// Argon2 hash in PHC string format. The plaintext is never stored.
    pub password_hash: String,
    pub secret: SigningSecret,
}

impl LoginDefinition {
    pub fn new(
        user: impl Into<String>,
        password_hash: impl Into<String>,
        secret: SigningSecret,
    ) -> Self {
        Self {
            user: user.into(),
            password_hash: password_hash.into(),
            secret,
        }
    }
}
