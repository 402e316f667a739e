use crate::models::SigningSecret;

/// An application-defined authentication context within a database.
///
/// Read-only: sourced from the catalog, never mutated by sign-in.
#[derive(Debug, Clone)]
pub struct ScopeDefinition {
    pub name: String,
    /// The tenant-defined signin statement. Opaque to this service; it is
    /// handed to the query engine verbatim.
    pub signin: String,
    pub secret: SigningSecret,
    /// Lifetime of tokens issued for this scope, in seconds.
    pub session_ttl_secs: i64,
}

impl ScopeDefinition {
    pub fn new(
        name: impl Into<String>,
        signin: impl Into<String>,
        secret: SigningSecret,
        session_ttl_secs: i64,
    ) -> Self {
        Self {
            name: name.into(),
            signin: signin.into(),
            secret,
            session_ttl_secs,
        }
    }
}
