//! Metadata definitions resolved by the catalog during sign-in.

mod login;
mod scope;
mod secret;

pub use login::LoginDefinition;
pub use scope::ScopeDefinition;
pub use secret::SigningSecret;
