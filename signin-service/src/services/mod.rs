//! Services layer for the sign-in service.
//!
//! Business logic for request classification, trust-level resolution and
//! token issuance, plus the seams to the storage and query engines.

mod classify;
pub mod error;
mod signin;
mod store;
mod token;

pub use classify::{classify, ClassifiedRequest};
pub use error::{ErrorContext, SigninError, SigninErrorKind};
pub use signin::SigninService;
pub use store::{
    MemoryQueryEngine, MemoryStore, QueryEngine, QueryError, ReadTransaction, StatementResult,
    StoreError, TransactionSource,
};
pub use token::{DatabaseClaims, NamespaceClaims, ScopeClaims, TokenIssuer, TOKEN_NAME};
