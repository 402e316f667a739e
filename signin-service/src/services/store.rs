//! Seams to the storage and query engines.
//!
//! Sign-in reads metadata through a snapshot transaction and executes
//! tenant-defined statements through the query engine; both sit behind
//! narrow traits so deployments can wire the platform's real engines. The
//! in-memory implementations back local runs and the test suite.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::models::{LoginDefinition, ScopeDefinition};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("transaction could not be started: {0}")]
    Begin(String),

    #[error("storage lookup failed: {0}")]
    Lookup(String),
}

/// Entry point to the transactional storage engine.
#[async_trait]
pub trait TransactionSource: Send + Sync {
    /// Open a read-only snapshot. The snapshot is released when the
    /// returned transaction is dropped; callers never release manually.
    async fn begin_read(&self) -> Result<Box<dyn ReadTransaction>, StoreError>;
}

/// A read-only snapshot of the store. Metadata lookups ride the snapshot
/// so every definition a request sees comes from one consistent view.
#[async_trait]
pub trait ReadTransaction: Send + Sync {
    async fn scope(
        &self,
        ns: &str,
        db: &str,
        sc: &str,
    ) -> Result<Option<ScopeDefinition>, StoreError>;

    async fn database_login(
        &self,
        ns: &str,
        db: &str,
        user: &str,
    ) -> Result<Option<LoginDefinition>, StoreError>;

    async fn namespace_login(
        &self,
        ns: &str,
        user: &str,
    ) -> Result<Option<LoginDefinition>, StoreError>;
}

/// The rows produced by one statement of an execution.
#[derive(Debug, Clone)]
pub struct StatementResult {
    pub rows: Vec<Value>,
}

impl StatementResult {
    pub fn new(rows: Vec<Value>) -> Self {
        Self { rows }
    }
}

/// The tenant-defined statement itself failed to execute.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct QueryError(pub String);

/// Executes a statement against a snapshot with bound variables.
///
/// The statement is opaque to sign-in; this service never inspects it.
#[async_trait]
pub trait QueryEngine: Send + Sync {
    async fn execute(
        &self,
        txn: &dyn ReadTransaction,
        statement: &str,
        vars: &Map<String, Value>,
    ) -> Result<Vec<StatementResult>, QueryError>;
}

#[derive(Default)]
struct MemoryInner {
    scopes: RwLock<HashMap<(String, String, String), ScopeDefinition>>,
    database_logins: RwLock<HashMap<(String, String, String), LoginDefinition>>,
    namespace_logins: RwLock<HashMap<(String, String), LoginDefinition>>,
    begun: AtomicU64,
    released: AtomicU64,
}

/// In-memory store with a provisioning surface for defining scopes and
/// logins. Transactions count begin/release so the exactly-once release
/// property stays observable.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<MemoryInner>,
}

impl MemoryStore {
    pub fn define_scope(&self, ns: &str, db: &str, scope: ScopeDefinition) {
        self.inner
            .scopes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert((ns.to_owned(), db.to_owned(), scope.name.clone()), scope);
    }

    pub fn define_database_login(&self, ns: &str, db: &str, login: LoginDefinition) {
        self.inner
            .database_logins
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert((ns.to_owned(), db.to_owned(), login.user.clone()), login);
    }

    pub fn define_namespace_login(&self, ns: &str, login: LoginDefinition) {
        self.inner
            .namespace_logins
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert((ns.to_owned(), login.user.clone()), login);
    }

    pub fn transactions_begun(&self) -> u64 {
        self.inner.begun.load(Ordering::SeqCst)
    }

    pub fn transactions_released(&self) -> u64 {
        self.inner.released.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TransactionSource for MemoryStore {
    async fn begin_read(&self) -> Result<Box<dyn ReadTransaction>, StoreError> {
        self.inner.begun.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MemoryTransaction {
            inner: self.inner.clone(),
        }))
    }
}

struct MemoryTransaction {
    inner: Arc<MemoryInner>,
}

impl Drop for MemoryTransaction {
    fn drop(&mut self) {
        self.inner.released.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl ReadTransaction for MemoryTransaction {
    async fn scope(
        &self,
        ns: &str,
        db: &str,
        sc: &str,
    ) -> Result<Option<ScopeDefinition>, StoreError> {
        Ok(self
            .inner
            .scopes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&(ns.to_owned(), db.to_owned(), sc.to_owned()))
            .cloned())
    }

    async fn database_login(
        &self,
        ns: &str,
        db: &str,
        user: &str,
    ) -> Result<Option<LoginDefinition>, StoreError> {
        Ok(self
            .inner
            .database_logins
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&(ns.to_owned(), db.to_owned(), user.to_owned()))
            .cloned())
    }

    async fn namespace_login(
        &self,
        ns: &str,
        user: &str,
    ) -> Result<Option<LoginDefinition>, StoreError> {
        Ok(self
            .inner
            .namespace_logins
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&(ns.to_owned(), user.to_owned()))
            .cloned())
    }
}

#[derive(Clone)]
enum Program {
    Results(Vec<StatementResult>),
    Fail(String),
}

/// Query engine whose outcomes are registered per statement text. It never
/// interprets the statement, mirroring the opacity of the real engine.
#[derive(Clone, Default)]
pub struct MemoryQueryEngine {
    programs: Arc<RwLock<HashMap<String, Program>>>,
}

impl MemoryQueryEngine {
    /// Register the results the given statement produces when executed.
    pub fn script(&self, statement: &str, results: Vec<StatementResult>) {
        self.programs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(statement.to_owned(), Program::Results(results));
    }

    /// Register the given statement to fail with an execution error.
    pub fn script_failure(&self, statement: &str, message: &str) {
        self.programs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(statement.to_owned(), Program::Fail(message.to_owned()));
    }
}

#[async_trait]
impl QueryEngine for MemoryQueryEngine {
    async fn execute(
        &self,
        _txn: &dyn ReadTransaction,
        statement: &str,
        _vars: &Map<String, Value>,
    ) -> Result<Vec<StatementResult>, QueryError> {
        let program = self
            .programs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(statement)
            .cloned();

        match program {
            Some(Program::Results(results)) => Ok(results),
            Some(Program::Fail(message)) => Err(QueryError(message)),
            None => Err(QueryError("no such statement".to_owned())),
        }
    }
}
