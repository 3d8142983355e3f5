//! SQL execution boundary for schemavault
//!
//! The lifecycle engine never links a PostgreSQL driver; every statement goes
//! through a `SqlSession`. Production uses `PsqlSession`, which shells out to
//! `psql`, so DDL and restored dump text follow the exact same path. Tests
//! and embedders use `MemorySession`.

mod errors;
mod memory;
mod psql;

pub use errors::{SessionError, SessionResult};
pub use memory::MemorySession;
pub use psql::PsqlSession;

use std::time::Duration;

use async_trait::async_trait;

/// A session that can run SQL against the tenant database.
#[async_trait]
pub trait SqlSession: Send + Sync {
    /// Run a short statement batch (DDL, catalog queries). Statements are
    /// submitted together and autocommit individually, PostgreSQL style.
    async fn execute(&self, sql: &str) -> SessionResult<()>;

    /// Feed a full SQL script over the tool's standard input, with a hard
    /// execution ceiling. The child process is killed on timeout.
    async fn execute_script(&self, sql: &str, timeout: Duration) -> SessionResult<()>;

    /// Whether a schema of this name exists (information_schema lookup).
    async fn schema_exists(&self, schema: &str) -> SessionResult<bool>;
}
