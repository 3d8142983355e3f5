//! In-memory SQL session
//!
//! Models just enough DDL to exercise the lifecycle engine without a
//! database: a set of live schema names maintained by interpreting
//! `CREATE/DROP/ALTER SCHEMA` statements, plus a full log of everything
//! submitted so tests can assert exact statement sequences.

use std::collections::HashSet;
use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;

use super::errors::{SessionError, SessionResult};
use super::SqlSession;

/// Recording fake for `SqlSession`.
#[derive(Debug, Default)]
pub struct MemorySession {
    schemas: RwLock<HashSet<String>>,
    statements: RwLock<Vec<String>>,
    scripts: RwLock<Vec<String>>,
    fail_matching: RwLock<Option<String>>,
}

impl MemorySession {
    /// Empty session with no schemas
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-create a schema
    pub fn add_schema(&self, name: &str) {
        self.schemas
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(name.to_string());
    }

    /// Every statement submitted via `execute`, in order
    pub fn statements(&self) -> Vec<String> {
        self.statements
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Every script fed via `execute_script`, in order
    pub fn scripts(&self) -> Vec<String> {
        self.scripts
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Current schema set, sorted
    pub fn schema_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .schemas
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .cloned()
            .collect();
        names.sort();
        names
    }

    /// Make any statement or script containing `needle` fail.
    pub fn fail_matching(&self, needle: &str) {
        *self.fail_matching.write().unwrap_or_else(|e| e.into_inner()) =
            Some(needle.to_string());
    }

    fn check_failure(&self, sql: &str) -> SessionResult<()> {
        let guard = self.fail_matching.read().unwrap_or_else(|e| e.into_inner());
        if let Some(needle) = guard.as_deref() {
            if sql.contains(needle) {
                return Err(SessionError::Tool {
                    exit_code: Some(1),
                    stderr: format!("injected failure on '{}'", needle),
                });
            }
        }
        Ok(())
    }

    fn apply(&self, statement: &str) {
        let mut schemas = self.schemas.write().unwrap_or_else(|e| e.into_inner());
        let tokens: Vec<&str> = statement.split_whitespace().collect();
        let upper: Vec<String> = tokens.iter().map(|t| t.to_uppercase()).collect();

        // CREATE SCHEMA <name>
        if upper.len() >= 3 && upper[0] == "CREATE" && upper[1] == "SCHEMA" {
            schemas.insert(tokens[2].to_string());
            return;
        }
        // DROP SCHEMA [IF EXISTS] <name> [CASCADE]
        if upper.len() >= 3 && upper[0] == "DROP" && upper[1] == "SCHEMA" {
            let name_idx = if upper.len() >= 5 && upper[2] == "IF" && upper[3] == "EXISTS" {
                4
            } else {
                2
            };
            if let Some(name) = tokens.get(name_idx) {
                schemas.remove(*name);
            }
            return;
        }
        // ALTER SCHEMA <a> RENAME TO <b>
        if upper.len() >= 6
            && upper[0] == "ALTER"
            && upper[1] == "SCHEMA"
            && upper[3] == "RENAME"
            && upper[4] == "TO"
        {
            if schemas.remove(tokens[2]) {
                schemas.insert(tokens[5].to_string());
            }
        }
    }
}

#[async_trait]
impl SqlSession for MemorySession {
    async fn execute(&self, sql: &str) -> SessionResult<()> {
        self.check_failure(sql)?;
        self.statements
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(sql.to_string());
        for statement in sql.split(';') {
            let statement = statement.trim();
            if !statement.is_empty() {
                self.apply(statement);
            }
        }
        Ok(())
    }

    async fn execute_script(&self, sql: &str, _timeout: Duration) -> SessionResult<()> {
        self.check_failure(sql)?;
        self.scripts
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(sql.to_string());
        Ok(())
    }

    async fn schema_exists(&self, schema: &str) -> SessionResult<bool> {
        Ok(self
            .schemas
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .contains(schema))
    }
}
