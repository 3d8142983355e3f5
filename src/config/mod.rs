//! schemavault configuration
//!
//! Configuration is env-driven for deployment and serde-loadable for tests
//! and embedding. Every field has a default so a partial environment still
//! produces a usable config.

use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Database connection settings used by the pg_dump/psql subprocesses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DbConfig {
    /// Database host (default: "localhost")
    #[serde(default = "default_db_host")]
    pub host: String,

    /// Database port (default: 5432)
    #[serde(default = "default_db_port")]
    pub port: u16,

    /// Database user (default: "postgres")
    #[serde(default = "default_db_user")]
    pub user: String,

    /// Database password, passed to child processes via PGPASSWORD
    #[serde(default)]
    pub password: String,

    /// Database name (default: "postgres")
    #[serde(default = "default_db_name")]
    pub database: String,
}

/// Top-level schemavault configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultConfig {
    /// Database connection settings
    #[serde(default)]
    pub db: DbConfig,

    /// Root directory holding one snapshot subdirectory per tenant
    #[serde(default = "default_snapshot_root")]
    pub snapshot_root: PathBuf,

    /// How many local snapshots to keep per tenant (default: 30)
    #[serde(default = "default_retention")]
    pub retention: usize,

    /// Whether snapshots are mirrored to the remote store
    #[serde(default)]
    pub mirror_enabled: bool,

    /// Root directory of the directory-backed mirror, when enabled
    #[serde(default)]
    pub mirror_root: Option<PathBuf>,

    /// pg_dump executable (default: "pg_dump")
    #[serde(default = "default_pg_dump_bin")]
    pub pg_dump_bin: String,

    /// psql executable (default: "psql")
    #[serde(default = "default_psql_bin")]
    pub psql_bin: String,

    /// Hard ceiling for a restore's psql invocation, in seconds (default: 300)
    #[serde(default = "default_restore_timeout_secs")]
    pub restore_timeout_secs: u64,

    /// Startup grace sleep for the scheduler, in seconds (default: 60)
    #[serde(default = "default_scheduler_grace_secs")]
    pub scheduler_grace_secs: u64,

    /// Scheduler polling interval, in seconds (default: 3600)
    #[serde(default = "default_scheduler_poll_secs")]
    pub scheduler_poll_secs: u64,
}

fn default_db_host() -> String {
    "localhost".to_string()
}

fn default_db_port() -> u16 {
    5432
}

fn default_db_user() -> String {
    "postgres".to_string()
}

fn default_db_name() -> String {
    "postgres".to_string()
}

fn default_snapshot_root() -> PathBuf {
    PathBuf::from("./snapshots")
}

fn default_retention() -> usize {
    30
}

fn default_pg_dump_bin() -> String {
    "pg_dump".to_string()
}

fn default_psql_bin() -> String {
    "psql".to_string()
}

fn default_restore_timeout_secs() -> u64 {
    300
}

fn default_scheduler_grace_secs() -> u64 {
    60
}

fn default_scheduler_poll_secs() -> u64 {
    3600
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            host: default_db_host(),
            port: default_db_port(),
            user: default_db_user(),
            password: String::new(),
            database: default_db_name(),
        }
    }
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            db: DbConfig::default(),
            snapshot_root: default_snapshot_root(),
            retention: default_retention(),
            mirror_enabled: false,
            mirror_root: None,
            pg_dump_bin: default_pg_dump_bin(),
            psql_bin: default_psql_bin(),
            restore_timeout_secs: default_restore_timeout_secs(),
            scheduler_grace_secs: default_scheduler_grace_secs(),
            scheduler_poll_secs: default_scheduler_poll_secs(),
        }
    }
}

impl VaultConfig {
    /// Build a config from `VAULT_*` environment variables, falling back to
    /// defaults for anything unset or unparseable.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(v) = env::var("VAULT_DB_HOST") {
            cfg.db.host = v;
        }
        if let Some(v) = env_parse::<u16>("VAULT_DB_PORT") {
            cfg.db.port = v;
        }
        if let Ok(v) = env::var("VAULT_DB_USER") {
            cfg.db.user = v;
        }
        if let Ok(v) = env::var("VAULT_DB_PASSWORD") {
            cfg.db.password = v;
        }
        if let Ok(v) = env::var("VAULT_DB_NAME") {
            cfg.db.database = v;
        }
        if let Ok(v) = env::var("VAULT_SNAPSHOT_ROOT") {
            cfg.snapshot_root = PathBuf::from(v);
        }
        if let Some(v) = env_parse::<usize>("VAULT_RETENTION") {
            cfg.retention = v;
        }
        if let Ok(v) = env::var("VAULT_MIRROR_ENABLED") {
            cfg.mirror_enabled = matches!(v.as_str(), "1" | "true" | "yes");
        }
        if let Ok(v) = env::var("VAULT_MIRROR_ROOT") {
            cfg.mirror_root = Some(PathBuf::from(v));
        }
        if let Ok(v) = env::var("VAULT_PG_DUMP_BIN") {
            cfg.pg_dump_bin = v;
        }
        if let Ok(v) = env::var("VAULT_PSQL_BIN") {
            cfg.psql_bin = v;
        }
        if let Some(v) = env_parse::<u64>("VAULT_RESTORE_TIMEOUT_SECS") {
            cfg.restore_timeout_secs = v;
        }
        if let Some(v) = env_parse::<u64>("VAULT_SCHEDULER_GRACE_SECS") {
            cfg.scheduler_grace_secs = v;
        }
        if let Some(v) = env_parse::<u64>("VAULT_SCHEDULER_POLL_SECS") {
            cfg.scheduler_poll_secs = v;
        }

        cfg
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.parse().ok())
}
