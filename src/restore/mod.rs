//! Restore engine for schemavault
//!
//! Reconstructs a schema's contents from a chosen snapshot, either in place
//! (production) or into the parallel `_temp` schema for validation.
//!
//! Steps, each a hard precondition for the next:
//!
//! 1. Compute the target schema (production, or production + `_temp`)
//! 2. Validate the snapshot filename and its presence on disk
//! 3. Production only: take a `prerestore_<ts>` safety dump so an undo
//!    point exists before any destructive DDL
//! 4. `DROP SCHEMA IF EXISTS <target> CASCADE; CREATE SCHEMA <target>` —
//!    the target starts empty regardless of prior state, which also makes
//!    restore re-entrant after a failure
//! 5. Decompress the snapshot; rewrite schema references when targeting temp
//! 6. Feed the SQL to the execution tool over stdin under a hard timeout
//!
//! A failure in step 6 leaves the target schema empty or partially
//! populated. There is no outer transaction spanning the external process;
//! the drop/recreate in step 4 is what makes re-running safe.

mod errors;
mod rewrite;

pub use errors::{RestoreError, RestoreErrorCode, RestoreResult};
pub use rewrite::redirect_schema;

use std::io::Read;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use flate2::read::GzDecoder;

use crate::catalog::Tenant;
use crate::db::SqlSession;
use crate::dump::DumpEngine;
use crate::observability::{Logger, Severity};
use crate::store::timestamp_label;

/// What a completed restore produced.
#[derive(Debug, Clone)]
pub struct RestoredSchema {
    /// The schema the snapshot was replayed into
    pub target_schema: String,
    /// The tenant's production schema
    pub production_schema: String,
    /// Whether the target was the temp schema
    pub is_temp: bool,
}

/// Restore engine over one SQL session and dump engine.
pub struct RestoreEngine {
    session: Arc<dyn SqlSession>,
    dump: Arc<DumpEngine>,
    timeout: Duration,
}

impl RestoreEngine {
    /// Build an engine. `timeout` is the hard ceiling for the SQL replay.
    pub fn new(session: Arc<dyn SqlSession>, dump: Arc<DumpEngine>, timeout: Duration) -> Self {
        Self {
            session,
            dump,
            timeout,
        }
    }

    /// Restore `filename` into the tenant's production schema, or into its
    /// temp schema when `to_temp`. Restoring to temp never touches
    /// production data and therefore skips the safety dump.
    pub async fn restore(
        &self,
        tenant: &Tenant,
        filename: &str,
        to_temp: bool,
    ) -> RestoreResult<RestoredSchema> {
        let production_schema = tenant.schema_name.clone();
        let target_schema = if to_temp {
            tenant.temp_schema_name()
        } else {
            production_schema.clone()
        };

        let path = self.dump.store().snapshot_path(tenant.id, filename)?;
        if !path.is_file() {
            return Err(RestoreError::not_found(filename.to_string()));
        }

        Logger::log(
            Severity::Info,
            "restore_started",
            &[
                ("tenant", &tenant.id.to_string()),
                ("filename", filename),
                ("target", &target_schema),
            ],
        );

        if !to_temp {
            // Undo point before any destructive DDL
            let label = format!("prerestore_{}", timestamp_label(Utc::now()));
            self.dump.dump(tenant, Some(&label)).await?;
            self.dump
                .store()
                .enforce_retention(tenant.id, self.dump.store().retention())
                .await?;
        }

        self.session
            .execute(&format!(
                "DROP SCHEMA IF EXISTS {target} CASCADE; CREATE SCHEMA {target};",
                target = target_schema
            ))
            .await?;

        let mut sql = self.decompress(&path)?;
        if to_temp {
            sql = redirect_schema(&sql, &production_schema, &target_schema);
        }

        if let Err(e) = self.session.execute_script(&sql, self.timeout).await {
            let err: RestoreError = e.into();
            Logger::log_stderr(
                Severity::Error,
                "restore_failed",
                &[
                    ("tenant", &tenant.id.to_string()),
                    ("filename", filename),
                    ("target", &target_schema),
                    ("error", err.message()),
                ],
            );
            return Err(err);
        }

        Logger::log(
            Severity::Info,
            "restore_completed",
            &[
                ("tenant", &tenant.id.to_string()),
                ("filename", filename),
                ("target", &target_schema),
            ],
        );

        Ok(RestoredSchema {
            target_schema,
            production_schema,
            is_temp: to_temp,
        })
    }

    fn decompress(&self, path: &std::path::Path) -> RestoreResult<String> {
        let bytes = std::fs::read(path).map_err(|e| RestoreError::io(e.to_string()))?;
        let mut decoder = GzDecoder::new(&bytes[..]);
        let mut sql = String::new();
        decoder
            .read_to_string(&mut sql)
            .map_err(|e| RestoreError::io(format!("decompress {}: {}", path.display(), e)))?;
        Ok(sql)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VaultConfig;
    use crate::db::MemorySession;
    use crate::store::{snapshot_filename, SnapshotStore};
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    const SNAPSHOT_SQL: &str = "CREATE TABLE tenant_5.faculties (id integer);\n\
                                INSERT INTO tenant_5.faculties VALUES (1);\n\
                                COPY \"tenant_5\".\"lectures\" (id) FROM stdin;\n";

    fn write_snapshot(store: &SnapshotStore, tenant_id: i64, filename: &str, sql: &str) {
        let dir = store.ensure_tenant_dir(tenant_id).unwrap();
        let file = std::fs::File::create(dir.join(filename)).unwrap();
        let mut encoder = GzEncoder::new(file, Compression::default());
        encoder.write_all(sql.as_bytes()).unwrap();
        encoder.finish().unwrap();
    }

    fn stub_pg_dump(temp: &TempDir) -> String {
        let path = temp.path().join("pg_dump_stub");
        std::fs::write(&path, "#!/bin/sh\necho 'CREATE TABLE tenant_5.safety ();'\n").unwrap();
        let mut perms = std::fs::metadata(&path).unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&path, perms).unwrap();
        path.to_string_lossy().into_owned()
    }

    fn harness(temp: &TempDir) -> (Arc<MemorySession>, RestoreEngine, SnapshotStore) {
        let mut config = VaultConfig::default();
        config.pg_dump_bin = stub_pg_dump(temp);
        let store = SnapshotStore::new(temp.path().join("snapshots"), 30);
        let session = Arc::new(MemorySession::new());
        let dump = Arc::new(DumpEngine::new(&config, store.clone(), None));
        let engine = RestoreEngine::new(session.clone(), dump, Duration::from_secs(300));
        (session, engine, store)
    }

    #[tokio::test]
    async fn test_restore_to_temp_targets_only_temp_schema() {
        let temp = TempDir::new().unwrap();
        let (session, engine, store) = harness(&temp);
        let tenant = Tenant::new(5, "Uni Five", "U5");
        session.add_schema("tenant_5");

        let filename = snapshot_filename("tenant_5", "20260827");
        write_snapshot(&store, 5, &filename, SNAPSHOT_SQL);

        let restored = engine.restore(&tenant, &filename, true).await.unwrap();
        assert_eq!(restored.target_schema, "tenant_5_temp");
        assert_eq!(restored.production_schema, "tenant_5");
        assert!(restored.is_temp);

        // Production schema still present, temp schema recreated
        assert_eq!(session.schema_names(), vec!["tenant_5", "tenant_5_temp"]);

        // DDL touched only the temp schema
        let ddl = session.statements().join("\n");
        assert!(ddl.contains("DROP SCHEMA IF EXISTS tenant_5_temp CASCADE"));
        assert!(!ddl.contains("DROP SCHEMA IF EXISTS tenant_5 CASCADE"));

        // Replayed SQL was fully rewritten
        let scripts = session.scripts();
        assert_eq!(scripts.len(), 1);
        assert!(scripts[0].contains("tenant_5_temp.faculties"));
        assert!(scripts[0].contains("\"tenant_5_temp\".\"lectures\""));
        assert!(!scripts[0].contains(" tenant_5."));
    }

    #[tokio::test]
    async fn test_restore_to_production_takes_safety_dump_first() {
        let temp = TempDir::new().unwrap();
        let (session, engine, store) = harness(&temp);
        let tenant = Tenant::new(5, "Uni Five", "U5");
        session.add_schema("tenant_5");

        let filename = snapshot_filename("tenant_5", "20260820");
        write_snapshot(&store, 5, &filename, SNAPSHOT_SQL);

        let restored = engine.restore(&tenant, &filename, false).await.unwrap();
        assert_eq!(restored.target_schema, "tenant_5");
        assert!(!restored.is_temp);

        // A prerestore_* snapshot now exists alongside the original
        let listed = store.list(5, None).await.unwrap();
        assert!(listed
            .iter()
            .any(|s| s.filename.starts_with("tenant_5_prerestore_")));

        // Production SQL replayed unmodified
        let scripts = session.scripts();
        assert!(scripts[0].contains("tenant_5.faculties"));
        assert!(!scripts[0].contains("tenant_5_temp"));
    }

    #[tokio::test]
    async fn test_failed_safety_dump_blocks_production_restore() {
        let temp = TempDir::new().unwrap();
        let mut config = VaultConfig::default();

        // pg_dump stub that fails with a diagnostic on stderr
        let stub = temp.path().join("pg_dump_fail");
        std::fs::write(&stub, "#!/bin/sh\necho 'pg_dump: error: out of disk' >&2\nexit 2\n")
            .unwrap();
        let mut perms = std::fs::metadata(&stub).unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&stub, perms).unwrap();
        config.pg_dump_bin = stub.to_string_lossy().into_owned();

        let store = SnapshotStore::new(temp.path().join("snapshots"), 30);
        let session = Arc::new(MemorySession::new());
        let dump = Arc::new(DumpEngine::new(&config, store.clone(), None));
        let engine = RestoreEngine::new(session.clone(), dump, Duration::from_secs(300));

        let tenant = Tenant::new(5, "Uni Five", "U5");
        session.add_schema("tenant_5");
        let filename = snapshot_filename("tenant_5", "20260820");
        write_snapshot(&store, 5, &filename, SNAPSHOT_SQL);

        let err = engine.restore(&tenant, &filename, false).await.unwrap_err();
        assert_eq!(err.code(), RestoreErrorCode::VaultRestoreSafetyDump);
        assert!(err.message().contains("exit code 2"));
        assert!(err.message().contains("out of disk"));

        // Production untouched: no DDL ran, nothing was replayed
        assert!(session.statements().is_empty());
        assert!(session.scripts().is_empty());
    }

    #[tokio::test]
    async fn test_missing_snapshot_is_clean_not_found() {
        let temp = TempDir::new().unwrap();
        let (session, engine, _store) = harness(&temp);
        let tenant = Tenant::new(5, "Uni Five", "U5");
        session.add_schema("tenant_5");

        let err = engine
            .restore(&tenant, "tenant_5_20990101.sql.gz", true)
            .await
            .unwrap_err();
        assert_eq!(err.code(), RestoreErrorCode::VaultRestoreNotFound);

        // No side effects: no DDL, no scripts, no safety dump
        assert!(session.statements().is_empty());
        assert!(session.scripts().is_empty());
    }

    #[tokio::test]
    async fn test_traversal_filename_rejected_before_any_access() {
        let temp = TempDir::new().unwrap();
        let (session, engine, _store) = harness(&temp);
        let tenant = Tenant::new(5, "Uni Five", "U5");

        let err = engine
            .restore(&tenant, "../../etc/passwd", false)
            .await
            .unwrap_err();
        assert_eq!(err.code(), RestoreErrorCode::VaultRestoreName);
        assert!(session.statements().is_empty());
    }

    #[tokio::test]
    async fn test_tool_failure_surfaces_stderr() {
        let temp = TempDir::new().unwrap();
        let (session, engine, store) = harness(&temp);
        let tenant = Tenant::new(5, "Uni Five", "U5");
        session.add_schema("tenant_5");
        session.fail_matching("faculties");

        let filename = snapshot_filename("tenant_5", "20260827");
        write_snapshot(&store, 5, &filename, SNAPSHOT_SQL);

        let err = engine.restore(&tenant, &filename, true).await.unwrap_err();
        assert_eq!(err.code(), RestoreErrorCode::VaultRestoreFailed);
        assert!(err.message().contains("injected failure"));

        // The drop/recreate already ran: temp schema exists but is empty
        assert!(session.schema_names().contains(&"tenant_5_temp".to_string()));
    }

    #[tokio::test]
    async fn test_corrupt_snapshot_is_io_error() {
        let temp = TempDir::new().unwrap();
        let (session, engine, store) = harness(&temp);
        let tenant = Tenant::new(5, "Uni Five", "U5");
        session.add_schema("tenant_5");

        let dir = store.ensure_tenant_dir(5).unwrap();
        std::fs::write(dir.join("tenant_5_bad.sql.gz"), b"not gzip").unwrap();

        let err = engine
            .restore(&tenant, "tenant_5_bad.sql.gz", true)
            .await
            .unwrap_err();
        assert_eq!(err.code(), RestoreErrorCode::VaultRestoreIo);
    }
}
