//! Dump engine for schemavault
//!
//! Produces one snapshot artifact for a tenant's current schema state by
//! invoking `pg_dump` scoped to exactly that schema and streaming its output
//! through a gzip encoder straight to disk. Dumps can be large, so the
//! stream is compressed chunk by chunk and never buffered whole in memory.
//!
//! The dump is always taken with explicit schema qualification (pg_dump's
//! plain format qualifies every object with the schema name). The restore
//! engine's temp-schema rewrite depends on that property.

mod errors;

pub use errors::{DumpError, DumpErrorCode, DumpResult};

use std::io::Write;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;

use chrono::Utc;
use flate2::write::GzEncoder;
use flate2::Compression;
use tokio::io::AsyncReadExt;
use tokio::process::Command;

use crate::catalog::Tenant;
use crate::config::{DbConfig, VaultConfig};
use crate::observability::{Logger, Severity};
use crate::remote::RemoteStore;
use crate::store::{
    dated_label, snapshot_filename, validate_label, SnapshotStore,
};

const STREAM_CHUNK: usize = 64 * 1024;

/// Dump engine over one snapshot store.
pub struct DumpEngine {
    bin: String,
    db: DbConfig,
    store: SnapshotStore,
    remote: Option<Arc<dyn RemoteStore>>,
}

impl DumpEngine {
    /// Build an engine from config, a store, and an optional remote mirror.
    pub fn new(
        config: &VaultConfig,
        store: SnapshotStore,
        remote: Option<Arc<dyn RemoteStore>>,
    ) -> Self {
        Self {
            bin: config.pg_dump_bin.clone(),
            db: config.db.clone(),
            store,
            remote,
        }
    }

    /// The snapshot store this engine writes into
    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    /// Dump the tenant's schema into `<schema>_<label>.sql.gz`.
    ///
    /// Without a label, today's UTC date is used, which makes the scheduled
    /// daily dump naturally idempotent by filename. An existing file of the
    /// same name is overwritten (re-dumping a label refreshes it).
    ///
    /// On non-zero exit the partial output file is deleted and the error
    /// carries the tool's exit code and stderr. On success the artifact is
    /// mirrored to the remote store; mirror failure is logged, not raised —
    /// the local file is the source of truth.
    pub async fn dump(&self, tenant: &Tenant, label: Option<&str>) -> DumpResult<PathBuf> {
        let label = match label {
            Some(label) => {
                validate_label(label).map_err(|_| DumpError::bad_name(label.to_string()))?;
                label.to_string()
            }
            None => dated_label(Utc::now()),
        };
        let filename = snapshot_filename(&tenant.schema_name, &label);
        self.store.ensure_tenant_dir(tenant.id)?;
        let path = self.store.snapshot_path(tenant.id, &filename)?;

        Logger::log(
            Severity::Info,
            "dump_started",
            &[
                ("tenant", &tenant.id.to_string()),
                ("schema", &tenant.schema_name),
                ("filename", &filename),
            ],
        );

        if let Err(err) = self.run_pg_dump(&tenant.schema_name, &path).await {
            // Never leave a partial artifact behind
            let _ = std::fs::remove_file(&path);
            Logger::log_stderr(
                Severity::Error,
                "dump_failed",
                &[
                    ("tenant", &tenant.id.to_string()),
                    ("schema", &tenant.schema_name),
                    ("error", &err.to_string()),
                ],
            );
            return Err(err);
        }

        let size = std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
        Logger::log(
            Severity::Info,
            "dump_completed",
            &[
                ("tenant", &tenant.id.to_string()),
                ("filename", &filename),
                ("size_bytes", &size.to_string()),
            ],
        );

        self.mirror(tenant.id, &filename, &path).await;
        Ok(path)
    }

    /// Take today's dated snapshot unless it already exists, then enforce
    /// retention. This is the unit the scheduler invokes; returns None when
    /// today's snapshot was already present.
    pub async fn ensure_daily_snapshot(&self, tenant: &Tenant) -> DumpResult<Option<PathBuf>> {
        let filename = snapshot_filename(&tenant.schema_name, &dated_label(Utc::now()));
        let path = self.store.snapshot_path(tenant.id, &filename)?;
        if path.is_file() {
            return Ok(None);
        }

        let path = self.dump(tenant, None).await?;
        self.store
            .enforce_retention(tenant.id, self.store.retention())
            .await?;
        Ok(Some(path))
    }

    async fn run_pg_dump(&self, schema: &str, output: &PathBuf) -> DumpResult<()> {
        let mut child = Command::new(&self.bin)
            .arg("-h")
            .arg(&self.db.host)
            .arg("-p")
            .arg(self.db.port.to_string())
            .arg("-U")
            .arg(&self.db.user)
            .arg("-d")
            .arg(&self.db.database)
            .arg("-n")
            .arg(schema)
            .arg("--format=plain")
            .arg("--no-owner")
            .arg("--no-acl")
            .env("PGPASSWORD", &self.db.password)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| DumpError::spawn_failed(format!("{}: {}", self.bin, e)))?;

        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| DumpError::io("stdout pipe missing"))?;
        let mut stderr_pipe = child
            .stderr
            .take()
            .ok_or_else(|| DumpError::io("stderr pipe missing"))?;
        let stderr_task = tokio::spawn(async move {
            let mut buf = Vec::new();
            let _ = stderr_pipe.read_to_end(&mut buf).await;
            buf
        });

        // Stream stdout through gzip to disk, chunk by chunk
        let file = std::fs::File::create(output)?;
        let mut encoder = GzEncoder::new(file, Compression::default());
        let mut chunk = vec![0u8; STREAM_CHUNK];
        loop {
            let n = stdout
                .read(&mut chunk)
                .await
                .map_err(|e| DumpError::io(e.to_string()))?;
            if n == 0 {
                break;
            }
            encoder.write_all(&chunk[..n])?;
        }
        let file = encoder.finish()?;
        file.sync_all()?;

        let status = child
            .wait()
            .await
            .map_err(|e| DumpError::io(e.to_string()))?;
        let stderr = stderr_task.await.unwrap_or_default();

        if !status.success() {
            return Err(DumpError::tool_failed(
                status.code(),
                String::from_utf8_lossy(&stderr).into_owned(),
            ));
        }
        Ok(())
    }

    async fn mirror(&self, tenant_id: i64, filename: &str, path: &PathBuf) {
        let Some(remote) = &self.remote else {
            return;
        };
        let key = SnapshotStore::remote_key(tenant_id, filename);
        match remote.put(&key, path).await {
            Ok(()) => Logger::log(
                Severity::Info,
                "mirror_uploaded",
                &[("key", key.as_str())],
            ),
            Err(e) => Logger::log(
                Severity::Warn,
                "mirror_upload_failed",
                &[("key", key.as_str()), ("error", &e.to_string())],
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::DirMirror;
    use flate2::read::GzDecoder;
    use std::io::Read;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    const FAKE_SQL: &str = "CREATE TABLE tenant_5.faculties (id integer);";

    // pg_dump is stubbed with a shell script; no PostgreSQL server needed.
    fn write_stub(temp: &TempDir, name: &str, body: &str) -> String {
        let path = temp.path().join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        let mut perms = std::fs::metadata(&path).unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&path, perms).unwrap();
        path.to_string_lossy().into_owned()
    }

    fn engine(temp: &TempDir, bin: String, remote: Option<Arc<dyn RemoteStore>>) -> DumpEngine {
        let mut config = VaultConfig::default();
        config.pg_dump_bin = bin;
        let store = SnapshotStore::new(temp.path().join("snapshots"), 30);
        DumpEngine::new(&config, store, remote)
    }

    fn gunzip(path: &PathBuf) -> String {
        let bytes = std::fs::read(path).unwrap();
        let mut decoder = GzDecoder::new(&bytes[..]);
        let mut out = String::new();
        decoder.read_to_string(&mut out).unwrap();
        out
    }

    #[tokio::test]
    async fn test_dump_writes_gzipped_sql() {
        let temp = TempDir::new().unwrap();
        let bin = write_stub(&temp, "pg_dump_ok", &format!("echo '{}'", FAKE_SQL));
        let engine = engine(&temp, bin, None);
        let tenant = Tenant::new(5, "Uni Five", "U5");

        let path = engine.dump(&tenant, None).await.unwrap();
        let expected = snapshot_filename("tenant_5", &dated_label(Utc::now()));
        assert_eq!(path.file_name().unwrap().to_str().unwrap(), expected);
        assert!(gunzip(&path).contains("tenant_5.faculties"));
    }

    #[tokio::test]
    async fn test_dump_with_explicit_label() {
        let temp = TempDir::new().unwrap();
        let bin = write_stub(&temp, "pg_dump_ok", "echo hi");
        let engine = engine(&temp, bin, None);
        let tenant = Tenant::new(5, "Uni Five", "U5");

        let path = engine
            .dump(&tenant, Some("prerestore_20260827130509"))
            .await
            .unwrap();
        assert_eq!(
            path.file_name().unwrap().to_str().unwrap(),
            "tenant_5_prerestore_20260827130509.sql.gz"
        );
    }

    #[tokio::test]
    async fn test_dump_rejects_bad_label() {
        let temp = TempDir::new().unwrap();
        let bin = write_stub(&temp, "pg_dump_ok", "echo hi");
        let engine = engine(&temp, bin, None);
        let tenant = Tenant::new(5, "Uni Five", "U5");

        let err = engine.dump(&tenant, Some("../escape")).await.unwrap_err();
        assert_eq!(err.code(), DumpErrorCode::VaultDumpName);
    }

    #[tokio::test]
    async fn test_failed_dump_leaves_no_artifact() {
        let temp = TempDir::new().unwrap();
        let bin = write_stub(
            &temp,
            "pg_dump_fail",
            "echo partial; echo 'pg_dump: connection refused' >&2; exit 2",
        );
        let engine = engine(&temp, bin, None);
        let tenant = Tenant::new(5, "Uni Five", "U5");

        let err = engine.dump(&tenant, None).await.unwrap_err();
        assert_eq!(err.code(), DumpErrorCode::VaultDumpFailed);
        assert_eq!(err.exit_code(), Some(2));
        assert!(err.message().contains("connection refused"));

        let listed = engine.store().list(5, None).await.unwrap();
        assert!(listed.is_empty());
    }

    #[tokio::test]
    async fn test_dump_mirrors_to_remote() {
        let temp = TempDir::new().unwrap();
        let bin = write_stub(&temp, "pg_dump_ok", "echo hi");
        let mirror = Arc::new(DirMirror::new(temp.path().join("mirror")));
        let engine = engine(&temp, bin, Some(mirror.clone()));
        let tenant = Tenant::new(5, "Uni Five", "U5");

        let path = engine.dump(&tenant, Some("manual")).await.unwrap();
        let key = SnapshotStore::remote_key(5, path.file_name().unwrap().to_str().unwrap());
        assert!(mirror.exists(&key).await.unwrap());
    }

    #[tokio::test]
    async fn test_ensure_daily_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let bin = write_stub(&temp, "pg_dump_ok", "echo hi");
        let engine = engine(&temp, bin, None);
        let tenant = Tenant::new(5, "Uni Five", "U5");

        let first = engine.ensure_daily_snapshot(&tenant).await.unwrap();
        assert!(first.is_some());

        let second = engine.ensure_daily_snapshot(&tenant).await.unwrap();
        assert!(second.is_none());

        let listed = engine.store().list(5, None).await.unwrap();
        assert_eq!(listed.len(), 1);
    }

    #[tokio::test]
    async fn test_spawn_failure() {
        let temp = TempDir::new().unwrap();
        let engine = engine(&temp, "/nonexistent/pg_dump".to_string(), None);
        let tenant = Tenant::new(5, "Uni Five", "U5");

        let err = engine.dump(&tenant, None).await.unwrap_err();
        assert_eq!(err.code(), DumpErrorCode::VaultDumpSpawn);
    }
}
