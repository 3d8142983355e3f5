//! Snapshot store for schemavault
//!
//! Filesystem and remote-mirror bookkeeping for tenant snapshot files. The
//! on-disk layout is one directory per tenant under the snapshot root:
//!
//! ```text
//! <snapshot_root>/
//! ├── tenant_5/
//! │   ├── tenant_5_20260826.sql.gz
//! │   ├── tenant_5_prerestore_20260826091200.sql.gz
//! │   └── snapshots.meta.json
//! └── tenant_7/
//!     └── tenant_7_20260827.sql.gz
//! ```
//!
//! The local tree is the source of truth. The remote mirror is a durability
//! copy: retention never touches it, and mirror failures are never fatal.

mod errors;
mod meta;
mod naming;

pub use errors::{StoreError, StoreResult};
pub use meta::{SnapshotMeta, META_FILENAME};
pub use naming::{
    dated_label, label_of, snapshot_filename, timestamp_label, validate_filename, validate_label,
    SNAPSHOT_EXT,
};

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::observability::{Logger, Severity};
use crate::remote::{RemoteError, RemoteStore};

/// One listed snapshot
#[derive(Debug, Clone, Serialize)]
pub struct SnapshotInfo {
    /// Snapshot filename, `<schema>_<label>.sql.gz`
    pub filename: String,
    /// Local file size in bytes
    pub size_bytes: u64,
    /// Local file modification time
    pub created_at: DateTime<Utc>,
    /// Whether a copy exists in the remote mirror
    pub mirrored: bool,
    /// Optional human title from the metadata sidecar
    pub title: Option<String>,
    /// Optional description from the metadata sidecar
    pub description: Option<String>,
}

/// Per-leg outcome of a snapshot deletion.
///
/// Local deletion is mandatory (its failure is an error, not a result); the
/// remote and metadata legs are best-effort and reported here so callers can
/// distinguish full from partial success and retry the failed leg.
#[derive(Debug, Clone, Serialize)]
pub struct DeletionResult {
    /// The deleted filename
    pub filename: String,
    /// Always true when this result is returned
    pub local_deleted: bool,
    /// None if the remote leg was not attempted (disabled or not requested)
    pub remote_deleted: Option<bool>,
    /// Whether a metadata row existed and was removed
    pub metadata_deleted: bool,
}

impl DeletionResult {
    /// True when every attempted leg succeeded
    pub fn fully_deleted(&self) -> bool {
        self.local_deleted && self.remote_deleted.unwrap_or(true)
    }
}

/// Snapshot store rooted at one directory.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    root: PathBuf,
    retention: usize,
}

impl SnapshotStore {
    /// Create a store over `root`, keeping `retention` snapshots per tenant.
    pub fn new(root: impl Into<PathBuf>, retention: usize) -> Self {
        Self {
            root: root.into(),
            retention,
        }
    }

    /// Store root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Configured retention count
    pub fn retention(&self) -> usize {
        self.retention
    }

    /// The tenant's snapshot directory, `<root>/tenant_<id>`
    pub fn tenant_dir(&self, tenant_id: i64) -> PathBuf {
        self.root.join(format!("tenant_{}", tenant_id))
    }

    /// The tenant's snapshot directory, created on demand.
    pub fn ensure_tenant_dir(&self, tenant_id: i64) -> StoreResult<PathBuf> {
        let dir = self.tenant_dir(tenant_id);
        fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    /// Remote mirror key for a snapshot
    pub fn remote_key(tenant_id: i64, filename: &str) -> String {
        format!("tenant_{}/{}", tenant_id, filename)
    }

    /// Validated absolute path of a snapshot file. The filename is checked
    /// against the naming convention before any path is built, so a
    /// traversal attempt can never address anything outside the tenant dir.
    pub fn snapshot_path(&self, tenant_id: i64, filename: &str) -> StoreResult<PathBuf> {
        validate_filename(filename)?;
        Ok(self.tenant_dir(tenant_id).join(filename))
    }

    /// List a tenant's snapshots, newest first by modification time.
    ///
    /// Creates the tenant directory on demand, cross-references the remote
    /// mirror for the `mirrored` flag, and joins the metadata sidecar.
    pub async fn list(
        &self,
        tenant_id: i64,
        remote: Option<&dyn RemoteStore>,
    ) -> StoreResult<Vec<SnapshotInfo>> {
        let dir = self.ensure_tenant_dir(tenant_id)?;

        let mirrored_keys: HashSet<String> = match remote {
            Some(store) => match store.list(&format!("tenant_{}", tenant_id)).await {
                Ok(keys) => keys.into_iter().collect(),
                Err(e) => {
                    Logger::log(
                        Severity::Warn,
                        "mirror_list_failed",
                        &[("tenant", &tenant_id.to_string()), ("error", &e.to_string())],
                    );
                    HashSet::new()
                }
            },
            None => HashSet::new(),
        };

        let annotations = meta::load_all(&dir);
        let mut snapshots = Vec::new();

        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            let name = match entry.file_name().into_string() {
                Ok(name) => name,
                Err(_) => continue,
            };
            if !name.ends_with(SNAPSHOT_EXT) {
                continue;
            }

            let metadata = entry.metadata()?;
            let created_at: DateTime<Utc> = metadata
                .modified()
                .map(DateTime::from)
                .unwrap_or_else(|_| Utc::now());
            let annotation = annotations.get(&name).cloned().unwrap_or_default();

            snapshots.push(SnapshotInfo {
                mirrored: mirrored_keys.contains(&Self::remote_key(tenant_id, &name)),
                size_bytes: metadata.len(),
                created_at,
                title: annotation.title,
                description: annotation.description,
                filename: name,
            });
        }

        // Filename as tie-breaker keeps the order deterministic when mtimes
        // collide (coarse filesystem timestamps).
        snapshots.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.filename.cmp(&a.filename))
        });
        Ok(snapshots)
    }

    /// Delete one snapshot by name.
    ///
    /// The local file must exist (NotFound otherwise). The remote and
    /// metadata legs are best-effort; their outcomes are reported in the
    /// result rather than raised.
    pub async fn delete(
        &self,
        tenant_id: i64,
        filename: &str,
        also_remote: bool,
        remote: Option<&dyn RemoteStore>,
    ) -> StoreResult<DeletionResult> {
        let path = self.snapshot_path(tenant_id, filename)?;
        if !path.is_file() {
            return Err(StoreError::NotFound(filename.to_string()));
        }
        fs::remove_file(&path)?;

        let remote_deleted = match (also_remote, remote) {
            (true, Some(store)) => {
                let key = Self::remote_key(tenant_id, filename);
                match store.remove(&key).await {
                    Ok(()) => Some(true),
                    Err(RemoteError::NotFound(_)) => Some(false),
                    Err(e) => {
                        Logger::log(
                            Severity::Warn,
                            "mirror_delete_failed",
                            &[("key", key.as_str()), ("error", &e.to_string())],
                        );
                        Some(false)
                    }
                }
            }
            _ => None,
        };

        let metadata_deleted = match meta::remove(&self.tenant_dir(tenant_id), filename) {
            Ok(existed) => existed,
            Err(e) => {
                Logger::log(
                    Severity::Warn,
                    "snapshot_meta_delete_failed",
                    &[("filename", filename), ("error", &e.to_string())],
                );
                false
            }
        };

        Ok(DeletionResult {
            filename: filename.to_string(),
            local_deleted: true,
            remote_deleted,
            metadata_deleted,
        })
    }

    /// Keep the newest `keep` local snapshots, deleting the rest oldest
    /// first. Remote copies are left untouched (the mirror doubles as a
    /// longer-term archive). Returns the deleted filenames.
    pub async fn enforce_retention(&self, tenant_id: i64, keep: usize) -> StoreResult<Vec<String>> {
        let snapshots = self.list(tenant_id, None).await?;
        let mut deleted = Vec::new();

        for info in snapshots.iter().skip(keep) {
            let path = self.tenant_dir(tenant_id).join(&info.filename);
            fs::remove_file(&path)?;
            let _ = meta::remove(&self.tenant_dir(tenant_id), &info.filename);
            deleted.push(info.filename.clone());
        }

        if !deleted.is_empty() {
            Logger::log(
                Severity::Info,
                "retention_enforced",
                &[
                    ("tenant", &tenant_id.to_string()),
                    ("deleted", &deleted.len().to_string()),
                    ("keep", &keep.to_string()),
                ],
            );
        }
        Ok(deleted)
    }

    /// Annotate a snapshot with a title/description.
    pub fn annotate(&self, tenant_id: i64, filename: &str, meta: SnapshotMeta) -> StoreResult<()> {
        validate_filename(filename)?;
        let dir = self.ensure_tenant_dir(tenant_id)?;
        meta::set(&dir, filename, meta)
    }

    /// Delete a tenant's whole snapshot directory. Used when a temp
    /// workspace is torn down; its backups are not meant to persist.
    pub fn purge_tenant_dir(&self, tenant_id: i64) -> StoreResult<()> {
        let dir = self.tenant_dir(tenant_id);
        if dir.is_dir() {
            fs::remove_dir_all(&dir)?;
        }
        Ok(())
    }

    /// Rename a tenant's snapshot directory out of the active namespace
    /// instead of deleting it, so backups survive tenant deletion and an
    /// operator can undo the deletion later. Returns the preserved path, or
    /// None if the tenant had no snapshot directory.
    pub fn preserve_tenant_dir(&self, tenant_id: i64) -> StoreResult<Option<PathBuf>> {
        let dir = self.tenant_dir(tenant_id);
        if !dir.is_dir() {
            return Ok(None);
        }
        let preserved = self.root.join(format!(
            "tenant_{}.deleted_{}",
            tenant_id,
            timestamp_label(Utc::now())
        ));
        fs::rename(&dir, &preserved)?;
        Ok(Some(preserved))
    }
}
