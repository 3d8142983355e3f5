//! Lifecycle facade for schemavault
//!
//! One object tying the engines together: catalog lookups, snapshot dumps,
//! restores into production or the Temp Workspace, promotion of a validated
//! temp schema, discard, snapshot deletion, and tenant removal.
//!
//! Mutating operations on the same tenant are serialized through a per-tenant
//! async lock, so a promote cannot interleave with a restore of the same
//! schema. Dumps and listings take no lock; pg_dump reads a consistent
//! snapshot on its own.
//!
//! Promotion is a three-way rename, not a copy:
//!
//! ```text
//! DROP SCHEMA IF EXISTS <prod>_old CASCADE;   -- stale leftover, if any
//! ALTER SCHEMA <prod> RENAME TO <prod>_old;
//! ALTER SCHEMA <prod>_temp RENAME TO <prod>;
//! DROP SCHEMA IF EXISTS <prod>_old CASCADE;
//! ```
//!
//! A crash between the renames leaves `<prod>_old` behind; the next promote
//! clears it first, and the `pre_promote_<ts>` safety snapshot taken before
//! any DDL covers data loss.

mod errors;

pub use errors::{LifecycleError, LifecycleResult};

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Mutex as AsyncMutex;

use crate::catalog::{Tenant, TenantCatalog};
use crate::config::VaultConfig;
use crate::db::SqlSession;
use crate::dump::DumpEngine;
use crate::observability::{Logger, Severity};
use crate::remote::RemoteStore;
use crate::restore::RestoreEngine;
use crate::store::{
    timestamp_label, DeletionResult, SnapshotInfo, SnapshotMeta, SnapshotStore,
};

/// What a restore produced, including the Temp Workspace registration.
#[derive(Debug, Clone)]
pub struct RestoreOutcome {
    /// The production tenant
    pub tenant_id: i64,
    /// Schema the snapshot was replayed into
    pub target_schema: String,
    /// The tenant's production schema
    pub production_schema: String,
    /// Whether the restore targeted the temp schema
    pub is_temp: bool,
    /// Catalog row id of the Temp Workspace, when one was registered
    pub temp_tenant_id: Option<i64>,
}

/// What a promotion did.
#[derive(Debug, Clone)]
pub struct PromotionOutcome {
    /// The production tenant
    pub tenant_id: i64,
    /// The schema that now carries the promoted contents
    pub production_schema: String,
    /// The temp schema that was renamed away
    pub temp_schema: String,
    /// Filename of the safety snapshot taken before any DDL
    pub safety_snapshot: String,
    /// Whether a Temp Workspace catalog row was removed
    pub workspace_removed: bool,
}

/// What a discard did. Both halves are idempotent, so a repeated discard
/// reports `false` for both.
#[derive(Debug, Clone)]
pub struct DiscardOutcome {
    /// The production tenant
    pub tenant_id: i64,
    /// The temp schema that was targeted
    pub temp_schema: String,
    /// Whether the temp schema existed and was dropped
    pub schema_dropped: bool,
    /// Whether a Temp Workspace catalog row was removed
    pub workspace_removed: bool,
}

/// What a tenant removal did.
#[derive(Debug, Clone)]
pub struct TenantRemoval {
    /// The removed catalog row id
    pub tenant_id: i64,
    /// Schemas dropped, in execution order
    pub dropped_schemas: Vec<String>,
    /// Where the snapshot directory was preserved, for a production tenant
    pub preserved_snapshots: Option<PathBuf>,
}

/// Facade over the catalog, the SQL session, and the dump/restore engines.
pub struct LifecycleManager {
    catalog: Arc<dyn TenantCatalog>,
    session: Arc<dyn SqlSession>,
    dump: Arc<DumpEngine>,
    restore: RestoreEngine,
    remote: Option<Arc<dyn RemoteStore>>,
    locks: StdMutex<HashMap<i64, Arc<AsyncMutex<()>>>>,
}

impl LifecycleManager {
    /// Build the facade from configuration and collaborators.
    pub fn new(
        config: &VaultConfig,
        catalog: Arc<dyn TenantCatalog>,
        session: Arc<dyn SqlSession>,
        remote: Option<Arc<dyn RemoteStore>>,
    ) -> Self {
        let store = SnapshotStore::new(config.snapshot_root.clone(), config.retention);
        let dump = Arc::new(DumpEngine::new(config, store, remote.clone()));
        let restore = RestoreEngine::new(
            session.clone(),
            dump.clone(),
            Duration::from_secs(config.restore_timeout_secs),
        );
        Self {
            catalog,
            session,
            dump,
            restore,
            remote,
            locks: StdMutex::new(HashMap::new()),
        }
    }

    /// The snapshot store backing this facade.
    pub fn store(&self) -> &SnapshotStore {
        self.dump.store()
    }

    /// The tenant catalog backing this facade.
    pub fn catalog(&self) -> &Arc<dyn TenantCatalog> {
        &self.catalog
    }

    /// One lock per tenant id, created on first use and kept forever; the
    /// map stays small because tenant ids are few and long-lived.
    fn tenant_lock(&self, tenant_id: i64) -> Arc<AsyncMutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        locks
            .entry(tenant_id)
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }

    async fn resolve(&self, tenant_id: i64) -> LifecycleResult<Tenant> {
        Ok(self.catalog.tenant(tenant_id).await?)
    }

    /// All snapshots of a tenant, newest first, with mirror state when a
    /// remote store is configured.
    pub async fn list_snapshots(&self, tenant_id: i64) -> LifecycleResult<Vec<SnapshotInfo>> {
        self.resolve(tenant_id).await?;
        Ok(self
            .store()
            .list(tenant_id, self.remote.as_deref())
            .await?)
    }

    /// Take a snapshot of the tenant's production schema. `label` defaults
    /// to today's date, overwriting any earlier snapshot from the same day.
    pub async fn dump(&self, tenant_id: i64, label: Option<&str>) -> LifecycleResult<PathBuf> {
        let tenant = self.resolve(tenant_id).await?;
        Ok(self.dump.dump(&tenant, label).await?)
    }

    /// Daily-snapshot entry point for the scheduler: dump at most once per
    /// calendar day and enforce retention. Returns the created path, or
    /// `None` when today's snapshot already exists.
    pub async fn ensure_daily_snapshot(&self, tenant: &Tenant) -> LifecycleResult<Option<PathBuf>> {
        Ok(self.dump.ensure_daily_snapshot(tenant).await?)
    }

    /// Restore a snapshot into production (`to_temp == false`) or into the
    /// Temp Workspace. A temp restore also registers the workspace row in
    /// the catalog so the restored schema is visible alongside the tenant.
    pub async fn restore(
        &self,
        tenant_id: i64,
        filename: &str,
        to_temp: bool,
    ) -> LifecycleResult<RestoreOutcome> {
        let lock = self.tenant_lock(tenant_id);
        let _guard = lock.lock().await;

        let tenant = self.resolve(tenant_id).await?;
        let restored = self.restore.restore(&tenant, filename, to_temp).await?;

        let temp_tenant_id = if to_temp {
            Some(self.catalog.upsert_temp_workspace(&tenant).await?)
        } else {
            None
        };

        Ok(RestoreOutcome {
            tenant_id,
            target_schema: restored.target_schema,
            production_schema: restored.production_schema,
            is_temp: restored.is_temp,
            temp_tenant_id,
        })
    }

    /// Promote the tenant's temp schema over its production schema.
    ///
    /// Fails with `NothingToPromote` before any DDL when no temp schema
    /// exists. Otherwise takes a `pre_promote_<ts>` safety snapshot, runs
    /// the three-way rename, and removes the Temp Workspace row.
    pub async fn promote(&self, tenant_id: i64) -> LifecycleResult<PromotionOutcome> {
        let lock = self.tenant_lock(tenant_id);
        let _guard = lock.lock().await;

        let tenant = self.resolve(tenant_id).await?;
        let production = tenant.schema_name.clone();
        let temp = tenant.temp_schema_name();
        let old = tenant.old_schema_name();

        if !self.session.schema_exists(&temp).await? {
            Logger::log(
                Severity::Warn,
                "promote_skipped",
                &[
                    ("tenant", &tenant_id.to_string()),
                    ("temp_schema", &temp),
                    ("reason", "temp schema does not exist"),
                ],
            );
            return Err(LifecycleError::NothingToPromote {
                tenant_id,
                schema: temp,
            });
        }

        Logger::log(
            Severity::Info,
            "promote_started",
            &[
                ("tenant", &tenant_id.to_string()),
                ("production", &production),
                ("temp_schema", &temp),
            ],
        );

        let label = format!("pre_promote_{}", timestamp_label(Utc::now()));
        let safety = self.dump.dump(&tenant, Some(&label)).await?;
        let safety_snapshot = safety
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.store()
            .enforce_retention(tenant_id, self.store().retention())
            .await?;

        self.session
            .execute(&format!("DROP SCHEMA IF EXISTS {} CASCADE;", old))
            .await?;
        self.session
            .execute(&format!("ALTER SCHEMA {} RENAME TO {};", production, old))
            .await?;
        self.session
            .execute(&format!("ALTER SCHEMA {} RENAME TO {};", temp, production))
            .await?;
        self.session
            .execute(&format!("DROP SCHEMA IF EXISTS {} CASCADE;", old))
            .await?;

        let workspace_removed = self.catalog.remove_temp_workspace(tenant_id).await?;

        Logger::log(
            Severity::Info,
            "promote_completed",
            &[
                ("tenant", &tenant_id.to_string()),
                ("production", &production),
                ("safety_snapshot", &safety_snapshot),
            ],
        );

        Ok(PromotionOutcome {
            tenant_id,
            production_schema: production,
            temp_schema: temp,
            safety_snapshot,
            workspace_removed,
        })
    }

    /// Drop the tenant's temp schema and remove the Temp Workspace row.
    /// Safe to call when neither exists.
    pub async fn discard_temp(&self, tenant_id: i64) -> LifecycleResult<DiscardOutcome> {
        let lock = self.tenant_lock(tenant_id);
        let _guard = lock.lock().await;

        let tenant = self.resolve(tenant_id).await?;
        let temp = tenant.temp_schema_name();

        let schema_dropped = self.session.schema_exists(&temp).await?;
        if schema_dropped {
            self.session
                .execute(&format!("DROP SCHEMA IF EXISTS {} CASCADE;", temp))
                .await?;
        }
        let workspace_removed = self.catalog.remove_temp_workspace(tenant_id).await?;

        Logger::log(
            Severity::Info,
            "temp_discarded",
            &[
                ("tenant", &tenant_id.to_string()),
                ("temp_schema", &temp),
                ("schema_dropped", &schema_dropped.to_string()),
            ],
        );

        Ok(DiscardOutcome {
            tenant_id,
            temp_schema: temp,
            schema_dropped,
            workspace_removed,
        })
    }

    /// Delete one snapshot file, optionally from the remote mirror too.
    pub async fn delete_snapshot(
        &self,
        tenant_id: i64,
        filename: &str,
        also_remote: bool,
    ) -> LifecycleResult<DeletionResult> {
        self.resolve(tenant_id).await?;
        let remote = if also_remote {
            self.remote.as_deref()
        } else {
            None
        };
        Ok(self.store().delete(tenant_id, filename, also_remote, remote).await?)
    }

    /// Attach or replace the title/description sidecar entry of a snapshot.
    pub async fn annotate_snapshot(
        &self,
        tenant_id: i64,
        filename: &str,
        meta: SnapshotMeta,
    ) -> LifecycleResult<()> {
        self.resolve(tenant_id).await?;
        Ok(self.store().annotate(tenant_id, filename, meta)?)
    }

    /// Trim the tenant's snapshots down to the configured retention count.
    pub async fn enforce_retention(&self, tenant_id: i64) -> LifecycleResult<Vec<String>> {
        self.resolve(tenant_id).await?;
        Ok(self
            .store()
            .enforce_retention(tenant_id, self.store().retention())
            .await?)
    }

    /// Remove a tenant row and its schemas.
    ///
    /// A production tenant loses its production and temp schemas, but its
    /// snapshot directory is preserved under a `.deleted_<ts>` name. A Temp
    /// Workspace row loses only its own schema, and its snapshot directory
    /// (if any) is purged along with its mirrored copies.
    pub async fn delete_tenant(&self, tenant_id: i64) -> LifecycleResult<TenantRemoval> {
        let lock = self.tenant_lock(tenant_id);
        let _guard = lock.lock().await;

        let tenant = self.resolve(tenant_id).await?;
        let mut dropped_schemas = Vec::new();

        let removal = if tenant.is_temp_workspace() {
            self.drop_schema_if_exists(&tenant.schema_name, &mut dropped_schemas)
                .await?;
            self.store().purge_tenant_dir(tenant_id)?;
            self.remove_remote_prefix(tenant_id).await;
            self.catalog.remove_tenant(tenant_id).await?;
            TenantRemoval {
                tenant_id,
                dropped_schemas,
                preserved_snapshots: None,
            }
        } else {
            let temp = tenant.temp_schema_name();
            self.drop_schema_if_exists(&temp, &mut dropped_schemas).await?;
            self.drop_schema_if_exists(&tenant.schema_name, &mut dropped_schemas)
                .await?;
            self.catalog.remove_temp_workspace(tenant_id).await?;
            let preserved = self.store().preserve_tenant_dir(tenant_id)?;
            self.catalog.remove_tenant(tenant_id).await?;
            TenantRemoval {
                tenant_id,
                dropped_schemas,
                preserved_snapshots: preserved,
            }
        };

        Logger::log(
            Severity::Info,
            "tenant_deleted",
            &[
                ("tenant", &tenant_id.to_string()),
                ("dropped_schemas", &removal.dropped_schemas.join(",")),
            ],
        );

        Ok(removal)
    }

    async fn drop_schema_if_exists(
        &self,
        schema: &str,
        dropped: &mut Vec<String>,
    ) -> LifecycleResult<()> {
        if self.session.schema_exists(schema).await? {
            self.session
                .execute(&format!("DROP SCHEMA IF EXISTS {} CASCADE;", schema))
                .await?;
            dropped.push(schema.to_string());
        }
        Ok(())
    }

    /// Best effort: mirrored copies of a purged tenant are garbage, but a
    /// mirror outage must not block the removal.
    async fn remove_remote_prefix(&self, tenant_id: i64) {
        let Some(remote) = &self.remote else {
            return;
        };
        let prefix = format!("tenant_{}", tenant_id);
        match remote.list(&prefix).await {
            Ok(keys) => {
                for key in keys {
                    if let Err(e) = remote.remove(&key).await {
                        Logger::log_stderr(
                            Severity::Warn,
                            "mirror_remove_failed",
                            &[("key", &key), ("error", &e.to_string())],
                        );
                    }
                }
            }
            Err(e) => {
                Logger::log_stderr(
                    Severity::Warn,
                    "mirror_list_failed",
                    &[("prefix", &prefix), ("error", &e.to_string())],
                );
            }
        }
    }
}
