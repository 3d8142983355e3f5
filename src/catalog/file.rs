//! JSON-file tenant catalog
//!
//! Persists the tenant registry as a single JSON array on disk. This is the
//! catalog the CLI uses; server deployments plug in their own
//! `TenantCatalog` over the application database instead.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::errors::{CatalogError, CatalogResult};
use super::{temp_schema_name, Tenant, TenantCatalog};

/// File-backed catalog. The whole file is rewritten on every mutation; the
/// registry is small (one row per tenant) so this stays cheap.
#[derive(Debug)]
pub struct FileCatalog {
    path: PathBuf,
    // Serializes load-modify-store cycles across concurrent callers.
    write_lock: Mutex<()>,
}

impl FileCatalog {
    /// Open a catalog at `path`, creating an empty one if the file is absent.
    pub fn open(path: impl Into<PathBuf>) -> CatalogResult<Self> {
        let path = path.into();
        if !path.exists() {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).map_err(|e| CatalogError::Io(e.to_string()))?;
            }
            fs::write(&path, "[]").map_err(|e| CatalogError::Io(e.to_string()))?;
        }
        let catalog = Self {
            path,
            write_lock: Mutex::new(()),
        };
        // Validate the file parses up front
        catalog.load()?;
        Ok(catalog)
    }

    /// Insert or replace a tenant row.
    pub async fn insert(&self, tenant: Tenant) -> CatalogResult<()> {
        let _guard = self.write_lock.lock().await;
        let mut tenants = self.load()?;
        tenants.insert(tenant.id, tenant);
        self.store(&tenants)
    }

    fn load(&self) -> CatalogResult<BTreeMap<i64, Tenant>> {
        let json = fs::read_to_string(&self.path).map_err(|e| CatalogError::Io(e.to_string()))?;
        let rows: Vec<Tenant> =
            serde_json::from_str(&json).map_err(|e| CatalogError::Corrupt(e.to_string()))?;
        Ok(rows.into_iter().map(|t| (t.id, t)).collect())
    }

    fn store(&self, tenants: &BTreeMap<i64, Tenant>) -> CatalogResult<()> {
        let rows: Vec<&Tenant> = tenants.values().collect();
        let json = serde_json::to_string_pretty(&rows)
            .map_err(|e| CatalogError::Corrupt(e.to_string()))?;
        // Write-then-rename so a crash never leaves a half-written registry
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(|e| CatalogError::Io(e.to_string()))?;
        fs::rename(&tmp, &self.path).map_err(|e| CatalogError::Io(e.to_string()))
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl TenantCatalog for FileCatalog {
    async fn tenant(&self, id: i64) -> CatalogResult<Tenant> {
        let tenants = self.load()?;
        tenants
            .get(&id)
            .cloned()
            .ok_or(CatalogError::TenantNotFound(id))
    }

    async fn list_active(&self) -> CatalogResult<Vec<Tenant>> {
        let tenants = self.load()?;
        Ok(tenants.values().filter(|t| t.is_active).cloned().collect())
    }

    async fn upsert_temp_workspace(&self, production: &Tenant) -> CatalogResult<i64> {
        let _guard = self.write_lock.lock().await;
        let mut tenants = self.load()?;
        let temp_schema = temp_schema_name(&production.schema_name);

        let id = match tenants.values().find(|t| t.schema_name == temp_schema) {
            Some(existing) => existing.id,
            None => tenants.keys().next_back().copied().unwrap_or(0) + 1,
        };
        tenants.insert(id, production.derive_temp_workspace(id));
        self.store(&tenants)?;
        Ok(id)
    }

    async fn find_temp_workspace(&self, tenant_id: i64) -> CatalogResult<Option<i64>> {
        let tenants = self.load()?;
        let production = tenants
            .get(&tenant_id)
            .ok_or(CatalogError::TenantNotFound(tenant_id))?;
        let temp_schema = temp_schema_name(&production.schema_name);
        Ok(tenants
            .values()
            .find(|t| t.schema_name == temp_schema)
            .map(|t| t.id))
    }

    async fn remove_temp_workspace(&self, tenant_id: i64) -> CatalogResult<bool> {
        let _guard = self.write_lock.lock().await;
        let mut tenants = self.load()?;
        let temp_schema = match tenants.get(&tenant_id) {
            Some(production) => temp_schema_name(&production.schema_name),
            None => return Ok(false),
        };
        let temp_id = tenants
            .values()
            .find(|t| t.schema_name == temp_schema)
            .map(|t| t.id);
        match temp_id {
            Some(id) => {
                tenants.remove(&id);
                self.store(&tenants)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn remove_tenant(&self, id: i64) -> CatalogResult<()> {
        let _guard = self.write_lock.lock().await;
        let mut tenants = self.load()?;
        tenants
            .remove(&id)
            .ok_or(CatalogError::TenantNotFound(id))?;
        self.store(&tenants)
    }
}
