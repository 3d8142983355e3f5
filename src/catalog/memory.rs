//! In-memory tenant catalog
//!
//! Used by tests and by embedders that manage tenants elsewhere and only
//! need to hand the lifecycle engine a registry view.

use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;

use super::errors::{CatalogError, CatalogResult};
use super::{temp_schema_name, Tenant, TenantCatalog};

/// In-memory catalog backed by a `BTreeMap` keyed by tenant id.
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    tenants: RwLock<BTreeMap<i64, Tenant>>,
}

impl MemoryCatalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a tenant row, replacing any row with the same id.
    pub fn insert(&self, tenant: Tenant) {
        let mut tenants = self.tenants.write().unwrap_or_else(|e| e.into_inner());
        tenants.insert(tenant.id, tenant);
    }

    /// Number of rows (temp workspace rows included)
    pub fn len(&self) -> usize {
        self.tenants
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    /// Whether the catalog holds no rows
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn next_id(tenants: &BTreeMap<i64, Tenant>) -> i64 {
        tenants.keys().next_back().copied().unwrap_or(0) + 1
    }
}

#[async_trait]
impl TenantCatalog for MemoryCatalog {
    async fn tenant(&self, id: i64) -> CatalogResult<Tenant> {
        let tenants = self.tenants.read().unwrap_or_else(|e| e.into_inner());
        tenants
            .get(&id)
            .cloned()
            .ok_or(CatalogError::TenantNotFound(id))
    }

    async fn list_active(&self) -> CatalogResult<Vec<Tenant>> {
        let tenants = self.tenants.read().unwrap_or_else(|e| e.into_inner());
        Ok(tenants.values().filter(|t| t.is_active).cloned().collect())
    }

    async fn upsert_temp_workspace(&self, production: &Tenant) -> CatalogResult<i64> {
        let mut tenants = self.tenants.write().unwrap_or_else(|e| e.into_inner());
        let temp_schema = temp_schema_name(&production.schema_name);

        if let Some(existing) = tenants.values().find(|t| t.schema_name == temp_schema) {
            let id = existing.id;
            tenants.insert(id, production.derive_temp_workspace(id));
            return Ok(id);
        }

        let id = Self::next_id(&tenants);
        tenants.insert(id, production.derive_temp_workspace(id));
        Ok(id)
    }

    async fn find_temp_workspace(&self, tenant_id: i64) -> CatalogResult<Option<i64>> {
        let tenants = self.tenants.read().unwrap_or_else(|e| e.into_inner());
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
        let mut tenants = self.tenants.write().unwrap_or_else(|e| e.into_inner());
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
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn remove_tenant(&self, id: i64) -> CatalogResult<()> {
        let mut tenants = self.tenants.write().unwrap_or_else(|e| e.into_inner());
        tenants
            .remove(&id)
            .map(|_| ())
            .ok_or(CatalogError::TenantNotFound(id))
    }
}
