//! Tenant catalog for schemavault
//!
//! A tenant is a university-like entity owning exactly one production
//! PostgreSQL schema. The catalog is the registry the lifecycle engine
//! consults to resolve tenant ids to schema names, and where the synthetic
//! Temp Workspace rows live while a restored snapshot is being validated.
//!
//! Temp Workspace rows are always created and removed through the single
//! idempotent operations `upsert_temp_workspace` / `remove_temp_workspace`,
//! so the schema and its catalog row cannot drift apart by design.

mod errors;
mod file;
mod memory;

pub use errors::{CatalogError, CatalogResult};
pub use file::FileCatalog;
pub use memory::MemoryCatalog;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Suffix of the ephemeral validation schema derived from a production schema.
pub const TEMP_SUFFIX: &str = "_temp";

/// Suffix of the transient schema left behind mid-promotion.
pub const OLD_SUFFIX: &str = "_old";

/// A tenant row.
///
/// `is_active == false` combined with a schema name ending in `_temp` marks a
/// Temp Workspace row rather than a real tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tenant {
    /// Numeric id
    pub id: i64,
    /// Display name
    pub name: String,
    /// Short code
    pub code: String,
    /// Production schema name, unique across tenants
    pub schema_name: String,
    /// Inactive rows are skipped by the scheduler
    pub is_active: bool,
    /// Optional logo reference (URL or asset key), display-only
    #[serde(default)]
    pub logo: Option<String>,
}

impl Tenant {
    /// Create an active tenant with the conventional `tenant_<id>` schema.
    pub fn new(id: i64, name: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            code: code.into(),
            schema_name: default_schema_name(id),
            is_active: true,
            logo: None,
        }
    }

    /// The `<schema>_temp` name this tenant's Temp Workspace uses.
    pub fn temp_schema_name(&self) -> String {
        temp_schema_name(&self.schema_name)
    }

    /// The `<schema>_old` name used transiently during promotion.
    pub fn old_schema_name(&self) -> String {
        format!("{}{}", self.schema_name, OLD_SUFFIX)
    }

    /// Whether this row represents a Temp Workspace rather than a real tenant.
    pub fn is_temp_workspace(&self) -> bool {
        !self.is_active && self.schema_name.ends_with(TEMP_SUFFIX)
    }

    /// Derive the canonical Temp Workspace row for this tenant.
    ///
    /// Name and code are suffixed so the row is recognizable anywhere tenants
    /// are listed, and the row is always inactive.
    pub fn derive_temp_workspace(&self, id: i64) -> Tenant {
        Tenant {
            id,
            name: format!("{} (temp)", self.name),
            code: format!("{}_TEMP", self.code),
            schema_name: self.temp_schema_name(),
            is_active: false,
            logo: self.logo.clone(),
        }
    }
}

/// Conventional schema name for a tenant id.
pub fn default_schema_name(id: i64) -> String {
    format!("tenant_{}", id)
}

/// The temp schema derived from a production schema name.
pub fn temp_schema_name(production: &str) -> String {
    format!("{}{}", production, TEMP_SUFFIX)
}

/// Tenant registry consumed by the lifecycle engine.
///
/// The web layer owns full tenant CRUD; the lifecycle engine only needs
/// lookups plus the Temp Workspace pair operations and tenant removal.
#[async_trait]
pub trait TenantCatalog: Send + Sync {
    /// Look up one tenant by id.
    async fn tenant(&self, id: i64) -> CatalogResult<Tenant>;

    /// All active tenants (Temp Workspace rows are inactive, so never listed).
    async fn list_active(&self) -> CatalogResult<Vec<Tenant>>;

    /// Create or update the Temp Workspace row for a production tenant.
    ///
    /// Idempotent: a pre-existing row is rewritten to the canonical name,
    /// code, and inactive flag. Returns the row's id either way.
    async fn upsert_temp_workspace(&self, production: &Tenant) -> CatalogResult<i64>;

    /// Find the Temp Workspace row id for a production tenant, if any.
    async fn find_temp_workspace(&self, tenant_id: i64) -> CatalogResult<Option<i64>>;

    /// Remove the Temp Workspace row for a production tenant.
    ///
    /// Idempotent: returns whether a row was actually removed.
    async fn remove_temp_workspace(&self, tenant_id: i64) -> CatalogResult<bool>;

    /// Remove a tenant row entirely.
    async fn remove_tenant(&self, id: i64) -> CatalogResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_schema_name() {
        assert_eq!(default_schema_name(7), "tenant_7");
    }

    #[test]
    fn test_temp_and_old_names() {
        let t = Tenant::new(5, "Uni Five", "U5");
        assert_eq!(t.schema_name, "tenant_5");
        assert_eq!(t.temp_schema_name(), "tenant_5_temp");
        assert_eq!(t.old_schema_name(), "tenant_5_old");
    }

    #[test]
    fn test_derive_temp_workspace() {
        let t = Tenant::new(5, "Uni Five", "U5");
        let temp = t.derive_temp_workspace(100);
        assert_eq!(temp.id, 100);
        assert_eq!(temp.name, "Uni Five (temp)");
        assert_eq!(temp.code, "U5_TEMP");
        assert_eq!(temp.schema_name, "tenant_5_temp");
        assert!(!temp.is_active);
        assert!(temp.is_temp_workspace());
    }

    #[test]
    fn test_active_tenant_is_not_temp_workspace() {
        let t = Tenant::new(5, "Uni Five", "U5");
        assert!(!t.is_temp_workspace());

        // An inactive real tenant is still not a temp workspace
        let mut disabled = t.clone();
        disabled.is_active = false;
        assert!(!disabled.is_temp_workspace());
    }
}
