//! Lifecycle facade errors
//!
//! The facade aggregates the structured errors of the engines it drives.
//! Precondition failures (`TenantNotFound`, `NothingToPromote`) are clean
//! rejections that happen before any schema is touched.

use thiserror::Error;

use crate::catalog::CatalogError;
use crate::db::SessionError;
use crate::dump::DumpError;
use crate::restore::RestoreError;
use crate::store::StoreError;

/// Errors from lifecycle operations
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// The tenant id resolves to no catalog row
    #[error("tenant {0} not found")]
    TenantNotFound(i64),

    /// Promotion requested but no temp schema exists for the tenant
    #[error("tenant {tenant_id} has no temp schema {schema} to promote")]
    NothingToPromote { tenant_id: i64, schema: String },

    /// Snapshot dump failed
    #[error(transparent)]
    Dump(#[from] DumpError),

    /// Snapshot restore failed
    #[error(transparent)]
    Restore(#[from] RestoreError),

    /// DDL execution failed
    #[error(transparent)]
    Session(#[from] SessionError),

    /// Snapshot store failure
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Catalog failure other than a missing tenant
    #[error("catalog: {0}")]
    Catalog(String),
}

impl From<CatalogError> for LifecycleError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::TenantNotFound(id) => LifecycleError::TenantNotFound(id),
            other => LifecycleError::Catalog(other.to_string()),
        }
    }
}

/// Result type for lifecycle operations
pub type LifecycleResult<T> = Result<T, LifecycleError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_tenant_maps_to_tenant_not_found() {
        let err: LifecycleError = CatalogError::TenantNotFound(42).into();
        assert!(matches!(err, LifecycleError::TenantNotFound(42)));
        assert_eq!(err.to_string(), "tenant 42 not found");
    }

    #[test]
    fn test_other_catalog_errors_keep_their_message() {
        let err: LifecycleError = CatalogError::Corrupt("bad json".to_string()).into();
        assert!(err.to_string().contains("bad json"));
    }
}
