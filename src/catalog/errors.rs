//! Catalog errors

use thiserror::Error;

/// Result type for catalog operations
pub type CatalogResult<T> = Result<T, CatalogError>;

/// Catalog errors
#[derive(Debug, Clone, Error)]
pub enum CatalogError {
    #[error("Tenant not found: {0}")]
    TenantNotFound(i64),

    #[error("Catalog I/O error: {0}")]
    Io(String),

    #[error("Catalog data corrupt: {0}")]
    Corrupt(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_carries_tenant_id() {
        let err = CatalogError::TenantNotFound(42);
        assert!(err.to_string().contains("42"));
    }
}
