//! Snapshot metadata sidecar
//!
//! Optional human title/description per snapshot, keyed by filename and kept
//! in one JSON sidecar per tenant directory. The sidecar is bookkeeping only:
//! losing it loses titles, never snapshots.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::errors::{StoreError, StoreResult};

/// Sidecar filename inside each tenant snapshot directory
pub const META_FILENAME: &str = "snapshots.meta.json";

/// Human annotations for one snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotMeta {
    /// Short human title
    #[serde(default)]
    pub title: Option<String>,
    /// Longer free-form description
    #[serde(default)]
    pub description: Option<String>,
}

fn meta_path(tenant_dir: &Path) -> PathBuf {
    tenant_dir.join(META_FILENAME)
}

/// Load the full sidecar map for a tenant directory. A missing or unreadable
/// sidecar reads as empty.
pub fn load_all(tenant_dir: &Path) -> BTreeMap<String, SnapshotMeta> {
    let path = meta_path(tenant_dir);
    fs::read_to_string(&path)
        .ok()
        .and_then(|json| serde_json::from_str(&json).ok())
        .unwrap_or_default()
}

fn store_all(tenant_dir: &Path, map: &BTreeMap<String, SnapshotMeta>) -> StoreResult<()> {
    let json = serde_json::to_string_pretty(map).map_err(|e| StoreError::Io(e.to_string()))?;
    fs::write(meta_path(tenant_dir), json)?;
    Ok(())
}

/// Set (or clear, with an empty meta) the annotation for one snapshot.
pub fn set(tenant_dir: &Path, filename: &str, meta: SnapshotMeta) -> StoreResult<()> {
    let mut map = load_all(tenant_dir);
    if meta == SnapshotMeta::default() {
        map.remove(filename);
    } else {
        map.insert(filename.to_string(), meta);
    }
    store_all(tenant_dir, &map)
}

/// Remove the annotation for one snapshot. Returns whether a row existed.
pub fn remove(tenant_dir: &Path, filename: &str) -> StoreResult<bool> {
    let mut map = load_all(tenant_dir);
    let existed = map.remove(filename).is_some();
    if existed {
        store_all(tenant_dir, &map)?;
    }
    Ok(existed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_sidecar_reads_empty() {
        let temp = TempDir::new().unwrap();
        assert!(load_all(temp.path()).is_empty());
    }

    #[test]
    fn test_set_and_load() {
        let temp = TempDir::new().unwrap();
        set(
            temp.path(),
            "tenant_5_20260827.sql.gz",
            SnapshotMeta {
                title: Some("before term import".to_string()),
                description: None,
            },
        )
        .unwrap();

        let map = load_all(temp.path());
        assert_eq!(
            map["tenant_5_20260827.sql.gz"].title.as_deref(),
            Some("before term import")
        );
    }

    #[test]
    fn test_remove() {
        let temp = TempDir::new().unwrap();
        set(
            temp.path(),
            "a.sql.gz",
            SnapshotMeta {
                title: Some("t".to_string()),
                description: None,
            },
        )
        .unwrap();

        assert!(remove(temp.path(), "a.sql.gz").unwrap());
        assert!(!remove(temp.path(), "a.sql.gz").unwrap());
        assert!(load_all(temp.path()).is_empty());
    }

    #[test]
    fn test_corrupt_sidecar_reads_empty() {
        let temp = TempDir::new().unwrap();
        fs::write(meta_path(temp.path()), "{oops").unwrap();
        assert!(load_all(temp.path()).is_empty());
    }
}
