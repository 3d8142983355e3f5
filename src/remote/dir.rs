//! Directory-backed remote mirror
//!
//! Mirrors snapshots into a second directory tree, typically a mounted
//! bucket or network share. Keys map directly onto paths under the root.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;

use super::errors::{RemoteError, RemoteResult};
use super::RemoteStore;

/// Directory-backed `RemoteStore`.
#[derive(Debug, Clone)]
pub struct DirMirror {
    root: PathBuf,
}

impl DirMirror {
    /// Create a mirror rooted at `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn full_path(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }
}

#[async_trait]
impl RemoteStore for DirMirror {
    async fn put(&self, key: &str, path: &Path) -> RemoteResult<()> {
        let dest = self.full_path(key);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| RemoteError::Io(e.to_string()))?;
        }
        fs::copy(path, &dest)
            .await
            .map(|_| ())
            .map_err(|e| RemoteError::Io(e.to_string()))
    }

    async fn remove(&self, key: &str) -> RemoteResult<()> {
        let dest = self.full_path(key);
        fs::remove_file(&dest).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                RemoteError::NotFound(key.to_string())
            } else {
                RemoteError::Io(e.to_string())
            }
        })
    }

    async fn list(&self, prefix: &str) -> RemoteResult<Vec<String>> {
        let dir = self.full_path(prefix);
        let mut results = Vec::new();

        if !dir.is_dir() {
            return Ok(results);
        }

        let mut entries = fs::read_dir(&dir)
            .await
            .map_err(|e| RemoteError::Io(e.to_string()))?;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| RemoteError::Io(e.to_string()))?
        {
            if let Some(name) = entry.file_name().to_str() {
                results.push(format!("{}/{}", prefix, name));
            }
        }

        results.sort();
        Ok(results)
    }

    async fn exists(&self, key: &str) -> RemoteResult<bool> {
        Ok(self.full_path(key).exists())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn mirror_with_file(key: &str) -> (TempDir, DirMirror) {
        let temp = TempDir::new().unwrap();
        let mirror = DirMirror::new(temp.path().join("mirror"));

        let src = temp.path().join("src.sql.gz");
        std::fs::write(&src, b"compressed bytes").unwrap();
        mirror.put(key, &src).await.unwrap();

        (temp, mirror)
    }

    #[tokio::test]
    async fn test_put_and_exists() {
        let (_temp, mirror) = mirror_with_file("tenant_5/tenant_5_20260101.sql.gz").await;
        assert!(mirror
            .exists("tenant_5/tenant_5_20260101.sql.gz")
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_list_by_prefix() {
        let (_temp, mirror) = mirror_with_file("tenant_5/tenant_5_20260101.sql.gz").await;

        let keys = mirror.list("tenant_5").await.unwrap();
        assert_eq!(keys, vec!["tenant_5/tenant_5_20260101.sql.gz"]);

        // Other tenants see nothing
        assert!(mirror.list("tenant_6").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_remove() {
        let (_temp, mirror) = mirror_with_file("tenant_5/a.sql.gz").await;

        mirror.remove("tenant_5/a.sql.gz").await.unwrap();
        assert!(!mirror.exists("tenant_5/a.sql.gz").await.unwrap());

        let err = mirror.remove("tenant_5/a.sql.gz").await.unwrap_err();
        assert!(matches!(err, RemoteError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_put_replaces_existing() {
        let temp = TempDir::new().unwrap();
        let mirror = DirMirror::new(temp.path().join("mirror"));

        let src = temp.path().join("src");
        std::fs::write(&src, b"v1").unwrap();
        mirror.put("k", &src).await.unwrap();
        std::fs::write(&src, b"v2").unwrap();
        mirror.put("k", &src).await.unwrap();

        let data = std::fs::read(temp.path().join("mirror/k")).unwrap();
        assert_eq!(data, b"v2");
    }
}
