//! Remote snapshot mirror for schemavault
//!
//! Snapshots are mirrored to a remote object store for durability. The local
//! file is always the source of truth; mirror failures are reported, logged,
//! and never fail the operation that triggered them.
//!
//! The object store itself is a collaborator behind the `RemoteStore` trait.
//! `DirMirror` is the bundled directory-backed implementation; deployments
//! with a real bucket plug in their own client behind the same trait.

mod dir;
mod errors;

pub use dir::DirMirror;
pub use errors::{RemoteError, RemoteResult};

use std::path::Path;

use async_trait::async_trait;

/// Remote object store boundary.
///
/// Keys are slash-separated, `tenant_<id>/<filename>`.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Upload a local file under `key`, replacing any existing object.
    async fn put(&self, key: &str, path: &Path) -> RemoteResult<()>;

    /// Remove the object at `key`. Removing a missing object is an error
    /// (`RemoteError::NotFound`) so callers can report it.
    async fn remove(&self, key: &str) -> RemoteResult<()>;

    /// List object keys under `prefix`.
    async fn list(&self, prefix: &str) -> RemoteResult<Vec<String>>;

    /// Whether an object exists at `key`.
    async fn exists(&self, key: &str) -> RemoteResult<bool>;
}
