//! Object storage abstraction for dataset files.
//!
//! The record of truth for datasets lives in the database; the blob store
//! only holds file bytes plus per-object metadata (content type, custom
//! key/value tags, size, creation timestamp) and can mint time-limited
//! signed read URLs. Backends:
//! - [`LocalBlobStore`]: filesystem objects with JSON sidecar metadata.
//! - [`MemoryBlobStore`]: in-process map, used by tests.

pub mod local;
pub mod memory;

pub use local::LocalBlobStore;
pub use memory::MemoryBlobStore;

use std::collections::HashMap;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};

/// Metadata about a stored object.
#[derive(Debug, Clone)]
pub struct ObjectInfo {
    /// Object path (key), e.g. `datasets/user_1/iris.csv`.
    pub path: String,
    /// Object size in bytes.
    pub size: u64,
    /// MIME type recorded at upload.
    pub content_type: String,
    /// Custom key/value tags (display name, description, uploader).
    pub metadata: HashMap<String, String>,
    /// Upload timestamp.
    pub created_at: DateTime<Utc>,
}

/// Storage backend contract.
///
/// Paths are plain `/`-separated keys; backends must not interpret them
/// beyond prefix grouping. All operations are idempotent where noted.
#[async_trait]
pub trait BlobStore: Send + Sync + 'static {
    /// Writes an object, replacing any existing one at `path`.
    async fn put(
        &self,
        path: &str,
        data: Bytes,
        content_type: &str,
        metadata: HashMap<String, String>,
    ) -> Result<()>;

    /// Reads entire object. Returns `None` if absent.
    async fn get(&self, path: &str) -> Result<Option<Bytes>>;

    /// Reads object metadata without the content. Returns `None` if absent.
    async fn head(&self, path: &str) -> Result<Option<ObjectInfo>>;

    /// Deletes an object. Returns `false` if it was already absent.
    async fn delete(&self, path: &str) -> Result<bool>;

    /// Mints a read URL valid for `expiry`.
    async fn signed_url(&self, path: &str, expiry: Duration) -> Result<String>;
}
