use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};

use super::{BlobStore, ObjectInfo};

/// In-memory blob store for testing.
///
/// Thread-safe via `RwLock`. Not suitable for production.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    objects: Arc<RwLock<HashMap<String, StoredObject>>>,
}

#[derive(Debug, Clone)]
struct StoredObject {
    data: Bytes,
    content_type: String,
    metadata: HashMap<String, String>,
    created_at: DateTime<Utc>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(
        &self,
        path: &str,
        data: Bytes,
        content_type: &str,
        metadata: HashMap<String, String>,
    ) -> Result<()> {
        let mut objects = self
            .objects
            .write()
            .map_err(|_| anyhow!("blob store lock poisoned"))?;

        objects.insert(
            path.to_string(),
            StoredObject {
                data,
                content_type: content_type.to_string(),
                metadata,
                created_at: Utc::now(),
            },
        );
        Ok(())
    }

    async fn get(&self, path: &str) -> Result<Option<Bytes>> {
        let objects = self
            .objects
            .read()
            .map_err(|_| anyhow!("blob store lock poisoned"))?;

        Ok(objects.get(path).map(|object| object.data.clone()))
    }

    async fn head(&self, path: &str) -> Result<Option<ObjectInfo>> {
        let objects = self
            .objects
            .read()
            .map_err(|_| anyhow!("blob store lock poisoned"))?;

        Ok(objects.get(path).map(|object| ObjectInfo {
            path: path.to_string(),
            size: object.data.len() as u64,
            content_type: object.content_type.clone(),
            metadata: object.metadata.clone(),
            created_at: object.created_at,
        }))
    }

    async fn delete(&self, path: &str) -> Result<bool> {
        let mut objects = self
            .objects
            .write()
            .map_err(|_| anyhow!("blob store lock poisoned"))?;

        Ok(objects.remove(path).is_some())
    }

    async fn signed_url(&self, path: &str, expiry: Duration) -> Result<String> {
        let expires = chrono::Duration::from_std(expiry)
            .ok()
            .and_then(|delta| Utc::now().checked_add_signed(delta))
            .map(|at| at.timestamp())
            .unwrap_or(i64::MAX);
        Ok(format!("memory://{}?expires={}", path, expires))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_get_head_delete_roundtrip() -> Result<()> {
        let store = MemoryBlobStore::new();
        let mut metadata = HashMap::new();
        metadata.insert("name".to_string(), "iris".to_string());

        store
            .put(
                "datasets/user_1/iris.csv",
                Bytes::from_static(b"a,b\n1,2\n"),
                "text/csv",
                metadata,
            )
            .await?;

        let data = store.get("datasets/user_1/iris.csv").await?;
        assert_eq!(data.as_deref(), Some(b"a,b\n1,2\n".as_ref()));

        let info = store
            .head("datasets/user_1/iris.csv")
            .await?
            .expect("object should exist");
        assert_eq!(info.size, 8);
        assert_eq!(info.content_type, "text/csv");
        assert_eq!(info.metadata.get("name").map(String::as_str), Some("iris"));

        assert!(store.delete("datasets/user_1/iris.csv").await?);
        assert!(!store.delete("datasets/user_1/iris.csv").await?);
        assert!(store.get("datasets/user_1/iris.csv").await?.is_none());

        Ok(())
    }

    #[tokio::test]
    async fn signed_url_embeds_the_path() -> Result<()> {
        let store = MemoryBlobStore::new();
        let url = store
            .signed_url("datasets/user_1/iris.csv", Duration::from_secs(3600))
            .await?;
        assert!(url.starts_with("memory://datasets/user_1/iris.csv?expires="));
        Ok(())
    }
}
