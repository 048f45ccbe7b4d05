use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs;

use super::{BlobStore, ObjectInfo};

/// Filesystem-backed blob store.
///
/// Objects live under `root` at their key path; metadata lives next to each
/// object in a `<key>.meta.json` sidecar. Signed URLs are `file://` URLs
/// carrying an expiry timestamp; a cloud backend would mint real ones.
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    root: PathBuf,
}

#[derive(Debug, Serialize, Deserialize)]
struct Sidecar {
    content_type: String,
    metadata: HashMap<String, String>,
    size: u64,
    created_at: DateTime<Utc>,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn object_path(&self, path: &str) -> PathBuf {
        self.root.join(path)
    }

    fn sidecar_path(&self, path: &str) -> PathBuf {
        self.root.join(format!("{}.meta.json", path))
    }
}

async fn read_optional(path: &Path) -> Result<Option<Vec<u8>>> {
    match fs::read(path).await {
        Ok(data) => Ok(Some(data)),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err).with_context(|| format!("failed to read {}", path.display())),
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn put(
        &self,
        path: &str,
        data: Bytes,
        content_type: &str,
        metadata: HashMap<String, String>,
    ) -> Result<()> {
        let object = self.object_path(path);
        if let Some(parent) = object.parent() {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }

        let sidecar = Sidecar {
            content_type: content_type.to_string(),
            metadata,
            size: data.len() as u64,
            created_at: Utc::now(),
        };

        fs::write(&object, &data)
            .await
            .with_context(|| format!("failed to write {}", object.display()))?;
        fs::write(self.sidecar_path(path), serde_json::to_vec_pretty(&sidecar)?)
            .await
            .context("failed to write object metadata")?;

        Ok(())
    }

    async fn get(&self, path: &str) -> Result<Option<Bytes>> {
        Ok(read_optional(&self.object_path(path)).await?.map(Bytes::from))
    }

    async fn head(&self, path: &str) -> Result<Option<ObjectInfo>> {
        let Some(raw) = read_optional(&self.sidecar_path(path)).await? else {
            return Ok(None);
        };

        let sidecar: Sidecar =
            serde_json::from_slice(&raw).context("corrupt object metadata sidecar")?;

        Ok(Some(ObjectInfo {
            path: path.to_string(),
            size: sidecar.size,
            content_type: sidecar.content_type,
            metadata: sidecar.metadata,
            created_at: sidecar.created_at,
        }))
    }

    async fn delete(&self, path: &str) -> Result<bool> {
        match fs::remove_file(self.object_path(path)).await {
            Ok(()) => {
                // The sidecar may already be gone; that is fine.
                let _ = fs::remove_file(self.sidecar_path(path)).await;
                Ok(true)
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err).with_context(|| format!("failed to delete {}", path)),
        }
    }

    async fn signed_url(&self, path: &str, expiry: Duration) -> Result<String> {
        let expires = chrono::Duration::from_std(expiry)
            .ok()
            .and_then(|delta| Utc::now().checked_add_signed(delta))
            .map(|at| at.timestamp())
            .unwrap_or(i64::MAX);
        Ok(format!(
            "file://{}?expires={}",
            self.object_path(path).display(),
            expires
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn objects_survive_with_sidecar_metadata() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let store = LocalBlobStore::new(dir.path());

        let mut metadata = HashMap::new();
        metadata.insert("uploadedBy".to_string(), "user_1".to_string());

        store
            .put(
                "datasets/user_1/iris.csv",
                Bytes::from_static(b"a,b\n"),
                "text/csv",
                metadata,
            )
            .await?;

        let info = store
            .head("datasets/user_1/iris.csv")
            .await?
            .expect("object should exist");
        assert_eq!(info.size, 4);
        assert_eq!(info.content_type, "text/csv");
        assert_eq!(
            info.metadata.get("uploadedBy").map(String::as_str),
            Some("user_1")
        );

        let data = store.get("datasets/user_1/iris.csv").await?;
        assert_eq!(data.as_deref(), Some(b"a,b\n".as_ref()));

        Ok(())
    }

    #[tokio::test]
    async fn delete_is_idempotent() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let store = LocalBlobStore::new(dir.path());

        store
            .put("datasets/u/x.csv", Bytes::from_static(b"x"), "text/csv", HashMap::new())
            .await?;

        assert!(store.delete("datasets/u/x.csv").await?);
        assert!(!store.delete("datasets/u/x.csv").await?);
        assert!(store.head("datasets/u/x.csv").await?.is_none());

        Ok(())
    }
}
