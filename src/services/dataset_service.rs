use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    Set,
};
use tracing::warn;

use crate::database::entities::{datasets, datasets::Entity as Datasets};
use crate::errors::ApiError;
use crate::storage::BlobStore;

/// Each user may publish at most this many datasets.
pub const MAX_DATASETS_PER_OWNER: u64 = 3;

/// Upload size cap, checked against the decoded file bytes.
pub const MAX_FILE_SIZE_BYTES: usize = 50 * 1024 * 1024;

// Effectively permanent, mirroring the dashboard's year-2500 expiry.
const SIGNED_URL_TTL: Duration = Duration::from_secs(60 * 60 * 24 * 365 * 475);

/// A validated upload, ready to persist.
pub struct NewDataset {
    pub name: String,
    pub description: String,
    pub file_name: String,
    pub content_type: String,
    pub data: Bytes,
}

pub struct DatasetInput {
    pub name: String,
    pub description: String,
    pub url: String,
}

/// Raw file content plus the headers a download response needs.
pub struct DatasetDownload {
    pub data: Bytes,
    pub content_type: String,
    pub file_name: String,
}

pub struct DatasetService {
    db: DatabaseConnection,
    blobs: Arc<dyn BlobStore>,
}

impl DatasetService {
    pub fn new(db: DatabaseConnection, blobs: Arc<dyn BlobStore>) -> Self {
        Self { db, blobs }
    }

    /// All datasets, system-wide; the dashboard browse view is shared.
    pub async fn list(&self) -> Result<Vec<datasets::Model>, ApiError> {
        Datasets::find()
            .all(&self.db)
            .await
            .map_err(|err| ApiError::internal("Failed to fetch datasets", err))
    }

    pub async fn get(&self, id: i32) -> Result<datasets::Model, ApiError> {
        Datasets::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(|err| ApiError::internal("Failed to fetch dataset", err))?
            .ok_or_else(|| ApiError::not_found("Dataset not found"))
    }

    pub async fn create(
        &self,
        owner_id: &str,
        input: NewDataset,
    ) -> Result<datasets::Model, ApiError> {
        if input.data.len() > MAX_FILE_SIZE_BYTES {
            return Err(ApiError::validation("File size exceeds 50MB limit"));
        }

        // Browsers send bare file names, but multipart file names may carry
        // path components; keep only the final segment.
        let file_name = input
            .file_name
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(&input.file_name)
            .to_string();

        if !file_name.ends_with(".csv") {
            return Err(ApiError::validation("Only CSV files are allowed"));
        }

        let existing = Datasets::find()
            .filter(datasets::Column::Name.eq(&input.name))
            .one(&self.db)
            .await
            .map_err(|err| ApiError::internal("Failed to create dataset", err))?;
        if existing.is_some() {
            return Err(ApiError::conflict(
                "A dataset with this name already exists",
            ));
        }

        let owned = Datasets::find()
            .filter(datasets::Column::OwnerId.eq(owner_id))
            .count(&self.db)
            .await
            .map_err(|err| ApiError::internal("Failed to create dataset", err))?;
        if owned >= MAX_DATASETS_PER_OWNER {
            return Err(ApiError::conflict("Maximum number of datasets reached"));
        }

        let storage_key = format!("datasets/{}/{}", owner_id, file_name);
        let file_size = input.data.len() as i64;

        let mut metadata = HashMap::new();
        metadata.insert("name".to_string(), input.name.clone());
        metadata.insert("description".to_string(), input.description.clone());
        metadata.insert("uploadedBy".to_string(), owner_id.to_string());

        self.blobs
            .put(&storage_key, input.data, &input.content_type, metadata)
            .await
            .map_err(|err| ApiError::internal("Failed to create dataset", err))?;

        let url = self
            .blobs
            .signed_url(&storage_key, SIGNED_URL_TTL)
            .await
            .map_err(|err| ApiError::internal("Failed to create dataset", err))?;

        let now = Utc::now();
        let dataset = datasets::ActiveModel {
            name: Set(input.name),
            description: Set(input.description),
            file_name: Set(file_name),
            storage_key: Set(storage_key),
            url: Set(url),
            content_type: Set(input.content_type),
            file_size: Set(file_size),
            owner_id: Set(owner_id.to_string()),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        dataset
            .insert(&self.db)
            .await
            .map_err(|err| ApiError::internal("Failed to create dataset", err))
    }

    /// Ownership is enforced in the update filter itself, never as a
    /// post-fetch check, so a non-owner can't learn whether the id exists.
    pub async fn update(
        &self,
        id: i32,
        owner_id: &str,
        input: DatasetInput,
    ) -> Result<datasets::Model, ApiError> {
        let result = Datasets::update_many()
            .col_expr(datasets::Column::Name, Expr::value(input.name))
            .col_expr(datasets::Column::Description, Expr::value(input.description))
            .col_expr(datasets::Column::Url, Expr::value(input.url))
            .col_expr(datasets::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(datasets::Column::Id.eq(id))
            .filter(datasets::Column::OwnerId.eq(owner_id))
            .exec(&self.db)
            .await
            .map_err(|err| ApiError::internal("Failed to update dataset", err))?;

        if result.rows_affected == 0 {
            return Err(ApiError::not_found(
                "Dataset not found or you do not have permission to update it",
            ));
        }

        Datasets::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(|err| ApiError::internal("Failed to update dataset", err))?
            .ok_or_else(|| {
                ApiError::not_found("Dataset not found or you do not have permission to update it")
            })
    }

    /// Removes the row and, best-effort, the stored file. No soft delete.
    pub async fn delete(&self, id: i32, owner_id: &str) -> Result<(), ApiError> {
        let dataset = Datasets::find()
            .filter(datasets::Column::Id.eq(id))
            .filter(datasets::Column::OwnerId.eq(owner_id))
            .one(&self.db)
            .await
            .map_err(|err| ApiError::internal("Failed to delete dataset", err))?
            .ok_or_else(|| {
                ApiError::not_found("Dataset not found or you do not have permission to delete it")
            })?;

        if let Err(err) = self.blobs.delete(&dataset.storage_key).await {
            warn!(
                "Failed to delete blob {} for dataset {}: {:#}",
                dataset.storage_key, dataset.id, err
            );
        }

        Datasets::delete_many()
            .filter(datasets::Column::Id.eq(id))
            .filter(datasets::Column::OwnerId.eq(owner_id))
            .exec(&self.db)
            .await
            .map_err(|err| ApiError::internal("Failed to delete dataset", err))?;

        Ok(())
    }

    /// Streams back the stored file.
    ///
    /// The storage key must fall under the caller's own prefix; that check
    /// is defense in depth on top of the verified identity, and a mismatch
    /// is treated as unauthenticated rather than as proof the row exists.
    pub async fn download(&self, id: i32, owner_id: &str) -> Result<DatasetDownload, ApiError> {
        let dataset = self.get(id).await?;

        let owner_prefix = format!("datasets/{}/", owner_id);
        if !dataset.storage_key.starts_with(&owner_prefix) {
            return Err(ApiError::Unauthorized);
        }

        let info = self
            .blobs
            .head(&dataset.storage_key)
            .await
            .map_err(|err| ApiError::internal("Failed to download dataset", err))?
            .ok_or_else(|| ApiError::not_found("File not found"))?;

        let data = self
            .blobs
            .get(&dataset.storage_key)
            .await
            .map_err(|err| ApiError::internal("Failed to download dataset", err))?
            .ok_or_else(|| ApiError::not_found("File not found"))?;

        let file_name = info
            .metadata
            .get("name")
            .cloned()
            .or_else(|| {
                dataset
                    .storage_key
                    .rsplit('/')
                    .next()
                    .map(ToString::to_string)
            })
            .unwrap_or_else(|| "dataset".to_string());

        let content_type = if info.content_type.is_empty() {
            "application/octet-stream".to_string()
        } else {
            info.content_type
        };

        Ok(DatasetDownload {
            data,
            content_type,
            file_name,
        })
    }
}
