use axum::body::Body;
use axum::extract::multipart::MultipartError;
use axum::extract::{Multipart, Path, State};
use axum::http::{header, StatusCode};
use axum::response::{Json, Response};
use bytes::BytesMut;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::auth::AuthUser;
use crate::database::entities::datasets;
use crate::errors::ApiError;
use crate::server::app::AppState;
use crate::services::{DatasetInput, DatasetService, NewDataset, MAX_FILE_SIZE_BYTES};

#[derive(Serialize, Deserialize)]
pub struct UpdateDatasetRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
}

fn service(state: &AppState) -> DatasetService {
    DatasetService::new(state.db.clone(), state.blobs.clone())
}

/// When the transport body limit trips mid-read, axum reports it as a 413;
/// surface that as the file-size reason rather than a generic parse failure.
fn multipart_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::validation("File size exceeds 50MB limit")
    } else {
        ApiError::validation("Invalid multipart form data")
    }
}

pub async fn list_datasets(
    State(state): State<AppState>,
) -> Result<Json<Vec<datasets::Model>>, ApiError> {
    let datasets = service(&state).list().await?;
    Ok(Json(datasets))
}

pub async fn create_dataset(
    State(state): State<AppState>,
    user: AuthUser,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<datasets::Model>), ApiError> {
    let mut name = None;
    let mut description = None;
    let mut file = None;

    while let Some(mut field) = multipart.next_field().await.map_err(multipart_error)? {
        match field.name() {
            Some("name") => {
                name = Some(field.text().await.map_err(multipart_error)?);
            }
            Some("description") => {
                description = Some(field.text().await.map_err(multipart_error)?);
            }
            Some("file") => {
                let file_name = field.file_name().map(ToString::to_string);
                let content_type = field.content_type().map(ToString::to_string);
                // Count file bytes as they arrive so an over-cap upload fails
                // with the size reason without buffering the whole field.
                let mut data = BytesMut::new();
                while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
                    if data.len() + chunk.len() > MAX_FILE_SIZE_BYTES {
                        return Err(ApiError::validation("File size exceeds 50MB limit"));
                    }
                    data.extend_from_slice(&chunk);
                }
                file = Some((file_name, content_type, data.freeze()));
            }
            _ => {}
        }
    }

    let (Some(name), Some(description), Some((file_name, content_type, data))) =
        (name, description, file)
    else {
        return Err(ApiError::validation("Missing required fields"));
    };

    let Some(file_name) = file_name.filter(|value| !value.is_empty()) else {
        return Err(ApiError::validation("Missing required fields"));
    };

    if name.is_empty() || description.is_empty() {
        return Err(ApiError::validation("Missing required fields"));
    }

    let input = NewDataset {
        name,
        description,
        file_name,
        content_type: content_type.unwrap_or_else(|| "application/octet-stream".to_string()),
        data,
    };

    let dataset = service(&state).create(user.id(), input).await?;
    Ok((StatusCode::CREATED, Json(dataset)))
}

pub async fn get_dataset(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<datasets::Model>, ApiError> {
    let dataset = service(&state).get(id).await?;
    Ok(Json(dataset))
}

pub async fn update_dataset(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateDatasetRequest>,
) -> Result<Json<datasets::Model>, ApiError> {
    let (Some(name), Some(description), Some(url)) = (
        payload.name.filter(|value| !value.is_empty()),
        payload.description.filter(|value| !value.is_empty()),
        payload.url.filter(|value| !value.is_empty()),
    ) else {
        return Err(ApiError::validation("Missing required fields"));
    };

    let dataset = service(&state)
        .update(
            id,
            user.id(),
            DatasetInput {
                name,
                description,
                url,
            },
        )
        .await?;

    Ok(Json(dataset))
}

pub async fn delete_dataset(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> Result<Json<Value>, ApiError> {
    service(&state).delete(id, user.id()).await?;
    Ok(Json(json!({ "message": "Dataset deleted successfully" })))
}

pub async fn download_dataset(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> Result<Response, ApiError> {
    let download = service(&state).download(id, user.id()).await?;

    Response::builder()
        .header(header::CONTENT_TYPE, download.content_type)
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", download.file_name),
        )
        .body(Body::from(download.data))
        .map_err(|err| ApiError::internal("Failed to download dataset", err))
}
