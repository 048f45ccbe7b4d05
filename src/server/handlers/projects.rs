use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::auth::AuthUser;
use crate::database::entities::projects;
use crate::errors::ApiError;
use crate::server::app::AppState;
use crate::services::{ProjectInput, ProjectService};

#[derive(Serialize, Deserialize)]
pub struct ProjectRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
}

impl ProjectRequest {
    fn into_input(self) -> Result<ProjectInput, ApiError> {
        let (Some(name), Some(description), Some(url)) = (
            self.name.filter(|value| !value.is_empty()),
            self.description.filter(|value| !value.is_empty()),
            self.url.filter(|value| !value.is_empty()),
        ) else {
            return Err(ApiError::validation("Missing required fields"));
        };

        Ok(ProjectInput {
            name,
            description,
            url,
        })
    }
}

pub async fn list_projects(
    State(state): State<AppState>,
) -> Result<Json<Vec<projects::Model>>, ApiError> {
    let projects = ProjectService::new(state.db.clone()).list().await?;
    Ok(Json(projects))
}

pub async fn create_project(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<ProjectRequest>,
) -> Result<(StatusCode, Json<projects::Model>), ApiError> {
    let input = payload.into_input()?;
    let project = ProjectService::new(state.db.clone())
        .create(user.id(), input)
        .await?;

    Ok((StatusCode::CREATED, Json(project)))
}

pub async fn get_project(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<projects::Model>, ApiError> {
    let project = ProjectService::new(state.db.clone()).get(id).await?;
    Ok(Json(project))
}

pub async fn update_project(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
    Json(payload): Json<ProjectRequest>,
) -> Result<Json<projects::Model>, ApiError> {
    let input = payload.into_input()?;
    let project = ProjectService::new(state.db.clone())
        .update(id, user.id(), input)
        .await?;

    Ok(Json(project))
}

pub async fn delete_project(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> Result<Json<Value>, ApiError> {
    ProjectService::new(state.db.clone())
        .delete(id, user.id())
        .await?;

    Ok(Json(json!({ "message": "Project deleted successfully" })))
}
