use std::sync::Arc;

use anyhow::Result;
use axum::extract::DefaultBodyLimit;
use axum::routing::{delete, get, post, put};
use axum::Router;
use sea_orm::DatabaseConnection;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};

use super::handlers::{datasets, health, projects, user_deletion};
use crate::auth::IdentityProvider;
use crate::storage::BlobStore;

// Above the 50MB file cap to leave room for multipart framing and the other
// form fields. The upload handler counts file bytes as it reads and rejects
// past the cap, so this transport limit never decides the error for an
// oversized file.
const MAX_UPLOAD_BODY_BYTES: usize = 64 * 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub blobs: Arc<dyn BlobStore>,
    pub identity: Arc<dyn IdentityProvider>,
}

pub async fn create_app(
    db: DatabaseConnection,
    blobs: Arc<dyn BlobStore>,
    identity: Arc<dyn IdentityProvider>,
    cors_origin: Option<&str>,
) -> Result<Router> {
    let state = AppState {
        db,
        blobs,
        identity,
    };

    let cors = match cors_origin {
        Some(origin) => CorsLayer::new()
            .allow_origin(origin.parse::<axum::http::HeaderValue>()?)
            .allow_methods(Any)
            .allow_headers(Any),
        None => CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
    };

    let app = Router::new()
        // Health check endpoint
        .route("/health", get(health::health_check))
        // API v1 routes
        .nest("/api/v1", api_v1_routes())
        // Add middleware
        .layer(ServiceBuilder::new().layer(cors))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BODY_BYTES))
        .with_state(state);

    Ok(app)
}

fn api_v1_routes() -> Router<AppState> {
    Router::new()
        // Dataset routes
        .route("/datasets", get(datasets::list_datasets))
        .route("/datasets", post(datasets::create_dataset))
        .route("/datasets/:id", get(datasets::get_dataset))
        .route("/datasets/:id", put(datasets::update_dataset))
        .route("/datasets/:id", delete(datasets::delete_dataset))
        .route("/datasets/:id/download", get(datasets::download_dataset))
        // Project routes
        .route("/projects", get(projects::list_projects))
        .route("/projects", post(projects::create_project))
        .route("/projects/:id", get(projects::get_project))
        .route("/projects/:id", put(projects::update_project))
        .route("/projects/:id", delete(projects::delete_project))
        // Account lifecycle
        .route("/user-deletion", post(user_deletion::request_account_deletion))
}
