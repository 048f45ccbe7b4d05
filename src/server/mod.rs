pub mod app;
pub mod handlers;

use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use crate::auth::StaticTokenProvider;
use crate::database::connection::{establish_connection, get_database_url, setup_database};
use crate::services::{spawn_purge_loop, AccountDeletionService, PURGE_POLL_INTERVAL};
use crate::storage::{BlobStore, LocalBlobStore};

pub async fn start_server(
    port: u16,
    database_path: &str,
    blob_root: &str,
    cors_origin: Option<&str>,
) -> Result<()> {
    let database_url = get_database_url(Some(database_path));
    let db = establish_connection(&database_url).await?;

    // Run migrations
    setup_database(&db).await?;
    info!("Database migrations completed");

    let blobs: Arc<dyn BlobStore> = Arc::new(LocalBlobStore::new(blob_root));
    let identity = Arc::new(StaticTokenProvider::from_env());

    // Pending account deletions are persisted, so the loop picks up
    // anything that came due while the process was down.
    let _purge_loop = spawn_purge_loop(
        AccountDeletionService::new(db.clone(), blobs.clone()),
        PURGE_POLL_INTERVAL,
    );

    let app = app::create_app(db, blobs, identity, cors_origin).await?;

    log_routes();

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;
    info!("Server running on http://0.0.0.0:{}", port);

    axum::serve(listener, app).await?;

    Ok(())
}

fn log_routes() {
    info!("API Endpoints:");
    info!("  /health                          - Health check");
    info!("  /api/v1/datasets                 - Dataset CRUD (multipart upload)");
    info!("  /api/v1/datasets/:id/download    - Dataset file download");
    info!("  /api/v1/projects                 - Project link CRUD");
    info!("  /api/v1/user-deletion            - Deferred account deletion");
}
