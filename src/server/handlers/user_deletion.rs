use axum::extract::State;
use axum::response::Json;
use serde_json::{json, Value};

use crate::auth::AuthUser;
use crate::errors::ApiError;
use crate::server::app::AppState;
use crate::services::AccountDeletionService;

/// Self-service account deletion. Acknowledges immediately; the purge runs
/// after the grace period via the background loop.
pub async fn request_account_deletion(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Value>, ApiError> {
    let message = AccountDeletionService::new(state.db.clone(), state.blobs.clone())
        .mark_for_deletion(user.id())
        .await?;

    Ok(Json(json!({ "message": message })))
}
