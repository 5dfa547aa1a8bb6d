use axum::extract::{Path, State};
use axum::Extension;
use uuid::Uuid;

use crate::error::ApiError;
use crate::handlers::public::auth::MessageResponse;
use crate::middleware::auth::AuthUser;
use crate::middleware::response::{ApiResponse, ApiResult};
use crate::models::Notification;
use crate::state::AppState;

/// GET /api/notifications - own notifications, newest first
pub async fn list(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> ApiResult<Vec<Notification>> {
    let notifications = state.storage.notifications_for_user(auth.user_id).await?;
    Ok(ApiResponse::success(notifications))
}

/// PATCH /api/notifications/:id/read
pub async fn mark_read(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<MessageResponse> {
    // Only the owner may ack a notification
    let owned = state
        .storage
        .notifications_for_user(auth.user_id)
        .await?
        .iter()
        .any(|n| n.id == id);
    if !owned {
        return Err(ApiError::not_found("Notification not found"));
    }

    state.storage.mark_notification_read(id).await?;
    Ok(ApiResponse::success(MessageResponse {
        message: "Notification marked as read".to_string(),
    }))
}
