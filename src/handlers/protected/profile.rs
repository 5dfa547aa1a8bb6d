use axum::extract::State;
use axum::{Extension, Json};
use serde::Deserialize;

use crate::error::ApiError;
use crate::middleware::auth::AuthUser;
use crate::middleware::response::{ApiResponse, ApiResult};
use crate::models::{PublicUser, UserPatch};
use crate::state::AppState;

/// GET /api/user/profile - the authenticated user's own profile
pub async fn get_profile(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> ApiResult<PublicUser> {
    let user = state
        .storage
        .user(auth.user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    Ok(ApiResponse::success(PublicUser::from(&user)))
}

#[derive(Debug, Deserialize)]
pub struct ProfileUpdateRequest {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub profile_image_url: Option<String>,
}

/// PATCH /api/user/profile - update contact details
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(payload): Json<ProfileUpdateRequest>,
) -> ApiResult<PublicUser> {
    if let Some(name) = &payload.name {
        if name.trim().is_empty() {
            return Err(ApiError::bad_request("Name cannot be empty"));
        }
    }

    let user = state
        .storage
        .update_user(
            auth.user_id,
            UserPatch {
                name: payload.name,
                phone: payload.phone,
                location: payload.location,
                profile_image_url: payload.profile_image_url,
                ..Default::default()
            },
        )
        .await?;

    Ok(ApiResponse::success(PublicUser::from(&user)))
}
