use axum::extract::{Path, Query, State};
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;
use crate::middleware::response::{ApiResponse, ApiResult};
use crate::models::{LawyerRating, LawyerWithUser};
use crate::state::AppState;
use crate::storage::LawyerFilter;

#[derive(Debug, Deserialize)]
pub struct LawyerQuery {
    pub specialization: Option<String>,
    pub location: Option<String>,
    pub language: Option<String>,
    pub min_rating: Option<Decimal>,
}

/// GET /api/lawyers - directory listing with optional filters, best-rated
/// first
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<LawyerQuery>,
) -> ApiResult<Vec<LawyerWithUser>> {
    let filter = LawyerFilter {
        specialization: query.specialization,
        location: query.location,
        language: query.language,
        min_rating: query.min_rating,
    };
    let lawyers = state.storage.lawyers(&filter).await?;
    Ok(ApiResponse::success(lawyers))
}

/// GET /api/lawyers/:id - single profile joined with the public user record
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<LawyerWithUser> {
    let lawyer = state
        .storage
        .lawyer(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Lawyer not found"))?;
    Ok(ApiResponse::success(lawyer))
}

/// GET /api/lawyers/:id/ratings - reviews, newest first
pub async fn ratings(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Vec<LawyerRating>> {
    if state.storage.lawyer(id).await?.is_none() {
        return Err(ApiError::not_found("Lawyer not found"));
    }
    let ratings = state.storage.ratings_for_lawyer(id).await?;
    Ok(ApiResponse::success(ratings))
}
