use axum::extract::{Path, State};
use axum::{Extension, Json};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use crate::error::ApiError;
use crate::middleware::auth::AuthUser;
use crate::middleware::response::{ApiResponse, ApiResult};
use crate::models::{Lawyer, LawyerPatch, LawyerRating, NewLawyer, NewLawyerRating, UserPatch, UserRole};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateLawyerRequest {
    pub license_number: String,
    pub specialization: Vec<String>,
    pub experience_years: i32,
    pub location: String,
    pub languages: Vec<String>,
    pub hourly_rate: Option<Decimal>,
    pub bio: Option<String>,
    #[serde(default)]
    pub education: Vec<String>,
    #[serde(default)]
    pub certifications: Vec<String>,
    pub availability_schedule: Option<Value>,
}

/// POST /api/user/lawyer-profile - create the authenticated user's lawyer
/// profile
pub async fn create_profile(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(payload): Json<CreateLawyerRequest>,
) -> ApiResult<Lawyer> {
    if payload.license_number.trim().is_empty() {
        return Err(ApiError::bad_request("License number is required"));
    }
    if payload.experience_years < 0 {
        return Err(ApiError::bad_request("Experience years cannot be negative"));
    }

    let lawyer = state
        .storage
        .create_lawyer(NewLawyer {
            user_id: auth.user_id,
            license_number: payload.license_number,
            specialization: payload.specialization,
            experience_years: payload.experience_years,
            location: payload.location,
            languages: payload.languages,
            hourly_rate: payload.hourly_rate,
            bio: payload.bio,
            education: payload.education,
            certifications: payload.certifications,
            availability_schedule: payload.availability_schedule,
        })
        .await?;

    state
        .storage
        .update_user(
            auth.user_id,
            UserPatch {
                role: Some(UserRole::Lawyer),
                is_lawyer: Some(true),
                ..Default::default()
            },
        )
        .await?;

    tracing::info!(lawyer_id = %lawyer.id, user_id = %auth.user_id, "Lawyer profile created");
    Ok(ApiResponse::created(lawyer))
}

#[derive(Debug, Deserialize)]
pub struct RateLawyerRequest {
    pub rating: i32,
    pub review: Option<String>,
}

/// POST /api/lawyers/:id/rate - leave a 1-5 star review and refresh the
/// lawyer's aggregates
pub async fn rate(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(lawyer_id): Path<Uuid>,
    Json(payload): Json<RateLawyerRequest>,
) -> ApiResult<LawyerRating> {
    if !(1..=5).contains(&payload.rating) {
        return Err(ApiError::bad_request("Rating must be between 1 and 5"));
    }

    let lawyer = state
        .storage
        .lawyer(lawyer_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Lawyer not found"))?;

    if lawyer.lawyer.user_id == auth.user_id {
        return Err(ApiError::bad_request("You cannot rate your own profile"));
    }

    let rating = state
        .storage
        .create_rating(NewLawyerRating {
            lawyer_id,
            user_id: auth.user_id,
            rating: payload.rating,
            review: payload.review,
        })
        .await?;

    // Refresh the aggregate from the full rating list
    let ratings = state.storage.ratings_for_lawyer(lawyer_id).await?;
    let total = ratings.len() as i32;
    let sum: i32 = ratings.iter().map(|r| r.rating).sum();
    let average = (Decimal::from(sum) / Decimal::from(total)).round_dp(1);

    state
        .storage
        .update_lawyer(
            lawyer_id,
            LawyerPatch {
                rating: Some(average),
                total_ratings: Some(total),
                ..Default::default()
            },
        )
        .await?;

    Ok(ApiResponse::created(rating))
}
