use axum::extract::{Path, State};
use axum::{Extension, Json};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;
use crate::middleware::auth::AuthUser;
use crate::middleware::response::{ApiResponse, ApiResult};
use crate::models::{
    ChatLanguage, ChatMessage, ChatSession, ChatSessionPatch, NewChatSession, SessionStatus,
};
use crate::state::AppState;

const DEFAULT_TITLE: &str = "New Chat Session";

#[derive(Debug, Deserialize)]
pub struct CreateSessionRequest {
    pub title: Option<String>,
    pub language: Option<ChatLanguage>,
}

/// POST /api/chat/sessions
pub async fn create_session(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(payload): Json<CreateSessionRequest>,
) -> ApiResult<ChatSession> {
    let session = state
        .storage
        .create_session(NewChatSession {
            user_id: auth.user_id,
            title: payload
                .title
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_TITLE.to_string()),
            language: payload.language.unwrap_or(ChatLanguage::En),
        })
        .await?;

    Ok(ApiResponse::created(session))
}

/// GET /api/chat/sessions - own sessions, most recently active first
pub async fn list_sessions(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> ApiResult<Vec<ChatSession>> {
    let sessions = state.storage.sessions_for_user(auth.user_id).await?;
    Ok(ApiResponse::success(sessions))
}

#[derive(Debug, Deserialize)]
pub struct UpdateSessionRequest {
    pub title: Option<String>,
    pub status: Option<SessionStatus>,
    pub language: Option<ChatLanguage>,
}

/// PATCH /api/chat/sessions/:id - rename, archive or switch language
pub async fn update_session(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateSessionRequest>,
) -> ApiResult<ChatSession> {
    owned_session(&state, &auth, id).await?;

    let session = state
        .storage
        .update_session(
            id,
            ChatSessionPatch {
                title: payload.title,
                status: payload.status,
                language: payload.language,
            },
        )
        .await?;

    Ok(ApiResponse::success(session))
}

/// GET /api/chat/sessions/:id/messages - transcript, oldest first
pub async fn session_messages(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Vec<ChatMessage>> {
    owned_session(&state, &auth, id).await?;

    let messages = state.storage.messages_for_session(id).await?;
    Ok(ApiResponse::success(messages))
}

async fn owned_session(state: &AppState, auth: &AuthUser, id: Uuid) -> Result<(), ApiError> {
    match state.storage.session(id).await? {
        Some(session) if session.user_id == auth.user_id => Ok(()),
        Some(_) => Err(ApiError::forbidden("Access denied")),
        None => Err(ApiError::not_found("Chat session not found")),
    }
}
