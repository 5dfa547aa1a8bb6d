use axum::extract::State;
use axum::{Extension, Json};
use serde::Deserialize;

use crate::error::ApiError;
use crate::handlers::public::auth::{issue_code, MessageResponse};
use crate::middleware::auth::AuthUser;
use crate::middleware::response::{ApiResponse, ApiResult};
use crate::models::{CodeKind, NewNotification, NotificationKind, TwoFactorMethod, User, UserPatch};
use crate::state::AppState;
use crate::twofactor::{self, TotpSetup};

async fn current_user(state: &AppState, auth: &AuthUser) -> Result<User, ApiError> {
    state
        .storage
        .user(auth.user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))
}

/// POST /api/auth/2fa/setup/totp - generate a secret and QR code. The
/// method stays pending until verify-setup succeeds.
pub async fn setup_totp(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> ApiResult<TotpSetup> {
    let user = current_user(&state, &auth).await?;

    let setup = twofactor::totp_setup(&user.email)?;

    state
        .storage
        .update_user(
            user.id,
            UserPatch {
                two_factor_secret: Some(Some(setup.secret.clone())),
                two_factor_method: Some(Some(TwoFactorMethod::Totp)),
                backup_codes: Some(Some(setup.backup_codes.clone())),
                ..Default::default()
            },
        )
        .await?;

    Ok(ApiResponse::success(setup))
}

/// POST /api/auth/2fa/setup/email - send a test code to prove the inbox
/// works before enabling email 2FA
pub async fn setup_email(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> ApiResult<MessageResponse> {
    let user = current_user(&state, &auth).await?;

    let code = issue_code(&state, user.id, CodeKind::TwoFactor).await?;
    state
        .mailer
        .send_code(&user.email, &code, CodeKind::TwoFactor)
        .await?;

    Ok(ApiResponse::success(MessageResponse {
        message: "Test code sent to your email. Please verify to enable email 2FA.".to_string(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct VerifySetupRequest {
    pub code: String,
    pub method: TwoFactorMethod,
}

/// POST /api/auth/2fa/verify-setup - prove possession of the factor, then
/// enable it
pub async fn verify_setup(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(payload): Json<VerifySetupRequest>,
) -> ApiResult<MessageResponse> {
    let user = current_user(&state, &auth).await?;

    let valid = match payload.method {
        TwoFactorMethod::Totp => {
            let secret = user
                .two_factor_secret
                .as_deref()
                .ok_or_else(|| ApiError::bad_request("TOTP not set up"))?;
            twofactor::verify_totp(secret, &payload.code)?
        }
        TwoFactorMethod::Email => {
            match state
                .storage
                .valid_code(user.id, CodeKind::TwoFactor, &payload.code)
                .await?
            {
                Some(code) => {
                    state.storage.mark_code_used(code.id).await?;
                    true
                }
                None => false,
            }
        }
    };

    if !valid {
        return Err(ApiError::bad_request("Invalid verification code"));
    }

    state
        .storage
        .update_user(
            user.id,
            UserPatch {
                two_factor_enabled: Some(true),
                two_factor_method: Some(Some(payload.method)),
                ..Default::default()
            },
        )
        .await?;

    if let Err(e) = state
        .storage
        .create_notification(NewNotification {
            user_id: user.id,
            title: "Two-factor authentication enabled".to_string(),
            message: "Your account now requires a second factor at login.".to_string(),
            kind: NotificationKind::Success,
        })
        .await
    {
        tracing::warn!("Failed to create 2FA notification: {}", e);
    }

    Ok(ApiResponse::success(MessageResponse {
        message: "2FA enabled successfully".to_string(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct DisableRequest {
    pub password: String,
}

/// POST /api/auth/2fa/disable - password-gated; clears the stored secret
pub async fn disable(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(payload): Json<DisableRequest>,
) -> ApiResult<MessageResponse> {
    let user = current_user(&state, &auth).await?;

    if !bcrypt::verify(&payload.password, &user.password_hash)? {
        return Err(ApiError::unauthorized("Invalid password"));
    }

    state
        .storage
        .update_user(
            user.id,
            UserPatch {
                two_factor_enabled: Some(false),
                two_factor_method: Some(None),
                two_factor_secret: Some(None),
                backup_codes: Some(None),
                ..Default::default()
            },
        )
        .await?;

    Ok(ApiResponse::success(MessageResponse {
        message: "2FA disabled successfully".to_string(),
    }))
}
