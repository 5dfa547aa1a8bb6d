use std::collections::HashMap;

use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::{generate_jwt, Claims};
use crate::config;
use crate::error::ApiError;
use crate::middleware::response::{ApiResponse, ApiResult};
use crate::models::*;
use crate::state::AppState;
use crate::twofactor;

const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub phone: Option<String>,
    pub location: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub message: String,
    pub user_id: Uuid,
}

/// POST /api/auth/register - create an account and send the email
/// verification code
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> ApiResult<RegisterResponse> {
    validate_registration(&payload)?;

    if state
        .storage
        .user_by_email(&payload.email)
        .await?
        .is_some()
    {
        return Err(ApiError::bad_request("User already exists with this email"));
    }

    let password_hash = bcrypt::hash(&payload.password, config::config().security.bcrypt_cost)?;
    let user = state
        .storage
        .create_user(NewUser {
            name: payload.name,
            email: payload.email,
            password_hash,
            phone: payload.phone,
            location: payload.location,
        })
        .await?;

    let code = issue_code(&state, user.id, CodeKind::EmailVerification).await?;
    state
        .mailer
        .send_code(&user.email, &code, CodeKind::EmailVerification)
        .await?;

    // Best-effort; registration already succeeded
    if let Err(e) = state
        .storage
        .create_notification(NewNotification {
            user_id: user.id,
            title: "Welcome to LawHelp".to_string(),
            message: "Your account was created. Verify your email to start asking legal questions."
                .to_string(),
            kind: NotificationKind::Success,
        })
        .await
    {
        tracing::warn!("Failed to create welcome notification: {}", e);
    }

    tracing::info!(user_id = %user.id, "User registered");
    Ok(ApiResponse::created(RegisterResponse {
        message: "User registered successfully. Please check your email for verification code."
            .to_string(),
        user_id: user.id,
    }))
}

fn validate_registration(payload: &RegisterRequest) -> Result<(), ApiError> {
    let mut field_errors = HashMap::new();
    if payload.name.trim().is_empty() {
        field_errors.insert("name".to_string(), "This field is required".to_string());
    }
    if !payload.email.contains('@') {
        field_errors.insert("email".to_string(), "Must be a valid email address".to_string());
    }
    if payload.password.len() < MIN_PASSWORD_LEN {
        field_errors.insert(
            "password".to_string(),
            format!("Must be at least {} characters", MIN_PASSWORD_LEN),
        );
    }
    if field_errors.is_empty() {
        Ok(())
    } else {
        Err(ApiError::validation_error("Invalid user data", Some(field_errors)))
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum LoginResponse {
    Token {
        token: String,
        user: PublicUser,
    },
    TwoFactorChallenge {
        requires_two_factor: bool,
        user_id: Uuid,
        method: TwoFactorMethod,
        message: String,
    },
}

/// POST /api/auth/login - password login, possibly answered with a 2FA
/// challenge instead of a token
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> ApiResult<LoginResponse> {
    let user = state
        .storage
        .user_by_email(&payload.email)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Invalid email or password"))?;

    if !bcrypt::verify(&payload.password, &user.password_hash)? {
        return Err(ApiError::unauthorized("Invalid email or password"));
    }

    if !user.email_verified {
        return Err(ApiError::unauthorized(
            "Please verify your email before logging in",
        ));
    }

    if user.two_factor_enabled {
        let method = user.two_factor_method.unwrap_or(TwoFactorMethod::Email);
        if method == TwoFactorMethod::Email {
            let code = issue_code(&state, user.id, CodeKind::TwoFactor).await?;
            state
                .mailer
                .send_code(&user.email, &code, CodeKind::TwoFactor)
                .await?;
        }
        return Ok(ApiResponse::success(LoginResponse::TwoFactorChallenge {
            requires_two_factor: true,
            user_id: user.id,
            method,
            message: match method {
                TwoFactorMethod::Email => {
                    "Please enter the verification code sent to your email".to_string()
                }
                TwoFactorMethod::Totp => {
                    "Please enter the code from your authenticator app".to_string()
                }
            },
        }));
    }

    issue_session(&state, user).await
}

#[derive(Debug, Deserialize)]
pub struct VerifyEmailRequest {
    pub user_id: Uuid,
    pub code: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// POST /api/auth/verify-email - consume the emailed code and mark the
/// account verified
pub async fn verify_email(
    State(state): State<AppState>,
    Json(payload): Json<VerifyEmailRequest>,
) -> ApiResult<MessageResponse> {
    let code = state
        .storage
        .valid_code(payload.user_id, CodeKind::EmailVerification, &payload.code)
        .await?
        .ok_or_else(|| ApiError::bad_request("Invalid or expired verification code"))?;

    state
        .storage
        .update_user(
            payload.user_id,
            UserPatch {
                email_verified: Some(true),
                ..Default::default()
            },
        )
        .await?;
    state.storage.mark_code_used(code.id).await?;

    Ok(ApiResponse::success(MessageResponse {
        message: "Email verified successfully".to_string(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct VerifyTwoFactorRequest {
    pub user_id: Uuid,
    pub code: String,
    pub method: TwoFactorMethod,
}

/// POST /api/auth/verify-2fa - finish a challenged login with a TOTP or
/// emailed code
pub async fn verify_two_factor(
    State(state): State<AppState>,
    Json(payload): Json<VerifyTwoFactorRequest>,
) -> ApiResult<LoginResponse> {
    let user = state
        .storage
        .user(payload.user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

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

    issue_session(&state, user).await
}

#[derive(Debug, Deserialize)]
pub struct PasswordResetRequest {
    pub email: String,
}

/// POST /api/auth/password-reset/request - issue a reset code. Responds the
/// same whether or not the account exists.
pub async fn password_reset_request(
    State(state): State<AppState>,
    Json(payload): Json<PasswordResetRequest>,
) -> ApiResult<MessageResponse> {
    if let Some(user) = state.storage.user_by_email(&payload.email).await? {
        let code = issue_code(&state, user.id, CodeKind::PasswordReset).await?;
        if let Err(e) = state
            .mailer
            .send_code(&user.email, &code, CodeKind::PasswordReset)
            .await
        {
            tracing::error!("Failed to send password reset code: {}", e);
        }
    }

    Ok(ApiResponse::success(MessageResponse {
        message: "If that email is registered, a reset code has been sent".to_string(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct PasswordResetConfirm {
    pub email: String,
    pub code: String,
    pub new_password: String,
}

/// POST /api/auth/password-reset/confirm - consume the reset code and set
/// the new password
pub async fn password_reset_confirm(
    State(state): State<AppState>,
    Json(payload): Json<PasswordResetConfirm>,
) -> ApiResult<MessageResponse> {
    if payload.new_password.len() < MIN_PASSWORD_LEN {
        let mut field_errors = HashMap::new();
        field_errors.insert(
            "new_password".to_string(),
            format!("Must be at least {} characters", MIN_PASSWORD_LEN),
        );
        return Err(ApiError::validation_error("Invalid password", Some(field_errors)));
    }

    let user = state
        .storage
        .user_by_email(&payload.email)
        .await?
        .ok_or_else(|| ApiError::bad_request("Invalid or expired verification code"))?;

    let code = state
        .storage
        .valid_code(user.id, CodeKind::PasswordReset, &payload.code)
        .await?
        .ok_or_else(|| ApiError::bad_request("Invalid or expired verification code"))?;

    let password_hash = bcrypt::hash(&payload.new_password, config::config().security.bcrypt_cost)?;
    state
        .storage
        .update_user(
            user.id,
            UserPatch {
                password_hash: Some(password_hash),
                ..Default::default()
            },
        )
        .await?;
    state.storage.mark_code_used(code.id).await?;

    Ok(ApiResponse::success(MessageResponse {
        message: "Password reset successfully".to_string(),
    }))
}

/// Store a fresh emailed code for the user and hand it back for delivery.
pub(crate) async fn issue_code(
    state: &AppState,
    user_id: Uuid,
    kind: CodeKind,
) -> Result<String, ApiError> {
    let code = twofactor::email_code();
    state
        .storage
        .create_code(NewVerificationCode {
            user_id,
            code: code.clone(),
            kind,
            expires_at: Utc::now() + twofactor::code_ttl(kind),
        })
        .await?;
    Ok(code)
}

/// Issue the JWT and stamp last_active.
async fn issue_session(state: &AppState, user: User) -> ApiResult<LoginResponse> {
    let token = generate_jwt(&Claims::new(user.id, user.email.clone()))?;

    let user = state
        .storage
        .update_user(
            user.id,
            UserPatch {
                last_active: Some(Utc::now()),
                ..Default::default()
            },
        )
        .await?;

    Ok(ApiResponse::success(LoginResponse::Token {
        token,
        user: PublicUser::from(&user),
    }))
}
