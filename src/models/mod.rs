use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "user_role", rename_all = "snake_case")]
pub enum UserRole {
    User,
    Lawyer,
    Admin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "two_factor_method", rename_all = "snake_case")]
pub enum TwoFactorMethod {
    Totp,
    Email,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "session_status", rename_all = "snake_case")]
pub enum SessionStatus {
    Active,
    Completed,
    Archived,
}

/// Chat languages supported by the assistant (Cameroon is bilingual).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "chat_language", rename_all = "snake_case")]
pub enum ChatLanguage {
    En,
    Fr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "message_role", rename_all = "snake_case")]
pub enum MessageRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "code_kind", rename_all = "snake_case")]
pub enum CodeKind {
    EmailVerification,
    PasswordReset,
    TwoFactor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "notification_kind", rename_all = "snake_case")]
pub enum NotificationKind {
    Info,
    Warning,
    Success,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub phone: Option<String>,
    pub role: UserRole,
    pub is_lawyer: bool,
    pub email_verified: bool,
    pub two_factor_enabled: bool,
    pub two_factor_method: Option<TwoFactorMethod>,
    #[serde(skip_serializing)]
    pub two_factor_secret: Option<String>,
    #[serde(skip_serializing)]
    pub backup_codes: Option<Vec<String>>,
    pub location: Option<String>,
    pub profile_image_url: Option<String>,
    pub last_active: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Projection of a user that is safe to return to any client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub profile_image_url: Option<String>,
    pub is_lawyer: bool,
    pub email_verified: bool,
    pub two_factor_enabled: bool,
    pub two_factor_method: Option<TwoFactorMethod>,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            phone: user.phone.clone(),
            location: user.location.clone(),
            profile_image_url: user.profile_image_url.clone(),
            is_lawyer: user.is_lawyer,
            email_verified: user.email_verified,
            two_factor_enabled: user.two_factor_enabled,
            two_factor_method: user.two_factor_method,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub phone: Option<String>,
    pub location: Option<String>,
}

/// Partial user update. `None` leaves the field untouched; the double-Option
/// fields distinguish "leave as is" from "clear to NULL".
#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub profile_image_url: Option<String>,
    pub password_hash: Option<String>,
    pub role: Option<UserRole>,
    pub is_lawyer: Option<bool>,
    pub email_verified: Option<bool>,
    pub two_factor_enabled: Option<bool>,
    pub two_factor_method: Option<Option<TwoFactorMethod>>,
    pub two_factor_secret: Option<Option<String>>,
    pub backup_codes: Option<Option<Vec<String>>>,
    pub last_active: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ChatSession {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub status: SessionStatus,
    pub language: ChatLanguage,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewChatSession {
    pub user_id: Uuid,
    pub title: String,
    pub language: ChatLanguage,
}

#[derive(Debug, Clone, Default)]
pub struct ChatSessionPatch {
    pub title: Option<String>,
    pub status: Option<SessionStatus>,
    pub language: Option<ChatLanguage>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ChatMessage {
    pub id: Uuid,
    pub session_id: Uuid,
    pub role: MessageRole,
    pub content: String,
    pub category: Option<String>,
    pub confidence: Option<Decimal>,
    #[sqlx(rename = "references_data")]
    pub references: Option<Vec<String>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewChatMessage {
    pub session_id: Uuid,
    pub role: MessageRole,
    pub content: String,
    pub category: Option<String>,
    pub confidence: Option<Decimal>,
    pub references: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Lawyer {
    pub id: Uuid,
    pub user_id: Uuid,
    pub license_number: String,
    pub specialization: Vec<String>,
    pub experience_years: i32,
    pub location: String,
    pub languages: Vec<String>,
    pub hourly_rate: Option<Decimal>,
    pub bio: Option<String>,
    pub education: Vec<String>,
    pub certifications: Vec<String>,
    pub availability_schedule: Option<Value>,
    pub is_verified: bool,
    pub rating: Decimal,
    pub total_ratings: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewLawyer {
    pub user_id: Uuid,
    pub license_number: String,
    pub specialization: Vec<String>,
    pub experience_years: i32,
    pub location: String,
    pub languages: Vec<String>,
    pub hourly_rate: Option<Decimal>,
    pub bio: Option<String>,
    pub education: Vec<String>,
    pub certifications: Vec<String>,
    pub availability_schedule: Option<Value>,
}

#[derive(Debug, Clone, Default)]
pub struct LawyerPatch {
    pub specialization: Option<Vec<String>>,
    pub experience_years: Option<i32>,
    pub location: Option<String>,
    pub languages: Option<Vec<String>>,
    pub hourly_rate: Option<Option<Decimal>>,
    pub bio: Option<Option<String>>,
    pub availability_schedule: Option<Option<Value>>,
    pub is_verified: Option<bool>,
    pub rating: Option<Decimal>,
    pub total_ratings: Option<i32>,
}

/// A directory entry: the lawyer profile joined with its public user record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LawyerWithUser {
    #[serde(flatten)]
    pub lawyer: Lawyer,
    pub user: PublicUser,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct LawyerRating {
    pub id: Uuid,
    pub lawyer_id: Uuid,
    pub user_id: Uuid,
    pub rating: i32,
    pub review: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewLawyerRating {
    pub lawyer_id: Uuid,
    pub user_id: Uuid,
    pub rating: i32,
    pub review: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct VerificationCode {
    pub id: Uuid,
    pub user_id: Uuid,
    pub code: String,
    pub kind: CodeKind,
    pub expires_at: DateTime<Utc>,
    pub used: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewVerificationCode {
    pub user_id: Uuid,
    pub code: String,
    pub kind: CodeKind,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub message: String,
    pub kind: NotificationKind,
    #[sqlx(rename = "read_status")]
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewNotification {
    pub user_id: Uuid,
    pub title: String,
    pub message: String,
    pub kind: NotificationKind,
}
