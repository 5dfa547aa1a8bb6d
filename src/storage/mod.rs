use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

use crate::config::{AppConfig, StorageBackend};
use crate::models::*;

pub mod memory;
pub mod postgres;
pub mod seed;

pub use memory::MemoryStorage;
pub use postgres::PostgresStorage;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("storage unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),

    #[error("migration failed: {0}")]
    Migration(String),
}

pub type Result<T> = std::result::Result<T, StorageError>;

/// Filters accepted by the lawyer directory.
#[derive(Debug, Clone, Default)]
pub struct LawyerFilter {
    pub specialization: Option<String>,
    pub location: Option<String>,
    pub language: Option<String>,
    pub min_rating: Option<Decimal>,
}

/// Row counts surfaced on /metrics.
#[derive(Debug, Clone, Copy, Default)]
pub struct StorageCounts {
    pub users: u64,
    pub active_sessions: u64,
    pub messages: u64,
    pub lawyers: u64,
}

/// Persistence seam. Two backends ship: an in-memory map store (development,
/// tests) and Postgres. Both must agree on the semantics encoded in the
/// shared patch/filter helpers below.
#[async_trait]
pub trait Storage: Send + Sync {
    // User operations
    async fn create_user(&self, new: NewUser) -> Result<User>;
    async fn user(&self, id: Uuid) -> Result<Option<User>>;
    async fn user_by_email(&self, email: &str) -> Result<Option<User>>;
    async fn update_user(&self, id: Uuid, patch: UserPatch) -> Result<User>;

    // Chat operations
    async fn create_session(&self, new: NewChatSession) -> Result<ChatSession>;
    async fn sessions_for_user(&self, user_id: Uuid) -> Result<Vec<ChatSession>>;
    async fn session(&self, id: Uuid) -> Result<Option<ChatSession>>;
    async fn update_session(&self, id: Uuid, patch: ChatSessionPatch) -> Result<ChatSession>;
    async fn create_message(&self, new: NewChatMessage) -> Result<ChatMessage>;
    async fn messages_for_session(&self, session_id: Uuid) -> Result<Vec<ChatMessage>>;

    // Lawyer directory
    async fn create_lawyer(&self, new: NewLawyer) -> Result<Lawyer>;
    async fn lawyers(&self, filter: &LawyerFilter) -> Result<Vec<LawyerWithUser>>;
    async fn lawyer(&self, id: Uuid) -> Result<Option<LawyerWithUser>>;
    async fn update_lawyer(&self, id: Uuid, patch: LawyerPatch) -> Result<Lawyer>;
    async fn create_rating(&self, new: NewLawyerRating) -> Result<LawyerRating>;
    async fn ratings_for_lawyer(&self, lawyer_id: Uuid) -> Result<Vec<LawyerRating>>;

    // Verification codes
    async fn create_code(&self, new: NewVerificationCode) -> Result<VerificationCode>;
    async fn valid_code(
        &self,
        user_id: Uuid,
        kind: CodeKind,
        code: &str,
    ) -> Result<Option<VerificationCode>>;
    async fn mark_code_used(&self, id: Uuid) -> Result<()>;

    // Notifications
    async fn create_notification(&self, new: NewNotification) -> Result<Notification>;
    async fn notifications_for_user(&self, user_id: Uuid) -> Result<Vec<Notification>>;
    async fn mark_notification_read(&self, id: Uuid) -> Result<()>;

    // Operational
    async fn counts(&self) -> Result<StorageCounts>;
    async fn ping(&self) -> Result<()>;
}

/// Build the configured backend.
pub async fn init(config: &AppConfig) -> anyhow::Result<Arc<dyn Storage>> {
    let storage: Arc<dyn Storage> = match config.storage.backend {
        StorageBackend::Memory => {
            tracing::info!("Using in-memory storage backend");
            Arc::new(MemoryStorage::new())
        }
        StorageBackend::Postgres => {
            tracing::info!("Using Postgres storage backend");
            Arc::new(PostgresStorage::connect(&config.database).await?)
        }
    };

    if config.storage.seed_demo {
        seed::seed_demo(storage.as_ref()).await?;
    }

    Ok(storage)
}

// Patch application shared by both backends so read-modify-write semantics
// cannot drift between them.

pub(crate) fn apply_user_patch(user: &mut User, patch: UserPatch) {
    if let Some(v) = patch.name {
        user.name = v;
    }
    if let Some(v) = patch.phone {
        user.phone = Some(v);
    }
    if let Some(v) = patch.location {
        user.location = Some(v);
    }
    if let Some(v) = patch.profile_image_url {
        user.profile_image_url = Some(v);
    }
    if let Some(v) = patch.password_hash {
        user.password_hash = v;
    }
    if let Some(v) = patch.role {
        user.role = v;
    }
    if let Some(v) = patch.is_lawyer {
        user.is_lawyer = v;
    }
    if let Some(v) = patch.email_verified {
        user.email_verified = v;
    }
    if let Some(v) = patch.two_factor_enabled {
        user.two_factor_enabled = v;
    }
    if let Some(v) = patch.two_factor_method {
        user.two_factor_method = v;
    }
    if let Some(v) = patch.two_factor_secret {
        user.two_factor_secret = v;
    }
    if let Some(v) = patch.backup_codes {
        user.backup_codes = v;
    }
    if let Some(v) = patch.last_active {
        user.last_active = Some(v);
    }
    user.updated_at = Utc::now();
}

pub(crate) fn apply_session_patch(session: &mut ChatSession, patch: ChatSessionPatch) {
    if let Some(v) = patch.title {
        session.title = v;
    }
    if let Some(v) = patch.status {
        session.status = v;
    }
    if let Some(v) = patch.language {
        session.language = v;
    }
    session.updated_at = Utc::now();
}

pub(crate) fn apply_lawyer_patch(lawyer: &mut Lawyer, patch: LawyerPatch) {
    if let Some(v) = patch.specialization {
        lawyer.specialization = v;
    }
    if let Some(v) = patch.experience_years {
        lawyer.experience_years = v;
    }
    if let Some(v) = patch.location {
        lawyer.location = v;
    }
    if let Some(v) = patch.languages {
        lawyer.languages = v;
    }
    if let Some(v) = patch.hourly_rate {
        lawyer.hourly_rate = v;
    }
    if let Some(v) = patch.bio {
        lawyer.bio = v;
    }
    if let Some(v) = patch.availability_schedule {
        lawyer.availability_schedule = v;
    }
    if let Some(v) = patch.is_verified {
        lawyer.is_verified = v;
    }
    if let Some(v) = patch.rating {
        lawyer.rating = v;
    }
    if let Some(v) = patch.total_ratings {
        lawyer.total_ratings = v;
    }
    lawyer.updated_at = Utc::now();
}

/// Case-insensitive contains-filters for the directory. The rating floor is
/// applied in SQL on the Postgres side; it is still checked here so the
/// memory backend behaves identically.
pub(crate) fn lawyer_matches(lawyer: &Lawyer, filter: &LawyerFilter) -> bool {
    if let Some(min) = filter.min_rating {
        if lawyer.rating < min {
            return false;
        }
    }
    if let Some(wanted) = &filter.specialization {
        let wanted = wanted.to_lowercase();
        if !lawyer
            .specialization
            .iter()
            .any(|s| s.to_lowercase().contains(&wanted))
        {
            return false;
        }
    }
    if let Some(wanted) = &filter.language {
        let wanted = wanted.to_lowercase();
        if !lawyer
            .languages
            .iter()
            .any(|l| l.to_lowercase().contains(&wanted))
        {
            return false;
        }
    }
    if let Some(wanted) = &filter.location {
        if !lawyer
            .location
            .to_lowercase()
            .contains(&wanted.to_lowercase())
        {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn lawyer() -> Lawyer {
        Lawyer {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            license_number: "BAR-CM-2018-001".into(),
            specialization: vec!["Corporate Law".into(), "Contract Law".into()],
            experience_years: 8,
            location: "Yaoundé, Cameroon".into(),
            languages: vec!["English".into(), "French".into()],
            hourly_rate: None,
            bio: None,
            education: vec![],
            certifications: vec![],
            availability_schedule: None,
            is_verified: true,
            rating: Decimal::new(40, 1),
            total_ratings: 10,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn filter_matches_are_case_insensitive_contains() {
        let l = lawyer();
        let filter = LawyerFilter {
            specialization: Some("corporate".into()),
            location: Some("yaound".into()),
            language: Some("french".into()),
            min_rating: Some(Decimal::new(35, 1)),
        };
        assert!(lawyer_matches(&l, &filter));
    }

    #[test]
    fn filter_rejects_below_rating_floor() {
        let l = lawyer();
        let filter = LawyerFilter {
            min_rating: Some(Decimal::new(45, 1)),
            ..Default::default()
        };
        assert!(!lawyer_matches(&l, &filter));
    }

    #[test]
    fn user_patch_can_clear_two_factor_fields() {
        let mut user = User {
            id: Uuid::new_v4(),
            name: "John".into(),
            email: "j@lawhelp.cm".into(),
            password_hash: "h".into(),
            phone: None,
            role: UserRole::User,
            is_lawyer: false,
            email_verified: true,
            two_factor_enabled: true,
            two_factor_method: Some(TwoFactorMethod::Totp),
            two_factor_secret: Some("JBSWY3DPEHPK3PXP".into()),
            backup_codes: None,
            location: None,
            profile_image_url: None,
            last_active: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        apply_user_patch(
            &mut user,
            UserPatch {
                two_factor_enabled: Some(false),
                two_factor_method: Some(None),
                two_factor_secret: Some(None),
                ..Default::default()
            },
        );

        assert!(!user.two_factor_enabled);
        assert!(user.two_factor_method.is_none());
        assert!(user.two_factor_secret.is_none());
        // Untouched fields survive
        assert_eq!(user.name, "John");
    }
}
