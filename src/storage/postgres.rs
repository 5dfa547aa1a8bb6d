use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{postgres::PgPoolOptions, PgPool};
use uuid::Uuid;

use crate::config::DatabaseConfig;
use crate::models::*;

use super::{
    apply_lawyer_patch, apply_session_patch, apply_user_patch, lawyer_matches, LawyerFilter,
    Result, Storage, StorageCounts, StorageError,
};

/// Postgres-backed storage. Runs the embedded migrations at connect time.
pub struct PostgresStorage {
    pool: PgPool,
}

impl PostgresStorage {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let url = std::env::var("DATABASE_URL")
            .map_err(|_| StorageError::Unavailable("DATABASE_URL is not set".into()))?;

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .connect(&url)
            .await?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| StorageError::Migration(e.to_string()))?;

        tracing::info!("Connected to Postgres and applied migrations");
        Ok(Self { pool })
    }

    /// Unique violations become conflicts, foreign-key violations become
    /// not-found, matching the memory backend's pre-checks.
    fn map_write_err(err: sqlx::Error, what: &str) -> StorageError {
        if let sqlx::Error::Database(ref db) = err {
            match db.code().as_deref() {
                Some("23505") => return StorageError::Conflict(format!("{} already exists", what)),
                Some("23503") => return StorageError::NotFound(format!("{} reference", what)),
                _ => {}
            }
        }
        StorageError::Sqlx(err)
    }

    async fn persist_user(&self, user: &User) -> Result<()> {
        sqlx::query(
            "UPDATE users SET name = $2, email = $3, password_hash = $4, phone = $5, role = $6, \
             is_lawyer = $7, email_verified = $8, two_factor_enabled = $9, two_factor_method = $10, \
             two_factor_secret = $11, backup_codes = $12, location = $13, profile_image_url = $14, \
             last_active = $15, updated_at = $16 WHERE id = $1",
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.phone)
        .bind(user.role)
        .bind(user.is_lawyer)
        .bind(user.email_verified)
        .bind(user.two_factor_enabled)
        .bind(user.two_factor_method)
        .bind(&user.two_factor_secret)
        .bind(&user.backup_codes)
        .bind(&user.location)
        .bind(&user.profile_image_url)
        .bind(user.last_active)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn users_by_ids(&self, ids: &[Uuid]) -> Result<Vec<User>> {
        Ok(
            sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ANY($1)")
                .bind(ids)
                .fetch_all(&self.pool)
                .await?,
        )
    }
}

#[async_trait]
impl Storage for PostgresStorage {
    async fn create_user(&self, new: NewUser) -> Result<User> {
        sqlx::query_as::<_, User>(
            "INSERT INTO users (id, name, email, password_hash, phone, location) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(&new.name)
        .bind(&new.email)
        .bind(&new.password_hash)
        .bind(&new.phone)
        .bind(&new.location)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| Self::map_write_err(e, "user"))
    }

    async fn user(&self, id: Uuid) -> Result<Option<User>> {
        Ok(
            sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    async fn user_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(
            sqlx::query_as::<_, User>("SELECT * FROM users WHERE lower(email) = lower($1)")
                .bind(email)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    async fn update_user(&self, id: Uuid, patch: UserPatch) -> Result<User> {
        let mut user = self
            .user(id)
            .await?
            .ok_or_else(|| StorageError::NotFound("user".into()))?;
        apply_user_patch(&mut user, patch);
        self.persist_user(&user).await?;
        Ok(user)
    }

    async fn create_session(&self, new: NewChatSession) -> Result<ChatSession> {
        sqlx::query_as::<_, ChatSession>(
            "INSERT INTO chat_sessions (id, user_id, title, language) \
             VALUES ($1, $2, $3, $4) RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(new.user_id)
        .bind(&new.title)
        .bind(new.language)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| Self::map_write_err(e, "chat session"))
    }

    async fn sessions_for_user(&self, user_id: Uuid) -> Result<Vec<ChatSession>> {
        Ok(sqlx::query_as::<_, ChatSession>(
            "SELECT * FROM chat_sessions WHERE user_id = $1 ORDER BY updated_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn session(&self, id: Uuid) -> Result<Option<ChatSession>> {
        Ok(
            sqlx::query_as::<_, ChatSession>("SELECT * FROM chat_sessions WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    async fn update_session(&self, id: Uuid, patch: ChatSessionPatch) -> Result<ChatSession> {
        let mut session = self
            .session(id)
            .await?
            .ok_or_else(|| StorageError::NotFound("chat session".into()))?;
        apply_session_patch(&mut session, patch);
        sqlx::query(
            "UPDATE chat_sessions SET title = $2, status = $3, language = $4, updated_at = $5 \
             WHERE id = $1",
        )
        .bind(session.id)
        .bind(&session.title)
        .bind(session.status)
        .bind(session.language)
        .bind(session.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(session)
    }

    async fn create_message(&self, new: NewChatMessage) -> Result<ChatMessage> {
        sqlx::query_as::<_, ChatMessage>(
            "INSERT INTO chat_messages (id, session_id, role, content, category, confidence, references_data) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(new.session_id)
        .bind(new.role)
        .bind(&new.content)
        .bind(&new.category)
        .bind(new.confidence)
        .bind(&new.references)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| Self::map_write_err(e, "chat message"))
    }

    async fn messages_for_session(&self, session_id: Uuid) -> Result<Vec<ChatMessage>> {
        Ok(sqlx::query_as::<_, ChatMessage>(
            "SELECT * FROM chat_messages WHERE session_id = $1 ORDER BY created_at ASC",
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn create_lawyer(&self, new: NewLawyer) -> Result<Lawyer> {
        sqlx::query_as::<_, Lawyer>(
            "INSERT INTO lawyers (id, user_id, license_number, specialization, experience_years, \
             location, languages, hourly_rate, bio, education, certifications, availability_schedule) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(new.user_id)
        .bind(&new.license_number)
        .bind(&new.specialization)
        .bind(new.experience_years)
        .bind(&new.location)
        .bind(&new.languages)
        .bind(new.hourly_rate)
        .bind(&new.bio)
        .bind(&new.education)
        .bind(&new.certifications)
        .bind(&new.availability_schedule)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| Self::map_write_err(e, "lawyer"))
    }

    async fn lawyers(&self, filter: &LawyerFilter) -> Result<Vec<LawyerWithUser>> {
        // The rating floor prunes in SQL; the contains-filters are applied in
        // Rust through the same helper the memory backend uses.
        let lawyers = sqlx::query_as::<_, Lawyer>(
            "SELECT * FROM lawyers WHERE ($1::numeric IS NULL OR rating >= $1) \
             ORDER BY rating DESC",
        )
        .bind(filter.min_rating)
        .fetch_all(&self.pool)
        .await?;

        let lawyers: Vec<Lawyer> = lawyers
            .into_iter()
            .filter(|l| lawyer_matches(l, filter))
            .collect();

        let ids: Vec<Uuid> = lawyers.iter().map(|l| l.user_id).collect();
        let users = self.users_by_ids(&ids).await?;

        Ok(lawyers
            .into_iter()
            .filter_map(|lawyer| {
                users
                    .iter()
                    .find(|u| u.id == lawyer.user_id)
                    .map(|u| LawyerWithUser {
                        user: PublicUser::from(u),
                        lawyer,
                    })
            })
            .collect())
    }

    async fn lawyer(&self, id: Uuid) -> Result<Option<LawyerWithUser>> {
        let Some(lawyer) = sqlx::query_as::<_, Lawyer>("SELECT * FROM lawyers WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
        else {
            return Ok(None);
        };

        let user = self.user(lawyer.user_id).await?;
        Ok(user.map(|u| LawyerWithUser {
            user: PublicUser::from(&u),
            lawyer,
        }))
    }

    async fn update_lawyer(&self, id: Uuid, patch: LawyerPatch) -> Result<Lawyer> {
        let mut lawyer = sqlx::query_as::<_, Lawyer>("SELECT * FROM lawyers WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StorageError::NotFound("lawyer".into()))?;
        apply_lawyer_patch(&mut lawyer, patch);

        sqlx::query(
            "UPDATE lawyers SET specialization = $2, experience_years = $3, location = $4, \
             languages = $5, hourly_rate = $6, bio = $7, availability_schedule = $8, \
             is_verified = $9, rating = $10, total_ratings = $11, updated_at = $12 WHERE id = $1",
        )
        .bind(lawyer.id)
        .bind(&lawyer.specialization)
        .bind(lawyer.experience_years)
        .bind(&lawyer.location)
        .bind(&lawyer.languages)
        .bind(lawyer.hourly_rate)
        .bind(&lawyer.bio)
        .bind(&lawyer.availability_schedule)
        .bind(lawyer.is_verified)
        .bind(lawyer.rating)
        .bind(lawyer.total_ratings)
        .bind(lawyer.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(lawyer)
    }

    async fn create_rating(&self, new: NewLawyerRating) -> Result<LawyerRating> {
        sqlx::query_as::<_, LawyerRating>(
            "INSERT INTO lawyer_ratings (id, lawyer_id, user_id, rating, review) \
             VALUES ($1, $2, $3, $4, $5) RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(new.lawyer_id)
        .bind(new.user_id)
        .bind(new.rating)
        .bind(&new.review)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| Self::map_write_err(e, "lawyer rating"))
    }

    async fn ratings_for_lawyer(&self, lawyer_id: Uuid) -> Result<Vec<LawyerRating>> {
        Ok(sqlx::query_as::<_, LawyerRating>(
            "SELECT * FROM lawyer_ratings WHERE lawyer_id = $1 ORDER BY created_at DESC",
        )
        .bind(lawyer_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn create_code(&self, new: NewVerificationCode) -> Result<VerificationCode> {
        sqlx::query_as::<_, VerificationCode>(
            "INSERT INTO verification_codes (id, user_id, code, kind, expires_at) \
             VALUES ($1, $2, $3, $4, $5) RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(new.user_id)
        .bind(&new.code)
        .bind(new.kind)
        .bind(new.expires_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| Self::map_write_err(e, "verification code"))
    }

    async fn valid_code(
        &self,
        user_id: Uuid,
        kind: CodeKind,
        code: &str,
    ) -> Result<Option<VerificationCode>> {
        Ok(sqlx::query_as::<_, VerificationCode>(
            "SELECT * FROM verification_codes \
             WHERE user_id = $1 AND kind = $2 AND code = $3 AND used = FALSE AND expires_at > $4 \
             LIMIT 1",
        )
        .bind(user_id)
        .bind(kind)
        .bind(code)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn mark_code_used(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query("UPDATE verification_codes SET used = TRUE WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound("verification code".into()));
        }
        Ok(())
    }

    async fn create_notification(&self, new: NewNotification) -> Result<Notification> {
        sqlx::query_as::<_, Notification>(
            "INSERT INTO notifications (id, user_id, title, message, kind) \
             VALUES ($1, $2, $3, $4, $5) RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(new.user_id)
        .bind(&new.title)
        .bind(&new.message)
        .bind(new.kind)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| Self::map_write_err(e, "notification"))
    }

    async fn notifications_for_user(&self, user_id: Uuid) -> Result<Vec<Notification>> {
        Ok(sqlx::query_as::<_, Notification>(
            "SELECT * FROM notifications WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn mark_notification_read(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query("UPDATE notifications SET read_status = TRUE WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound("notification".into()));
        }
        Ok(())
    }

    async fn counts(&self) -> Result<StorageCounts> {
        let (users, active_sessions, messages, lawyers): (i64, i64, i64, i64) =
            sqlx::query_as(
                "SELECT (SELECT COUNT(*) FROM users), \
                        (SELECT COUNT(*) FROM chat_sessions WHERE status = 'active'), \
                        (SELECT COUNT(*) FROM chat_messages), \
                        (SELECT COUNT(*) FROM lawyers)",
            )
            .fetch_one(&self.pool)
            .await?;

        Ok(StorageCounts {
            users: users as u64,
            active_sessions: active_sessions as u64,
            messages: messages as u64,
            lawyers: lawyers as u64,
        })
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
