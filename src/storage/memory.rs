use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::*;

use super::{
    apply_lawyer_patch, apply_session_patch, apply_user_patch, lawyer_matches, LawyerFilter,
    Result, Storage, StorageCounts, StorageError,
};

#[derive(Default)]
struct Inner {
    users: HashMap<Uuid, User>,
    sessions: HashMap<Uuid, ChatSession>,
    messages: HashMap<Uuid, ChatMessage>,
    lawyers: HashMap<Uuid, Lawyer>,
    ratings: HashMap<Uuid, LawyerRating>,
    codes: HashMap<Uuid, VerificationCode>,
    notifications: HashMap<Uuid, Notification>,
}

/// Map-backed storage. The default backend in development and the one the
/// integration suite runs against.
#[derive(Default)]
pub struct MemoryStorage {
    inner: RwLock<Inner>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn create_user(&self, new: NewUser) -> Result<User> {
        let mut inner = self.inner.write().await;
        if inner
            .users
            .values()
            .any(|u| u.email.eq_ignore_ascii_case(&new.email))
        {
            return Err(StorageError::Conflict(format!(
                "user with email {} already exists",
                new.email
            )));
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            name: new.name,
            email: new.email,
            password_hash: new.password_hash,
            phone: new.phone,
            role: UserRole::User,
            is_lawyer: false,
            email_verified: false,
            two_factor_enabled: false,
            two_factor_method: None,
            two_factor_secret: None,
            backup_codes: None,
            location: new.location,
            profile_image_url: None,
            last_active: None,
            created_at: now,
            updated_at: now,
        };
        inner.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn user(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.inner.read().await.users.get(&id).cloned())
    }

    async fn user_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(self
            .inner
            .read()
            .await
            .users
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn update_user(&self, id: Uuid, patch: UserPatch) -> Result<User> {
        let mut inner = self.inner.write().await;
        let user = inner
            .users
            .get_mut(&id)
            .ok_or_else(|| StorageError::NotFound("user".into()))?;
        apply_user_patch(user, patch);
        Ok(user.clone())
    }

    async fn create_session(&self, new: NewChatSession) -> Result<ChatSession> {
        let mut inner = self.inner.write().await;
        let now = Utc::now();
        let session = ChatSession {
            id: Uuid::new_v4(),
            user_id: new.user_id,
            title: new.title,
            status: SessionStatus::Active,
            language: new.language,
            created_at: now,
            updated_at: now,
        };
        inner.sessions.insert(session.id, session.clone());
        Ok(session)
    }

    async fn sessions_for_user(&self, user_id: Uuid) -> Result<Vec<ChatSession>> {
        let inner = self.inner.read().await;
        let mut sessions: Vec<ChatSession> = inner
            .sessions
            .values()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect();
        sessions.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(sessions)
    }

    async fn session(&self, id: Uuid) -> Result<Option<ChatSession>> {
        Ok(self.inner.read().await.sessions.get(&id).cloned())
    }

    async fn update_session(&self, id: Uuid, patch: ChatSessionPatch) -> Result<ChatSession> {
        let mut inner = self.inner.write().await;
        let session = inner
            .sessions
            .get_mut(&id)
            .ok_or_else(|| StorageError::NotFound("chat session".into()))?;
        apply_session_patch(session, patch);
        Ok(session.clone())
    }

    async fn create_message(&self, new: NewChatMessage) -> Result<ChatMessage> {
        let mut inner = self.inner.write().await;
        if !inner.sessions.contains_key(&new.session_id) {
            return Err(StorageError::NotFound("chat session".into()));
        }
        let message = ChatMessage {
            id: Uuid::new_v4(),
            session_id: new.session_id,
            role: new.role,
            content: new.content,
            category: new.category,
            confidence: new.confidence,
            references: new.references,
            created_at: Utc::now(),
        };
        inner.messages.insert(message.id, message.clone());
        Ok(message)
    }

    async fn messages_for_session(&self, session_id: Uuid) -> Result<Vec<ChatMessage>> {
        let inner = self.inner.read().await;
        let mut messages: Vec<ChatMessage> = inner
            .messages
            .values()
            .filter(|m| m.session_id == session_id)
            .cloned()
            .collect();
        messages.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(messages)
    }

    async fn create_lawyer(&self, new: NewLawyer) -> Result<Lawyer> {
        let mut inner = self.inner.write().await;
        if !inner.users.contains_key(&new.user_id) {
            return Err(StorageError::NotFound("user".into()));
        }
        if inner
            .lawyers
            .values()
            .any(|l| l.license_number == new.license_number)
        {
            return Err(StorageError::Conflict(format!(
                "lawyer with license number {} already exists",
                new.license_number
            )));
        }

        let now = Utc::now();
        let lawyer = Lawyer {
            id: Uuid::new_v4(),
            user_id: new.user_id,
            license_number: new.license_number,
            specialization: new.specialization,
            experience_years: new.experience_years,
            location: new.location,
            languages: new.languages,
            hourly_rate: new.hourly_rate,
            bio: new.bio,
            education: new.education,
            certifications: new.certifications,
            availability_schedule: new.availability_schedule,
            is_verified: false,
            rating: rust_decimal::Decimal::ZERO,
            total_ratings: 0,
            created_at: now,
            updated_at: now,
        };
        inner.lawyers.insert(lawyer.id, lawyer.clone());
        Ok(lawyer)
    }

    async fn lawyers(&self, filter: &LawyerFilter) -> Result<Vec<LawyerWithUser>> {
        let inner = self.inner.read().await;
        let mut results: Vec<LawyerWithUser> = inner
            .lawyers
            .values()
            .filter(|l| lawyer_matches(l, filter))
            .filter_map(|l| {
                // Skip orphaned profiles rather than failing the directory
                inner.users.get(&l.user_id).map(|u| LawyerWithUser {
                    lawyer: l.clone(),
                    user: PublicUser::from(u),
                })
            })
            .collect();
        results.sort_by(|a, b| b.lawyer.rating.cmp(&a.lawyer.rating));
        Ok(results)
    }

    async fn lawyer(&self, id: Uuid) -> Result<Option<LawyerWithUser>> {
        let inner = self.inner.read().await;
        let Some(lawyer) = inner.lawyers.get(&id) else {
            return Ok(None);
        };
        Ok(inner.users.get(&lawyer.user_id).map(|u| LawyerWithUser {
            lawyer: lawyer.clone(),
            user: PublicUser::from(u),
        }))
    }

    async fn update_lawyer(&self, id: Uuid, patch: LawyerPatch) -> Result<Lawyer> {
        let mut inner = self.inner.write().await;
        let lawyer = inner
            .lawyers
            .get_mut(&id)
            .ok_or_else(|| StorageError::NotFound("lawyer".into()))?;
        apply_lawyer_patch(lawyer, patch);
        Ok(lawyer.clone())
    }

    async fn create_rating(&self, new: NewLawyerRating) -> Result<LawyerRating> {
        let mut inner = self.inner.write().await;
        if !inner.lawyers.contains_key(&new.lawyer_id) {
            return Err(StorageError::NotFound("lawyer".into()));
        }
        let rating = LawyerRating {
            id: Uuid::new_v4(),
            lawyer_id: new.lawyer_id,
            user_id: new.user_id,
            rating: new.rating,
            review: new.review,
            created_at: Utc::now(),
        };
        inner.ratings.insert(rating.id, rating.clone());
        Ok(rating)
    }

    async fn ratings_for_lawyer(&self, lawyer_id: Uuid) -> Result<Vec<LawyerRating>> {
        let inner = self.inner.read().await;
        let mut ratings: Vec<LawyerRating> = inner
            .ratings
            .values()
            .filter(|r| r.lawyer_id == lawyer_id)
            .cloned()
            .collect();
        ratings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(ratings)
    }

    async fn create_code(&self, new: NewVerificationCode) -> Result<VerificationCode> {
        let mut inner = self.inner.write().await;
        let code = VerificationCode {
            id: Uuid::new_v4(),
            user_id: new.user_id,
            code: new.code,
            kind: new.kind,
            expires_at: new.expires_at,
            used: false,
            created_at: Utc::now(),
        };
        inner.codes.insert(code.id, code.clone());
        Ok(code)
    }

    async fn valid_code(
        &self,
        user_id: Uuid,
        kind: CodeKind,
        code: &str,
    ) -> Result<Option<VerificationCode>> {
        let now = Utc::now();
        Ok(self
            .inner
            .read()
            .await
            .codes
            .values()
            .find(|c| {
                c.user_id == user_id && c.kind == kind && c.code == code && !c.used && c.expires_at > now
            })
            .cloned())
    }

    async fn mark_code_used(&self, id: Uuid) -> Result<()> {
        let mut inner = self.inner.write().await;
        let code = inner
            .codes
            .get_mut(&id)
            .ok_or_else(|| StorageError::NotFound("verification code".into()))?;
        code.used = true;
        Ok(())
    }

    async fn create_notification(&self, new: NewNotification) -> Result<Notification> {
        let mut inner = self.inner.write().await;
        let notification = Notification {
            id: Uuid::new_v4(),
            user_id: new.user_id,
            title: new.title,
            message: new.message,
            kind: new.kind,
            read: false,
            created_at: Utc::now(),
        };
        inner.notifications.insert(notification.id, notification.clone());
        Ok(notification)
    }

    async fn notifications_for_user(&self, user_id: Uuid) -> Result<Vec<Notification>> {
        let inner = self.inner.read().await;
        let mut notifications: Vec<Notification> = inner
            .notifications
            .values()
            .filter(|n| n.user_id == user_id)
            .cloned()
            .collect();
        notifications.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(notifications)
    }

    async fn mark_notification_read(&self, id: Uuid) -> Result<()> {
        let mut inner = self.inner.write().await;
        let notification = inner
            .notifications
            .get_mut(&id)
            .ok_or_else(|| StorageError::NotFound("notification".into()))?;
        notification.read = true;
        Ok(())
    }

    async fn counts(&self) -> Result<StorageCounts> {
        let inner = self.inner.read().await;
        Ok(StorageCounts {
            users: inner.users.len() as u64,
            active_sessions: inner
                .sessions
                .values()
                .filter(|s| s.status == SessionStatus::Active)
                .count() as u64,
            messages: inner.messages.len() as u64,
            lawyers: inner.lawyers.len() as u64,
        })
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal::Decimal;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            name: "John Doe".into(),
            email: email.into(),
            password_hash: "$2b$10$hash".into(),
            phone: None,
            location: Some("Douala, Cameroon".into()),
        }
    }

    #[tokio::test]
    async fn duplicate_email_is_a_conflict() {
        let storage = MemoryStorage::new();
        storage.create_user(new_user("user@lawhelp.cm")).await.unwrap();

        let err = storage
            .create_user(new_user("USER@lawhelp.cm"))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Conflict(_)));
    }

    #[tokio::test]
    async fn verification_code_is_single_use() {
        let storage = MemoryStorage::new();
        let user = storage.create_user(new_user("user@lawhelp.cm")).await.unwrap();

        let code = storage
            .create_code(NewVerificationCode {
                user_id: user.id,
                code: "123456".into(),
                kind: CodeKind::EmailVerification,
                expires_at: Utc::now() + Duration::hours(24),
            })
            .await
            .unwrap();

        let found = storage
            .valid_code(user.id, CodeKind::EmailVerification, "123456")
            .await
            .unwrap();
        assert!(found.is_some());

        storage.mark_code_used(code.id).await.unwrap();
        let again = storage
            .valid_code(user.id, CodeKind::EmailVerification, "123456")
            .await
            .unwrap();
        assert!(again.is_none());
    }

    #[tokio::test]
    async fn expired_code_never_validates() {
        let storage = MemoryStorage::new();
        let user = storage.create_user(new_user("user@lawhelp.cm")).await.unwrap();

        storage
            .create_code(NewVerificationCode {
                user_id: user.id,
                code: "654321".into(),
                kind: CodeKind::TwoFactor,
                expires_at: Utc::now() - Duration::minutes(1),
            })
            .await
            .unwrap();

        let found = storage
            .valid_code(user.id, CodeKind::TwoFactor, "654321")
            .await
            .unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn wrong_kind_does_not_validate() {
        let storage = MemoryStorage::new();
        let user = storage.create_user(new_user("user@lawhelp.cm")).await.unwrap();

        storage
            .create_code(NewVerificationCode {
                user_id: user.id,
                code: "111222".into(),
                kind: CodeKind::PasswordReset,
                expires_at: Utc::now() + Duration::hours(1),
            })
            .await
            .unwrap();

        let found = storage
            .valid_code(user.id, CodeKind::TwoFactor, "111222")
            .await
            .unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn directory_sorts_by_rating_and_joins_users() {
        let storage = MemoryStorage::new();
        let u1 = storage.create_user(new_user("a@lawhelp.cm")).await.unwrap();
        let u2 = storage.create_user(new_user("b@lawhelp.cm")).await.unwrap();

        let new_lawyer = |user_id, license: &str, spec: &str| NewLawyer {
            user_id,
            license_number: license.into(),
            specialization: vec![spec.into()],
            experience_years: 5,
            location: "Yaoundé, Cameroon".into(),
            languages: vec!["English".into()],
            hourly_rate: None,
            bio: None,
            education: vec![],
            certifications: vec![],
            availability_schedule: None,
        };

        let l1 = storage
            .create_lawyer(new_lawyer(u1.id, "BAR-CM-1", "Corporate Law"))
            .await
            .unwrap();
        let l2 = storage
            .create_lawyer(new_lawyer(u2.id, "BAR-CM-2", "Criminal Law"))
            .await
            .unwrap();

        storage
            .update_lawyer(l1.id, LawyerPatch { rating: Some(Decimal::new(30, 1)), ..Default::default() })
            .await
            .unwrap();
        storage
            .update_lawyer(l2.id, LawyerPatch { rating: Some(Decimal::new(45, 1)), ..Default::default() })
            .await
            .unwrap();

        let all = storage.lawyers(&LawyerFilter::default()).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].lawyer.license_number, "BAR-CM-2");
        assert_eq!(all[0].user.email, "b@lawhelp.cm");

        let criminal = storage
            .lawyers(&LawyerFilter {
                specialization: Some("criminal".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(criminal.len(), 1);
        assert_eq!(criminal[0].lawyer.id, l2.id);
    }

    #[tokio::test]
    async fn duplicate_license_number_is_a_conflict() {
        let storage = MemoryStorage::new();
        let u1 = storage.create_user(new_user("a@lawhelp.cm")).await.unwrap();
        let u2 = storage.create_user(new_user("b@lawhelp.cm")).await.unwrap();

        let make = |user_id| NewLawyer {
            user_id,
            license_number: "BAR-CM-2018-001".into(),
            specialization: vec!["Corporate Law".into()],
            experience_years: 8,
            location: "Yaoundé".into(),
            languages: vec!["English".into()],
            hourly_rate: None,
            bio: None,
            education: vec![],
            certifications: vec![],
            availability_schedule: None,
        };

        storage.create_lawyer(make(u1.id)).await.unwrap();
        let err = storage.create_lawyer(make(u2.id)).await.unwrap_err();
        assert!(matches!(err, StorageError::Conflict(_)));
    }

    #[tokio::test]
    async fn messages_are_ordered_oldest_first() {
        let storage = MemoryStorage::new();
        let user = storage.create_user(new_user("user@lawhelp.cm")).await.unwrap();
        let session = storage
            .create_session(NewChatSession {
                user_id: user.id,
                title: "New Chat Session".into(),
                language: ChatLanguage::En,
            })
            .await
            .unwrap();

        for content in ["first", "second", "third"] {
            storage
                .create_message(NewChatMessage {
                    session_id: session.id,
                    role: MessageRole::User,
                    content: content.into(),
                    category: None,
                    confidence: None,
                    references: None,
                })
                .await
                .unwrap();
        }

        let messages = storage.messages_for_session(session.id).await.unwrap();
        let contents: Vec<_> = messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn counts_track_active_sessions_only() {
        let storage = MemoryStorage::new();
        let user = storage.create_user(new_user("user@lawhelp.cm")).await.unwrap();
        let s1 = storage
            .create_session(NewChatSession {
                user_id: user.id,
                title: "a".into(),
                language: ChatLanguage::En,
            })
            .await
            .unwrap();
        storage
            .create_session(NewChatSession {
                user_id: user.id,
                title: "b".into(),
                language: ChatLanguage::Fr,
            })
            .await
            .unwrap();
        storage
            .update_session(
                s1.id,
                ChatSessionPatch { status: Some(SessionStatus::Archived), ..Default::default() },
            )
            .await
            .unwrap();

        let counts = storage.counts().await.unwrap();
        assert_eq!(counts.users, 1);
        assert_eq!(counts.active_sessions, 1);
    }

    #[tokio::test]
    async fn notification_can_be_marked_read() {
        let storage = MemoryStorage::new();
        let user = storage.create_user(new_user("user@lawhelp.cm")).await.unwrap();
        let n = storage
            .create_notification(NewNotification {
                user_id: user.id,
                title: "Welcome to LawHelp".into(),
                message: "Your account was created".into(),
                kind: NotificationKind::Success,
            })
            .await
            .unwrap();
        assert!(!n.read);

        storage.mark_notification_read(n.id).await.unwrap();
        let list = storage.notifications_for_user(user.id).await.unwrap();
        assert!(list[0].read);
    }
}
