use anyhow::{Context, Result};
use rust_decimal::Decimal;

use crate::config;
use crate::models::*;

use super::Storage;

/// Demo accounts for local development and the integration suite. Safe to run
/// repeatedly: seeding is skipped once the admin account exists.
pub async fn seed_demo(storage: &dyn Storage) -> Result<()> {
    if storage.user_by_email("admin@lawhelp.cm").await?.is_some() {
        tracing::debug!("Demo accounts already present, skipping seed");
        return Ok(());
    }

    tracing::info!("Seeding demo accounts");
    let cost = config::config().security.bcrypt_cost;

    let admin = create_verified_user(
        storage,
        "System Administrator",
        "admin@lawhelp.cm",
        &bcrypt::hash("admin123", cost)?,
        "+237123456789",
        "Yaoundé, Cameroon",
    )
    .await?;
    storage
        .update_user(
            admin.id,
            UserPatch {
                role: Some(UserRole::Admin),
                ..Default::default()
            },
        )
        .await?;

    create_verified_user(
        storage,
        "John Doe",
        "user@lawhelp.cm",
        &bcrypt::hash("user123", cost)?,
        "+237987654321",
        "Douala, Cameroon",
    )
    .await?;

    let lawyer_hash = bcrypt::hash("lawyer123", cost)?;

    let ngozi = create_verified_user(
        storage,
        "Dr. Marie Ngozi",
        "lawyer@lawhelp.cm",
        &lawyer_hash,
        "+237555123456",
        "Yaoundé, Cameroon",
    )
    .await?;
    create_verified_lawyer(
        storage,
        &ngozi,
        NewLawyer {
            user_id: ngozi.id,
            license_number: "BAR-CM-2018-001".into(),
            specialization: vec![
                "Corporate Law".into(),
                "Contract Law".into(),
                "Business Formation".into(),
            ],
            experience_years: 8,
            location: "Yaoundé, Cameroon".into(),
            languages: vec!["English".into(), "French".into()],
            hourly_rate: Some(Decimal::new(50_000, 0)),
            bio: Some(
                "Experienced corporate lawyer specializing in business law and commercial \
                 transactions in Cameroon."
                    .into(),
            ),
            education: vec!["University of Yaoundé II, LL.M.".into()],
            certifications: vec![],
            availability_schedule: None,
        },
        Decimal::new(50, 1),
        12,
    )
    .await?;

    let biya = create_verified_user(
        storage,
        "Maître Paul Essomba",
        "lawyer2@lawhelp.cm",
        &lawyer_hash,
        "+237666789012",
        "Douala, Cameroon",
    )
    .await?;
    create_verified_lawyer(
        storage,
        &biya,
        NewLawyer {
            user_id: biya.id,
            license_number: "BAR-CM-2015-045".into(),
            specialization: vec![
                "Criminal Defense".into(),
                "Family Law".into(),
                "Personal Injury".into(),
            ],
            experience_years: 12,
            location: "Douala, Cameroon".into(),
            languages: vec!["French".into(), "English".into()],
            hourly_rate: Some(Decimal::new(75_000, 0)),
            bio: Some(
                "Senior criminal defense attorney with extensive experience in Cameroon courts."
                    .into(),
            ),
            education: vec!["Université de Douala, Maîtrise en Droit".into()],
            certifications: vec![],
            availability_schedule: None,
        },
        Decimal::new(40, 1),
        28,
    )
    .await?;

    tracing::info!("Demo seed complete: admin/user/lawyer accounts available");
    Ok(())
}

async fn create_verified_user(
    storage: &dyn Storage,
    name: &str,
    email: &str,
    password_hash: &str,
    phone: &str,
    location: &str,
) -> Result<User> {
    let user = storage
        .create_user(NewUser {
            name: name.into(),
            email: email.into(),
            password_hash: password_hash.into(),
            phone: Some(phone.into()),
            location: Some(location.into()),
        })
        .await
        .with_context(|| format!("seeding user {}", email))?;

    Ok(storage
        .update_user(
            user.id,
            UserPatch {
                email_verified: Some(true),
                ..Default::default()
            },
        )
        .await?)
}

async fn create_verified_lawyer(
    storage: &dyn Storage,
    user: &User,
    new: NewLawyer,
    rating: Decimal,
    total_ratings: i32,
) -> Result<Lawyer> {
    let lawyer = storage.create_lawyer(new).await?;

    storage
        .update_user(
            user.id,
            UserPatch {
                role: Some(UserRole::Lawyer),
                is_lawyer: Some(true),
                ..Default::default()
            },
        )
        .await?;

    Ok(storage
        .update_lawyer(
            lawyer.id,
            LawyerPatch {
                is_verified: Some(true),
                rating: Some(rating),
                total_ratings: Some(total_ratings),
                ..Default::default()
            },
        )
        .await?)
}
