use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::Serialize;
use thiserror::Error;
use totp_rs::{Algorithm, Secret, TOTP};

use crate::models::CodeKind;

/// Issuer shown in authenticator apps.
const ISSUER: &str = "LawHelp";

/// Accept one time-step of clock drift on either side.
const TOTP_SKEW: u8 = 1;
const TOTP_STEP: u64 = 30;
const TOTP_DIGITS: usize = 6;

const BACKUP_CODE_COUNT: usize = 10;
const BACKUP_CODE_LEN: usize = 8;

#[derive(Debug, Error)]
pub enum TwoFactorError {
    #[error("invalid TOTP secret: {0}")]
    InvalidSecret(String),

    #[error("TOTP setup failed: {0}")]
    Setup(String),

    #[error("system clock error: {0}")]
    Clock(String),
}

/// Everything a client needs to enroll an authenticator app.
#[derive(Debug, Clone, Serialize)]
pub struct TotpSetup {
    pub secret: String,
    pub otpauth_url: String,
    /// QR code for the otpauth URL as a base64 PNG data URL.
    pub qr_code_url: String,
    pub backup_codes: Vec<String>,
}

/// Generate a fresh TOTP secret, provisioning URL and QR code for a user.
pub fn totp_setup(account_email: &str) -> Result<TotpSetup, TwoFactorError> {
    let totp = TOTP::new(
        Algorithm::SHA1,
        TOTP_DIGITS,
        TOTP_SKEW,
        TOTP_STEP,
        Secret::generate_secret()
            .to_bytes()
            .map_err(|e| TwoFactorError::Setup(format!("{:?}", e)))?,
        Some(ISSUER.to_string()),
        account_email.to_string(),
    )
    .map_err(|e| TwoFactorError::Setup(e.to_string()))?;

    let qr = totp
        .get_qr_base64()
        .map_err(TwoFactorError::Setup)?;

    Ok(TotpSetup {
        secret: totp.get_secret_base32(),
        otpauth_url: totp.get_url(),
        qr_code_url: format!("data:image/png;base64,{}", qr),
        backup_codes: generate_backup_codes(),
    })
}

/// Check a TOTP code against a stored base32 secret.
pub fn verify_totp(secret_base32: &str, code: &str) -> Result<bool, TwoFactorError> {
    if !code_format_ok(code) {
        return Ok(false);
    }

    let secret = Secret::Encoded(secret_base32.to_string())
        .to_bytes()
        .map_err(|e| TwoFactorError::InvalidSecret(format!("{:?}", e)))?;

    let totp = TOTP::new(
        Algorithm::SHA1,
        TOTP_DIGITS,
        TOTP_SKEW,
        TOTP_STEP,
        secret,
        Some(ISSUER.to_string()),
        "account".to_string(),
    )
    .map_err(|e| TwoFactorError::InvalidSecret(e.to_string()))?;

    totp.check_current(code)
        .map_err(|e| TwoFactorError::Clock(e.to_string()))
}

/// Random 6-digit code for email verification flows.
pub fn email_code() -> String {
    rand::thread_rng().gen_range(100_000..1_000_000).to_string()
}

/// Codes are always exactly six digits, for both TOTP and email delivery.
pub fn code_format_ok(code: &str) -> bool {
    code.len() == TOTP_DIGITS && code.bytes().all(|b| b.is_ascii_digit())
}

/// How long each kind of emailed code stays valid. Matches the expiry named
/// in the email templates.
pub fn code_ttl(kind: CodeKind) -> chrono::Duration {
    match kind {
        CodeKind::EmailVerification => chrono::Duration::hours(24),
        CodeKind::TwoFactor => chrono::Duration::minutes(10),
        CodeKind::PasswordReset => chrono::Duration::hours(1),
    }
}

fn generate_backup_codes() -> Vec<String> {
    (0..BACKUP_CODE_COUNT)
        .map(|_| {
            rand::thread_rng()
                .sample_iter(&Alphanumeric)
                .take(BACKUP_CODE_LEN)
                .map(char::from)
                .collect::<String>()
                .to_uppercase()
        })
        .collect()
}
