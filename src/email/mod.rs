use std::time::Duration;

use serde_json::json;
use thiserror::Error;

use crate::config::EmailConfig;
use crate::models::CodeKind;

#[derive(Debug, Error)]
pub enum EmailError {
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error("email relay rejected the request: {0}")]
    Rejected(String),
}

/// Delivers verification codes through a form-relay endpoint (one JSON POST
/// per recipient). When delivery is disabled the code is logged instead,
/// which is what development runs want.
#[derive(Clone)]
pub struct Mailer {
    client: reqwest::Client,
    config: EmailConfig,
}

impl Mailer {
    pub fn new(config: EmailConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .expect("reqwest client");
        Self { client, config }
    }

    pub async fn send_code(
        &self,
        email: &str,
        code: &str,
        kind: CodeKind,
    ) -> Result<(), EmailError> {
        if !self.config.enabled {
            tracing::debug!(%email, ?kind, %code, "Email delivery disabled, logging code");
            return Ok(());
        }

        let url = format!("{}/{}", self.config.endpoint.trim_end_matches('/'), email);
        let response = self
            .client
            .post(&url)
            .json(&json!({
                "_subject": subject(kind),
                "_template": "box",
                "_captcha": "false",
                "message": message(code, kind),
                "code": code,
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(EmailError::Rejected(format!(
                "status {}",
                response.status()
            )));
        }

        tracing::info!(%email, ?kind, "Verification email sent");
        Ok(())
    }
}

fn subject(kind: CodeKind) -> &'static str {
    match kind {
        CodeKind::EmailVerification => "LawHelp - Verify Your Email Address",
        CodeKind::TwoFactor => "LawHelp - Two-Factor Authentication Code",
        CodeKind::PasswordReset => "LawHelp - Password Reset Code",
    }
}

fn message(code: &str, kind: CodeKind) -> String {
    let base = format!("Your verification code is: {}", code);
    match kind {
        CodeKind::EmailVerification => format!(
            "{}\n\nPlease use this code to verify your email address. This code will expire in 24 hours.",
            base
        ),
        CodeKind::TwoFactor => format!(
            "{}\n\nPlease use this code to complete your two-factor authentication. This code will expire in 10 minutes.",
            base
        ),
        CodeKind::PasswordReset => format!(
            "{}\n\nPlease use this code to reset your password. This code will expire in 1 hour.",
            base
        ),
    }
}
