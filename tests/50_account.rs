mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::json;

#[tokio::test]
async fn totp_setup_returns_provisioning_material() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let token = common::login(&client, &server.base_url, "user@lawhelp.cm", "user123").await?;

    let res = client
        .post(format!("{}/api/auth/2fa/setup/totp", server.base_url))
        .bearer_auth(&token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);

    let body = res.json::<serde_json::Value>().await?;
    assert!(!body["data"]["secret"].as_str().unwrap().is_empty());
    assert!(body["data"]["otpauth_url"]
        .as_str()
        .unwrap()
        .starts_with("otpauth://totp/"));
    assert!(body["data"]["qr_code_url"]
        .as_str()
        .unwrap()
        .starts_with("data:image/png;base64,"));
    assert_eq!(body["data"]["backup_codes"].as_array().unwrap().len(), 10);
    Ok(())
}

#[tokio::test]
async fn email_setup_sends_a_test_code() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let token = common::login(&client, &server.base_url, "user@lawhelp.cm", "user123").await?;

    // Delivery is disabled in the test environment; the endpoint still
    // issues the code and reports success.
    let res = client
        .post(format!("{}/api/auth/2fa/setup/email", server.base_url))
        .bearer_auth(&token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn wrong_setup_code_does_not_enable_2fa() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let token = common::login(&client, &server.base_url, "user@lawhelp.cm", "user123").await?;

    let res = client
        .post(format!("{}/api/auth/2fa/verify-setup", server.base_url))
        .bearer_auth(&token)
        .json(&json!({ "code": "000000", "method": "email" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn disabling_2fa_requires_the_password() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let token = common::login(&client, &server.base_url, "admin@lawhelp.cm", "admin123").await?;

    let res = client
        .post(format!("{}/api/auth/2fa/disable", server.base_url))
        .bearer_auth(&token)
        .json(&json!({ "password": "wrong" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = client
        .post(format!("{}/api/auth/2fa/disable", server.base_url))
        .bearer_auth(&token)
        .json(&json!({ "password": "admin123" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn notifications_list_and_unknown_ack() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let token = common::login(&client, &server.base_url, "lawyer@lawhelp.cm", "lawyer123").await?;

    let res = client
        .get(format!("{}/api/notifications", server.base_url))
        .bearer_auth(&token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body = res.json::<serde_json::Value>().await?;
    assert!(body["data"].is_array());

    // Acking someone else's (or a nonexistent) notification is a 404
    let res = client
        .patch(format!(
            "{}/api/notifications/00000000-0000-0000-0000-000000000000/read",
            server.base_url
        ))
        .bearer_auth(&token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn password_reset_request_never_reveals_accounts() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();
    let url = format!("{}/api/auth/password-reset/request", server.base_url);

    // Registered and unregistered addresses get the same answer
    let res = client
        .post(&url)
        .json(&json!({ "email": "user@lawhelp.cm" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);

    let res = client
        .post(&url)
        .json(&json!({ "email": "nobody@lawhelp.cm" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn password_reset_confirm_rejects_bad_codes() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let res = client
        .post(format!(
            "{}/api/auth/password-reset/confirm",
            server.base_url
        ))
        .json(&json!({
            "email": "user@lawhelp.cm",
            "code": "000000",
            "new_password": "a-brand-new-password",
        }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    Ok(())
}
