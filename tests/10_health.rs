mod common;

use anyhow::Result;
use reqwest::StatusCode;

#[tokio::test]
async fn health_endpoint_reports_healthy() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let res = client
        .get(format!("{}/health", server.base_url))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);

    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["status"], "healthy");
    Ok(())
}

#[tokio::test]
async fn root_banner_lists_endpoints() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let res = client.get(&server.base_url).send().await?;
    assert_eq!(res.status(), StatusCode::OK);

    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body["data"]["name"], "LawHelp API");
    assert!(body["data"]["endpoints"]["ws"].is_string());
    Ok(())
}

#[tokio::test]
async fn metrics_expose_prometheus_gauges() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let res = client
        .get(format!("{}/metrics", server.base_url))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);

    let text = res.text().await?;
    // Demo seed: 4 users, 2 lawyer profiles
    assert!(text.contains("lawhelp_total_users 4"), "got:\n{}", text);
    assert!(text.contains("lawhelp_lawyers_count 2"));
    assert!(text.contains("# TYPE lawhelp_requests_total counter"));
    Ok(())
}
