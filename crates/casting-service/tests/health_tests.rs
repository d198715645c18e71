//! Public endpoint integration tests.

// Test code is allowed to use expect/unwrap for assertions
#![allow(clippy::unwrap_used, clippy::expect_used)]

use anyhow::Result;
use casting_test_utils::{Role, TestCastingServer};
use reqwest::StatusCode;
use serde_json::{json, Value};

#[tokio::test]
async fn test_index_is_public() -> Result<()> {
    let server = TestCastingServer::spawn().await?;

    let response = reqwest::get(format!("{}/", server.url())).await?;

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await?;
    assert_eq!(body, json!({"success": true, "description": "App is running."}));
    Ok(())
}

#[tokio::test]
async fn test_health_check() -> Result<()> {
    let server = TestCastingServer::spawn().await?;

    let response = reqwest::get(format!("{}/health", server.url())).await?;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await?, "OK");
    Ok(())
}

#[tokio::test]
async fn test_unknown_route_is_404() -> Result<()> {
    let server = TestCastingServer::spawn().await?;

    let response = reqwest::get(format!("{}/studios", server.url())).await?;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn test_cors_headers_on_preflight() -> Result<()> {
    let server = TestCastingServer::spawn().await?;

    let response = reqwest::Client::new()
        .request(reqwest::Method::OPTIONS, format!("{}/movies", server.url()))
        .header("Origin", "http://frontend.example")
        .header("Access-Control-Request-Method", "PATCH")
        .header("Access-Control-Request-Headers", "authorization,content-type")
        .send()
        .await?;

    assert!(response.status().is_success());
    let headers = response.headers();
    assert_eq!(headers.get("access-control-allow-origin").unwrap(), "*");
    let methods = headers
        .get("access-control-allow-methods")
        .unwrap()
        .to_str()?
        .to_ascii_uppercase();
    assert!(methods.contains("PATCH"));
    assert!(methods.contains("DELETE"));
    Ok(())
}

#[tokio::test]
async fn test_metrics_exposes_auth_decisions() -> Result<()> {
    let server = TestCastingServer::spawn().await?;
    let client = reqwest::Client::new();

    client.get(format!("{}/movies", server.url())).send().await?;
    client
        .get(format!("{}/actors", server.url()))
        .bearer_auth(server.token_for(Role::CastingAssistant))
        .send()
        .await?;

    let response = client.get(format!("{}/metrics", server.url())).send().await?;

    assert_eq!(response.status(), StatusCode::OK);
    let body = response.text().await?;
    assert!(body.contains("casting_auth_decisions_total"));
    assert!(body.contains("casting_http_requests_total"));
    Ok(())
}
