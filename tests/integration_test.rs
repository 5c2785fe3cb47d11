//! Smoke tests against a running server.
//!
//! Start the server first (`cargo run`), then:
//! `BASE_URL=http://localhost:3000 cargo test -- --ignored`

use anyhow::Result;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};

fn base_url() -> String {
    std::env::var("BASE_URL").unwrap_or_else(|_| "http://localhost:3000".into())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Health {
    status: String,
    timestamp: DateTime<Utc>,
    uptime_seconds: i64,
}

#[tokio::test]
#[ignore = "requires a running server at BASE_URL"]
async fn health_reports_ok() -> Result<()> {
    // ---
    let url = format!("{}/health", base_url());
    let health: Health = Client::new().get(&url).send().await?.json().await?;

    assert_eq!(health.status, "ok");
    assert!(health.uptime_seconds >= 0, "uptime should not be negative");
    assert!(
        health.timestamp <= Utc::now() + chrono::Duration::minutes(5),
        "server clock is far ahead: {}",
        health.timestamp
    );
    Ok(())
}

#[tokio::test]
#[ignore = "requires a running server at BASE_URL"]
async fn ingest_rejects_missing_key() -> Result<()> {
    // ---
    let url = format!("{}/api/data/ingest", base_url());
    let resp = Client::new()
        .post(&url)
        .json(&json!({ "tempAire": 21.0 }))
        .send()
        .await?;

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = resp.json().await?;
    assert_eq!(body["error"], "API key required");
    Ok(())
}

#[tokio::test]
#[ignore = "requires a running server at BASE_URL"]
async fn dashboard_summary_shape() -> Result<()> {
    // ---
    let url = format!("{}/api/dashboard", base_url());
    let body: Value = Client::new().get(&url).send().await?.json().await?;

    assert!(body["stations"].is_array(), "stations missing from {body}");
    assert!(body["global"]["active_stations"].is_number());
    assert!(body["serverTime"].is_string());
    Ok(())
}
