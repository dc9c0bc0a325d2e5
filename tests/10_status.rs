mod common;

use anyhow::Result;
use reqwest::StatusCode;
use std::time::Duration;

#[tokio::test]
async fn status_endpoint_responds() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let res = client.get(format!("{}/status", server.base_url)).send().await?;

    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.headers().contains_key("x-request-id"));
    assert!(res.headers().contains_key("x-process-time"));

    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["status"], "OK");
    assert_eq!(body["data"]["tenant"], "tacc");
    Ok(())
}

#[tokio::test]
async fn auth_status_requires_a_token() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let res = client.get(format!("{}/status/auth", server.base_url)).send().await?;

    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body["error"], true);
    assert_eq!(body["code"], "UNAUTHORIZED");
    Ok(())
}

#[tokio::test]
async fn malformed_token_is_rejected_and_audited() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let res = client
        .get(format!("{}/status/auth", server.base_url))
        .bearer_auth("definitely-not-a-jwt")
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let request_id = res
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .expect("request id header");

    // The file sink writes from a background task
    let mut found = None;
    for _ in 0..40 {
        let contents = std::fs::read_to_string(server.audit_log()).unwrap_or_default();
        found = contents
            .lines()
            .filter_map(|line| serde_json::from_str::<serde_json::Value>(line).ok())
            .find(|record| record["correlation_id"] == request_id.as_str());
        if found.is_some() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    let record = found.expect("audit record for the rejected request");
    assert_eq!(record["response"]["status"], 401);
    assert_eq!(record["request"]["claims"], serde_json::json!({}));
    assert!(!record.to_string().contains("definitely-not-a-jwt"));
    Ok(())
}
