mod support;

use axum::http::{Method, StatusCode};
use serde_json::json;
use support::*;

#[tokio::test]
async fn health_reports_ok() -> anyhow::Result<()> {
    let app = TestApp::new()?;
    let (status, _, body) = app.get("/health").await?;
    assert_status(status, StatusCode::OK, &body);
    let value = json_body(&body)?;
    assert_eq!(value["status"], json!("ok"));
    assert_eq!(value["service"], json!("quarry-server"));
    Ok(())
}

#[tokio::test]
async fn metrics_expose_search_counters() -> anyhow::Result<()> {
    let app = TestApp::new()?;
    let (status, _, body) = app.get_as(ALICE, "/var/search/docs.json?type=doc").await?;
    assert_status(status, StatusCode::OK, &body);

    let (status, headers, body) = app.get("/metrics").await?;
    assert_status(status, StatusCode::OK, &body);
    assert!(headers["content-type"]
        .to_str()?
        .starts_with("text/plain; version=0.0.4"));

    let text = String::from_utf8(body.to_vec())?;
    assert!(text.contains("quarry_search_requests_total"));
    assert!(text.contains("quarry_search_query_duration_seconds"));
    assert!(text.contains("quarry_http_requests_total"));
    assert!(text.contains(r#"route="/var/{template}.json""#));
    Ok(())
}

#[tokio::test]
async fn responses_carry_request_ids() -> anyhow::Result<()> {
    let app = TestApp::new()?;
    let (_, headers, _) = app
        .request(Method::GET, "/health", &[("x-request-id", "client-42")])
        .await?;

    let request_id = headers["x-request-id"].to_str()?;
    assert!(uuid::Uuid::parse_str(request_id).is_ok());
    assert_eq!(headers["x-correlation-id"], "client-42");
    assert!(headers.contains_key("x-trace-id"));
    Ok(())
}
