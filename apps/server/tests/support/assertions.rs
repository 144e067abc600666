use anyhow::Context as _;
use axum::{body::Bytes, http::StatusCode};
use serde_json::Value;

pub fn assert_status(actual: StatusCode, expected: StatusCode, body: &Bytes) {
    assert_eq!(
        actual,
        expected,
        "unexpected status, body: {}",
        String::from_utf8_lossy(body)
    );
}

pub fn json_body(body: &Bytes) -> anyhow::Result<Value> {
    serde_json::from_slice(body).context("response body is JSON")
}

/// Paths of the rendered results, whether written as objects or bare strings.
pub fn result_paths(response: &Value) -> Vec<String> {
    response["results"]
        .as_array()
        .map(|results| {
            results
                .iter()
                .filter_map(|r| r.as_str().or_else(|| r["path"].as_str()))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Error body rendered by the API: `{"status": ..., "error": ...}`.
pub fn assert_error(body: &Bytes, status: StatusCode, needle: &str) -> anyhow::Result<()> {
    let value = json_body(body)?;
    assert_eq!(value["status"], Value::from(status.as_u16()));
    let message = value["error"].as_str().context("error message is a string")?;
    assert!(
        message.contains(needle),
        "expected error containing {needle:?}, got {message:?}"
    );
    Ok(())
}
