//! Drives the server against a stand-in Solr `select` endpoint.

mod support;

use std::sync::{Arc, Mutex};

use axum::{
    extract::{Form, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use quarry_server::config::{BackendKind, HttpMethod};
use serde_json::json;
use support::*;

type Captured = Arc<Mutex<Vec<(String, String)>>>;

async fn select_post(
    State(captured): State<Captured>,
    Form(params): Form<Vec<(String, String)>>,
) -> impl IntoResponse {
    respond(&captured, params)
}

async fn select_get(
    State(captured): State<Captured>,
    Query(params): Query<Vec<(String, String)>>,
) -> impl IntoResponse {
    respond(&captured, params)
}

fn respond(captured: &Captured, params: Vec<(String, String)>) -> Json<serde_json::Value> {
    *captured.lock().unwrap() = params;
    Json(json!({
        "responseHeader": {"status": 0, "QTime": 1},
        "response": {
            "numFound": 7,
            "start": 0,
            "docs": [
                {"id": "/content/remote", "type": "doc"},
                {"path": "/content/other", "id": "ignored", "type": "img"}
            ]
        },
        "facet_counts": {"facet_fields": {"type": ["doc", 5, "img", 2]}}
    }))
}

async fn unavailable() -> impl IntoResponse {
    (StatusCode::SERVICE_UNAVAILABLE, "core is reloading")
}

/// Start the stand-in Solr and return its base URL.
async fn spawn_solr(captured: Captured) -> anyhow::Result<String> {
    let router = Router::new()
        .route("/solr/quarry/select", get(select_get).post(select_post))
        .route("/solr/broken/select", get(unavailable).post(unavailable))
        .with_state(captured);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    Ok(format!("http://{addr}/solr"))
}

fn param<'a>(params: &'a [(String, String)], key: &str) -> Vec<&'a str> {
    params
        .iter()
        .filter(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
        .collect()
}

async fn app_against(url: String, core: &str, method: HttpMethod) -> anyhow::Result<TestApp> {
    let core = core.to_string();
    TestApp::new_with_config(move |config| {
        config.backend.kind = BackendKind::Solr;
        config.backend.solr_url = Some(url);
        config.backend.solr_core = core;
        config.backend.http_method = method;
    })
}

#[tokio::test]
async fn posts_query_and_security_filters() -> anyhow::Result<()> {
    let captured = Captured::default();
    let url = spawn_solr(captured.clone()).await?;
    let app = app_against(url, "quarry", HttpMethod::Post).await?;

    let (status, _, body) = app
        .get_as(ALICE, "/var/search/docs.json?type=doc&items=10&page=2")
        .await?;
    assert_status(status, StatusCode::OK, &body);

    let response = json_body(&body)?;
    assert_eq!(
        result_paths(&response),
        vec!["/content/remote", "/content/other"]
    );
    assert_eq!(response["total"], json!(7));
    assert_eq!(response["items"], json!(10));

    let params = captured.lock().unwrap().clone();
    assert_eq!(param(&params, "q"), vec!["type:doc"]);
    assert_eq!(param(&params, "start"), vec!["20"]);
    assert_eq!(param(&params, "rows"), vec!["10"]);
    assert_eq!(param(&params, "wt"), vec!["json"]);
    assert_eq!(param(&params, "sort"), vec!["created_sort desc"]);

    let filters = param(&params, "fq");
    assert!(filters.contains(&"readers:(alice OR team)"));
    assert!(filters.contains(&"-exclude:true"));
    assert!(filters.contains(&"-path:(\\/content\\/old)"));
    assert!(!filters.contains(&"readers:anonymous"));
    Ok(())
}

#[tokio::test]
async fn get_requests_carry_facets_back() -> anyhow::Result<()> {
    let captured = Captured::default();
    let url = spawn_solr(captured.clone()).await?;
    let app = app_against(url, "quarry", HttpMethod::Get).await?;

    let (status, _, body) = app.get("/var/search/all.json").await?;
    assert_status(status, StatusCode::OK, &body);

    let response = json_body(&body)?;
    assert_eq!(
        response["facet_fields"],
        json!([{"type": [{"doc": 5}, {"img": 2}]}])
    );

    let params = captured.lock().unwrap().clone();
    assert_eq!(param(&params, "facet.field"), vec!["type"]);
    let filters = param(&params, "fq");
    assert!(filters.contains(&"readers:anonymous"));
    assert!(!filters.iter().any(|f| f.starts_with("readers:(")));
    Ok(())
}

#[tokio::test]
async fn backend_status_is_passed_through() -> anyhow::Result<()> {
    let url = spawn_solr(Captured::default()).await?;
    let app = app_against(url, "broken", HttpMethod::Post).await?;

    let (status, _, body) = app.get_as(ALICE, "/var/search/docs.json?type=doc").await?;
    assert_status(status, StatusCode::SERVICE_UNAVAILABLE, &body);
    assert_error(&body, StatusCode::SERVICE_UNAVAILABLE, "Solr returned")?;
    Ok(())
}
