//! Search endpoint handler

use axum::{
    extract::{Path, RawQuery, State},
    Json,
};
use serde_json::{Map, Value};

use crate::api::extractors::RemoteIdentity;
use crate::error::{Error, Result};
use crate::state::AppState;

const SEARCH_MOUNT: &str = "/var/";

/// Run the template addressed by the URL with the query string as request
/// parameters.
pub async fn search_handler(
    State(state): State<AppState>,
    Path(path): Path<String>,
    RawQuery(query): RawQuery,
    RemoteIdentity(identity): RemoteIdentity,
) -> Result<Json<Map<String, Value>>> {
    let template_path = template_path_for(&path)
        .ok_or_else(|| Error::NotFound(format!("{SEARCH_MOUNT}{path}")))?;
    let params = request_params(query.as_deref());

    tracing::debug!(
        template = %template_path,
        params = params.len(),
        "Dispatching search"
    );

    let body = state
        .search
        .search(&template_path, &params, &identity)
        .await?;
    Ok(Json(body))
}

/// `search/docs.json` -> `/var/search/docs`
fn template_path_for(path: &str) -> Option<String> {
    let path = path.trim_start_matches('/');
    path.strip_suffix(".json")
        .filter(|p| !p.is_empty())
        .map(|p| format!("{SEARCH_MOUNT}{p}"))
}

/// Decoded query string pairs, in order, repeats kept.
fn request_params(query: Option<&str>) -> Vec<(String, String)> {
    query
        .map(|q| {
            url::form_urlencoded::parse(q.as_bytes())
                .into_owned()
                .collect()
        })
        .unwrap_or_default()
}
