use crate::api::handlers::search;
use crate::state::AppState;
use axum::{routing::get, Router};

/// `GET /var/<template path>.json`
pub fn search_routes() -> Router<AppState> {
    Router::new().route("/var/*path", get(search::search_handler))
}
