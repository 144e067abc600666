//! Prometheus metrics for the search server.

use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, register_int_gauge_vec, HistogramVec,
    IntCounterVec, IntGaugeVec,
};

/// Label used for template paths that did not resolve to a template.
pub const UNKNOWN_TEMPLATE: &str = "unknown";

lazy_static! {
    // HTTP

    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "quarry_http_requests_total",
        "Total number of HTTP requests",
        &["method", "route", "status"]
    )
    .expect("Failed to register HTTP_REQUESTS_TOTAL");

    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "quarry_http_request_duration_seconds",
        "HTTP request duration in seconds",
        &["method", "route"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    )
    .expect("Failed to register HTTP_REQUEST_DURATION_SECONDS");

    pub static ref HTTP_REQUESTS_IN_FLIGHT: IntGaugeVec = register_int_gauge_vec!(
        "quarry_http_requests_in_flight",
        "Number of HTTP requests currently being processed",
        &["method", "route"]
    )
    .expect("Failed to register HTTP_REQUESTS_IN_FLIGHT");

    // Search pipeline

    /// Searches by template and outcome (`ok` or the error kind)
    pub static ref SEARCH_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "quarry_search_requests_total",
        "Total number of template searches",
        &["template", "status"]
    )
    .expect("Failed to register SEARCH_REQUESTS_TOTAL");

    /// Wall-clock time of backend calls
    pub static ref SEARCH_QUERY_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "quarry_search_query_duration_seconds",
        "Search backend call duration in seconds",
        &["dialect"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    )
    .expect("Failed to register SEARCH_QUERY_DURATION_SECONDS");

    pub static ref SEARCH_SLOW_QUERIES_TOTAL: IntCounterVec = register_int_counter_vec!(
        "quarry_search_slow_queries_total",
        "Search backend calls over the slow or very slow threshold",
        &["class", "template"]
    )
    .expect("Failed to register SEARCH_SLOW_QUERIES_TOTAL");

    /// Total matches reported by the backend
    pub static ref SEARCH_RESULTS: HistogramVec = register_histogram_vec!(
        "quarry_search_results",
        "Number of matches reported per search",
        &["template"],
        vec![0.0, 1.0, 10.0, 25.0, 50.0, 100.0, 500.0, 1000.0, 10000.0]
    )
    .expect("Failed to register SEARCH_RESULTS");

    /// Named helpers a template asked for but no registry could supply
    pub static ref PROVIDER_RESOLUTION_WARNINGS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "quarry_provider_resolution_warnings_total",
        "Named providers, writers or decorators that could not be resolved",
        &["registry", "name"]
    )
    .expect("Failed to register PROVIDER_RESOLUTION_WARNINGS_TOTAL");
}

/// Route label for a request path, bounded to the routes the server serves.
pub fn route_label(path: &str) -> &'static str {
    match path {
        "/health" => "/health",
        "/metrics" => "/metrics",
        p if p.starts_with("/var/") => "/var/{template}.json",
        _ => "other",
    }
}

/// Template path addressed by a search URL: `/var/a/b.json` -> `/var/a/b`.
pub fn extract_template_path(path: &str) -> Option<&str> {
    path.strip_suffix(".json")
        .filter(|p| p.starts_with("/var/") && p.len() > "/var/".len())
}
