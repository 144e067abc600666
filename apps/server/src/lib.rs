//! Quarry search server
//!
//! Named query templates are looked up by path, filled in from the request
//! and the caller's identity, executed against an index or repository
//! backend, and rendered as JSON:
//! - `search`: the template pipeline and its helper registries
//! - `backends`: in-memory and Solr-compatible executors
//! - `api`: the axum HTTP surface

#![allow(
    clippy::type_complexity,         // Registry and writer signatures carry trait objects
)]

pub mod api;
pub mod backends;
pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod search;
pub mod state;

pub use config::Config;
pub use error::{Error, Result};
pub use state::AppState;
