//! Request handlers for API endpoints

pub mod metrics;
pub mod search;

pub use metrics::*;
pub use search::*;
