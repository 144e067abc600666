pub mod metrics;
pub mod search;
