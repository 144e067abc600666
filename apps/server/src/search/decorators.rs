//! Built-in response decorators.

use chrono::{SecondsFormat, Utc};
use serde_json::{Map, Value};

use super::dispatch::{ResponseDecorator, WriteContext};
use super::error::Result;

pub const TIMESTAMP_DECORATOR: &str = "Timestamp";

/// Adds `"generated"`: the UTC time the response was assembled.
#[derive(Debug, Default)]
pub struct TimestampDecorator;

impl ResponseDecorator for TimestampDecorator {
    fn decorate(&self, _ctx: &WriteContext<'_>, response: &mut Map<String, Value>) -> Result<()> {
        response.insert(
            "generated".to_string(),
            Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)),
        );
        Ok(())
    }
}
