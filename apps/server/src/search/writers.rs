//! Built-in result writers.

use serde_json::{Map, Value};

use super::dispatch::{BatchResultWriter, ResultWriter, WriteContext};
use super::error::{Result, SearchError};
use super::result::SearchHit;

pub const RESOURCE_WRITER: &str = "Resource";
pub const FULL_RESOURCE_WRITER: &str = "FullResource";
pub const PATH_WRITER: &str = "Path";

/// Writes the property bag of each hit, stopping after one page.
#[derive(Debug, Default)]
pub struct ResourceBatchWriter;

impl BatchResultWriter for ResourceBatchWriter {
    fn write_results(
        &self,
        ctx: &WriteContext<'_>,
        hits: &mut dyn Iterator<Item = SearchHit>,
        out: &mut Vec<Value>,
    ) -> Result<()> {
        let limit = usize::try_from(ctx.paging.items_per_page).unwrap_or(usize::MAX);
        out.extend(
            hits.take(limit)
                .map(|hit| Value::Object(hit.properties().clone())),
        );
        Ok(())
    }
}

/// Hits without a path cannot be addressed by the client.
fn require_path(hit: &SearchHit) -> Result<&str> {
    match hit.path() {
        "" => Err(SearchError::Write(
            "search result has neither a path nor an id".to_string(),
        )),
        path => Ok(path),
    }
}

/// `{"path": ..., <properties>}`
#[derive(Debug, Default)]
pub struct ResourceWriter;

impl ResultWriter for ResourceWriter {
    fn write_result(&self, _ctx: &WriteContext<'_>, hit: &SearchHit, out: &mut Vec<Value>) -> Result<()> {
        let path = require_path(hit)?;
        let mut object = Map::with_capacity(hit.properties().len() + 1);
        object.insert("path".to_string(), Value::String(path.to_string()));
        for (key, value) in hit.properties() {
            if key != "path" {
                object.insert(key.clone(), value.clone());
            }
        }
        out.push(Value::Object(object));
        Ok(())
    }
}

/// `{"searchdoc": <properties>, "path": ...}`, keeping the index document
/// apart from the item's own fields.
#[derive(Debug, Default)]
pub struct FullResourceWriter;

impl ResultWriter for FullResourceWriter {
    fn write_result(&self, _ctx: &WriteContext<'_>, hit: &SearchHit, out: &mut Vec<Value>) -> Result<()> {
        let path = require_path(hit)?;
        let mut object = Map::new();
        object.insert(
            "searchdoc".to_string(),
            Value::Object(hit.properties().clone()),
        );
        object.insert("path".to_string(), Value::String(path.to_string()));
        out.push(Value::Object(object));
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct PathWriter;

impl ResultWriter for PathWriter {
    fn write_result(&self, _ctx: &WriteContext<'_>, hit: &SearchHit, out: &mut Vec<Value>) -> Result<()> {
        out.push(Value::String(require_path(hit)?.to_string()));
        Ok(())
    }
}
