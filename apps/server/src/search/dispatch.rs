//! Selecting a writer for a result set and assembling the response.
//!
//! A template names its writer directly (`batch_result_writer` /
//! `result_writer`) or through the older processor names
//! (`batch_result_processor` / `result_processor`), which are looked up in the
//! same writer registries. When neither resolves, the registry default is used.

use std::sync::Arc;

use serde_json::{Map, Value};

use super::error::{Result, SearchError};
use super::identity::Identity;
use super::paging::Paging;
use super::registry::NamedRegistry;
use super::result::{SearchHit, SearchResultSet};
use super::template::SearchTemplate;

/// What a writer may consult while rendering.
pub struct WriteContext<'a> {
    pub identity: &'a Identity,
    pub request_params: &'a [(String, String)],
    pub template_path: &'a str,
    pub paging: Paging,
}

/// Renders a whole result set. Consumes the hits itself.
pub trait BatchResultWriter: Send + Sync {
    fn write_results(
        &self,
        ctx: &WriteContext<'_>,
        hits: &mut dyn Iterator<Item = SearchHit>,
        out: &mut Vec<Value>,
    ) -> Result<()>;
}

/// Renders one hit.
pub trait ResultWriter: Send + Sync {
    fn write_result(&self, ctx: &WriteContext<'_>, hit: &SearchHit, out: &mut Vec<Value>)
        -> Result<()>;
}

/// Adds keys to the finished response.
pub trait ResponseDecorator: Send + Sync {
    fn decorate(&self, ctx: &WriteContext<'_>, response: &mut Map<String, Value>) -> Result<()>;
}

pub type BatchWriterRegistry = NamedRegistry<dyn BatchResultWriter>;
pub type ResultWriterRegistry = NamedRegistry<dyn ResultWriter>;
pub type DecoratorRegistry = NamedRegistry<dyn ResponseDecorator>;

/// Which link of the fallback chain produced the writer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriterChoice {
    Writer(String),
    Processor(String),
    Default,
}

pub struct ResultDispatcher {
    batch_writers: Arc<BatchWriterRegistry>,
    writers: Arc<ResultWriterRegistry>,
    decorators: Arc<DecoratorRegistry>,
}

impl ResultDispatcher {
    /// Fails unless both writer registries have a default bound.
    pub fn new(
        batch_writers: Arc<BatchWriterRegistry>,
        writers: Arc<ResultWriterRegistry>,
        decorators: Arc<DecoratorRegistry>,
    ) -> Result<Self> {
        if batch_writers.default_helper().is_none() {
            return Err(SearchError::Configuration(
                "no default batch result writer is bound".to_string(),
            ));
        }
        if writers.default_helper().is_none() {
            return Err(SearchError::Configuration(
                "no default result writer is bound".to_string(),
            ));
        }
        Ok(Self {
            batch_writers,
            writers,
            decorators,
        })
    }

    pub fn select_batch_writer(
        &self,
        template: &SearchTemplate,
    ) -> Result<(Arc<dyn BatchResultWriter>, WriterChoice)> {
        select(
            &self.batch_writers,
            template.batch_result_writer(),
            template.batch_result_processor(),
        )
    }

    pub fn select_result_writer(
        &self,
        template: &SearchTemplate,
    ) -> Result<(Arc<dyn ResultWriter>, WriterChoice)> {
        select(
            &self.writers,
            template.result_writer(),
            template.result_processor(),
        )
    }

    /// Write `results` with exactly one writer and return the response body.
    /// The total is read after the hits have been consumed.
    pub fn dispatch(
        &self,
        template: &SearchTemplate,
        ctx: &WriteContext<'_>,
        results: &mut dyn SearchResultSet,
    ) -> Result<Map<String, Value>> {
        let mut rendered = Vec::new();
        let items = ctx.paging.items_per_page;

        if template.is_batch() {
            let (writer, choice) = self.select_batch_writer(template)?;
            tracing::debug!(template = ctx.template_path, ?choice, "Writing results in batch");
            writer.write_results(ctx, &mut results.hits(), &mut rendered)?;
        } else {
            let (writer, choice) = self.select_result_writer(template)?;
            tracing::debug!(template = ctx.template_path, ?choice, "Writing results one by one");
            let limit = usize::try_from(items).unwrap_or(usize::MAX);
            for hit in results.hits().take(limit) {
                writer.write_result(ctx, &hit, &mut rendered)?;
            }
        }

        let mut response = Map::new();
        response.insert("items".to_string(), Value::from(items));
        response.insert("results".to_string(), Value::Array(rendered));
        if let Some(facets) = results.facet_fields() {
            response.insert(
                "facet_fields".to_string(),
                Value::Array(facets.iter().map(|f| f.to_json()).collect()),
            );
        }
        response.insert("total".to_string(), Value::from(results.size()));

        for name in template.decorator_names() {
            if let Some(decorator) = self.decorators.resolve(name) {
                decorator.decorate(ctx, &mut response)?;
            }
        }

        Ok(response)
    }
}

fn select<T: ?Sized>(
    registry: &NamedRegistry<T>,
    writer: Option<&str>,
    processor: Option<&str>,
) -> Result<(Arc<T>, WriterChoice)> {
    if let Some(name) = writer {
        if let Some(found) = registry.resolve(name) {
            return Ok((found, WriterChoice::Writer(name.to_string())));
        }
    }
    if let Some(name) = processor {
        if let Some(found) = registry.resolve(name) {
            return Ok((found, WriterChoice::Processor(name.to_string())));
        }
    }
    registry
        .default_helper()
        .map(|found| (found, WriterChoice::Default))
        .ok_or_else(|| {
            SearchError::Configuration(format!("no default {} is bound", registry.kind()))
        })
}
