//! Submits queries to the backend serving their dialect.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use super::error::{Result, SearchError};
use super::query::{Dialect, Query, SORT_OPTION};
use super::result::SearchResultSet;
use super::sort::{translate_sort, SortField};
use crate::metrics::{SEARCH_QUERY_DURATION_SECONDS, SEARCH_SLOW_QUERIES_TOTAL};

/// Parameters of one backend call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendRequest {
    pub dialect: Dialect,
    pub query: String,
    pub start: u64,
    pub rows: u64,
    pub sort: Vec<SortField>,
    /// Remaining options; a set-valued option repeats its key.
    pub params: Vec<(String, String)>,
}

impl BackendRequest {
    pub fn param_values<'a, 'k>(&'a self, key: &'k str) -> impl Iterator<Item = &'a str> + 'k
    where
        'a: 'k,
    {
        self.params
            .iter()
            .filter(move |(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn param(&self, key: &str) -> Option<&str> {
        self.param_values(key).next()
    }
}

#[async_trait]
pub trait SearchBackend: Send + Sync {
    fn name(&self) -> &'static str;

    async fn query(&self, request: &BackendRequest) -> Result<Box<dyn SearchResultSet>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutorSettings {
    pub max_results: u64,
    pub slow_query: Duration,
    pub very_slow_query: Duration,
}

impl Default for ExecutorSettings {
    fn default() -> Self {
        Self {
            max_results: 100,
            slow_query: Duration::from_millis(10),
            very_slow_query: Duration::from_millis(100),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Latency {
    Normal,
    Slow,
    VerySlow,
}

impl Latency {
    pub fn classify(elapsed: Duration, settings: &ExecutorSettings) -> Self {
        if elapsed > settings.very_slow_query {
            Self::VerySlow
        } else if elapsed > settings.slow_query {
            Self::Slow
        } else {
            Self::Normal
        }
    }
}

pub struct QueryExecutor {
    backends: HashMap<Dialect, Arc<dyn SearchBackend>>,
    settings: ExecutorSettings,
}

impl QueryExecutor {
    pub fn new(settings: ExecutorSettings) -> Self {
        Self {
            backends: HashMap::new(),
            settings,
        }
    }

    pub fn with_backend(mut self, dialect: Dialect, backend: Arc<dyn SearchBackend>) -> Self {
        self.backends.insert(dialect, backend);
        self
    }

    pub fn settings(&self) -> &ExecutorSettings {
        &self.settings
    }

    /// Translate `query` into backend parameters. Rows are capped at
    /// `max_results`.
    pub fn build_request(&self, query: &Query, offset: u64, size: u64) -> BackendRequest {
        let mut sort = Vec::new();
        let mut params = Vec::new();
        for (key, value) in query.options() {
            if key == SORT_OPTION {
                sort.extend(value.values().into_iter().filter_map(translate_sort));
                continue;
            }
            for v in value.values() {
                params.push((key.clone(), v.to_string()));
            }
        }

        BackendRequest {
            dialect: query.dialect(),
            query: query.query_string().to_string(),
            start: offset,
            rows: size.min(self.settings.max_results),
            sort,
            params,
        }
    }

    #[tracing::instrument(skip_all, fields(template = %query.path(), dialect = %query.dialect()))]
    pub async fn execute(
        &self,
        query: &Query,
        offset: u64,
        size: u64,
    ) -> Result<Box<dyn SearchResultSet>> {
        let backend = self.backends.get(&query.dialect()).ok_or_else(|| {
            SearchError::execution_with_status(
                501,
                format!("no search backend for the {} dialect", query.dialect()),
            )
        })?;

        let request = self.build_request(query, offset, size);
        tracing::debug!(
            backend = backend.name(),
            query = %request.query,
            start = request.start,
            rows = request.rows,
            "Executing search"
        );

        let started = Instant::now();
        let outcome = backend.query(&request).await;
        let elapsed = started.elapsed();

        SEARCH_QUERY_DURATION_SECONDS
            .with_label_values(&[query.dialect().as_str()])
            .observe(elapsed.as_secs_f64());
        self.report_latency(query, elapsed);

        let results = outcome.inspect_err(|e| {
            tracing::warn!(error = %e, "Search backend call failed");
        })?;
        tracing::debug!(total = results.size(), "Search executed");
        Ok(results)
    }

    fn report_latency(&self, query: &Query, elapsed: Duration) {
        let millis = elapsed.as_millis() as u64;
        match Latency::classify(elapsed, &self.settings) {
            Latency::VerySlow => {
                tracing::error!(
                    target: "slow_query",
                    template = %query.path(),
                    elapsed_ms = millis,
                    query = %query.query_string(),
                    "Very slow search query"
                );
                SEARCH_SLOW_QUERIES_TOTAL
                    .with_label_values(&["very_slow", query.path()])
                    .inc();
            }
            Latency::Slow => {
                tracing::warn!(
                    target: "slow_query",
                    template = %query.path(),
                    elapsed_ms = millis,
                    query = %query.query_string(),
                    "Slow search query"
                );
                SEARCH_SLOW_QUERIES_TOTAL
                    .with_label_values(&["slow", query.path()])
                    .inc();
            }
            Latency::Normal => {}
        }
    }
}
