//! Shared application state and its wiring from configuration.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;

use crate::backends::{MemoryIndex, SolrBackend};
use crate::config::{BackendKind, Config};
use crate::search::{
    DeletedPathsService, Dialect, ExecutorSettings, HelperRegistries, QueryExecutor,
    SearchBackend, SearchComponents, SearchService, SearchSettings, StaticMembership,
    TemplateStore,
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub search: Arc<SearchService>,
}

impl AppState {
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let search = build_search_service(&config)?;
        Ok(Self::from_parts(config, search))
    }

    pub fn from_parts(config: Config, search: SearchService) -> Self {
        Self {
            config: Arc::new(config),
            search: Arc::new(search),
        }
    }
}

/// Assemble the search pipeline described by `config`.
pub fn build_search_service(config: &Config) -> anyhow::Result<SearchService> {
    let templates = TemplateStore::load_dir(
        &config.templates.directory,
        &config.search.search_path_prefix,
    )
    .context("Failed to load search templates")?;

    let membership = match &config.fixtures.memberships {
        Some(file) => load_json::<StaticMembership>(file, "group memberships")?,
        None => StaticMembership::new(),
    };

    let deleted_paths = match &config.fixtures.deleted_paths {
        Some(file) => DeletedPathsService::from_paths(load_json::<Vec<String>>(file, "deleted paths")?),
        None => DeletedPathsService::new(),
    };

    let backend: Arc<dyn SearchBackend> = match config.backend.kind {
        BackendKind::Memory => Arc::new(match &config.fixtures.documents {
            Some(file) => MemoryIndex::load(file)?,
            None => MemoryIndex::new(),
        }),
        BackendKind::Solr => {
            let url = config
                .backend
                .solr_url
                .as_deref()
                .context("backend.solr_url is required for the solr backend")?;
            Arc::new(SolrBackend::new(
                url,
                &config.backend.solr_core,
                config.backend.http_method,
                std::time::Duration::from_secs(config.backend.timeout_seconds),
            )?)
        }
    };
    tracing::info!(backend = backend.name(), "Search backend configured");

    let executor = QueryExecutor::new(ExecutorSettings {
        max_results: config.search.max_results,
        slow_query: config.search.slow_query(),
        very_slow_query: config.search.very_slow_query(),
    })
    // Index backends trust the reader filters added at build time, which
    // repository queries never carry. Those stay unrouted and answer 501.
    .with_backend(Dialect::Index, backend);

    let service = SearchService::new(SearchComponents {
        templates: Arc::new(templates),
        membership: Arc::new(membership),
        deleted_paths: Arc::new(deleted_paths),
        registries: HelperRegistries::with_builtins(),
        executor,
        settings: SearchSettings {
            search_path_prefix: config.search.search_path_prefix.clone(),
            default_items_per_page: config.search.default_items_per_page,
        },
    })?;
    Ok(service)
}

fn load_json<T: serde::de::DeserializeOwned>(file: &Path, what: &str) -> anyhow::Result<T> {
    let text = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {what} from {}", file.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse {what} in {}", file.display()))
}
