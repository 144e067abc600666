//! End-to-end search: template lookup, property resolution, query building,
//! execution and result dispatch.

use std::sync::Arc;
use std::time::Instant;

use serde_json::{Map, Value};

use super::decorators::{TimestampDecorator, TIMESTAMP_DECORATOR};
use super::deleted_paths::DeletedPaths;
use super::dispatch::{
    BatchWriterRegistry, DecoratorRegistry, ResultDispatcher, ResultWriterRegistry, WriteContext,
};
use super::error::{Result, SearchError};
use super::executor::QueryExecutor;
use super::identity::{Identity, MembershipDirectory};
use super::paging::Paging;
use super::properties::{PropertyProviderRegistry, PropertyResolver, SearchContext};
use super::providers::MyGroupsPropertyProvider;
use super::query::{Dialect, Query};
use super::query_builder::QueryBuilder;
use super::result::SearchResultSet;
use super::template::{SearchTemplate, TemplateSource};
use super::writers::{
    FullResourceWriter, PathWriter, ResourceBatchWriter, ResourceWriter, FULL_RESOURCE_WRITER,
    PATH_WRITER, RESOURCE_WRITER,
};
use crate::metrics::{SEARCH_REQUESTS_TOTAL, SEARCH_RESULTS, UNKNOWN_TEMPLATE};

/// The four named helper registries.
pub struct HelperRegistries {
    pub property_providers: Arc<PropertyProviderRegistry>,
    pub batch_writers: Arc<BatchWriterRegistry>,
    pub writers: Arc<ResultWriterRegistry>,
    pub decorators: Arc<DecoratorRegistry>,
}

impl HelperRegistries {
    pub fn new() -> Self {
        Self {
            property_providers: Arc::new(PropertyProviderRegistry::new("property_provider")),
            batch_writers: Arc::new(BatchWriterRegistry::new("batch_writer")),
            writers: Arc::new(ResultWriterRegistry::new("result_writer")),
            decorators: Arc::new(DecoratorRegistry::new("decorator")),
        }
    }

    /// Registries with the built-in providers, writers and decorators bound.
    pub fn with_builtins() -> Self {
        let registries = Self::new();
        registries.property_providers.bind(
            &[MyGroupsPropertyProvider::NAME],
            Arc::new(MyGroupsPropertyProvider),
            false,
        );
        registries
            .batch_writers
            .bind(&[RESOURCE_WRITER], Arc::new(ResourceBatchWriter), true);
        registries
            .writers
            .bind(&[RESOURCE_WRITER], Arc::new(ResourceWriter), true);
        registries
            .writers
            .bind(&[FULL_RESOURCE_WRITER], Arc::new(FullResourceWriter), false);
        registries
            .writers
            .bind(&[PATH_WRITER], Arc::new(PathWriter), false);
        registries
            .decorators
            .bind(&[TIMESTAMP_DECORATOR], Arc::new(TimestampDecorator), false);
        registries
    }
}

impl Default for HelperRegistries {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone)]
pub struct SearchSettings {
    /// Only templates below this path are served.
    pub search_path_prefix: String,
    pub default_items_per_page: u64,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            search_path_prefix: "/var/".to_string(),
            default_items_per_page: 25,
        }
    }
}

pub struct SearchComponents {
    pub templates: Arc<dyn TemplateSource>,
    pub membership: Arc<dyn MembershipDirectory>,
    pub deleted_paths: Arc<dyn DeletedPaths>,
    pub registries: HelperRegistries,
    pub executor: QueryExecutor,
    pub settings: SearchSettings,
}

/// A query ready for execution.
#[derive(Debug, Clone)]
pub struct PreparedSearch {
    pub template: Arc<SearchTemplate>,
    pub query: Query,
    pub paging: Paging,
}

/// An executed search whose results have not been written yet.
pub struct SearchRun {
    pub template: Arc<SearchTemplate>,
    pub query: Query,
    pub paging: Paging,
    pub result_set: Box<dyn SearchResultSet>,
}

pub struct SearchService {
    templates: Arc<dyn TemplateSource>,
    membership: Arc<dyn MembershipDirectory>,
    resolver: PropertyResolver,
    builder: QueryBuilder,
    executor: QueryExecutor,
    dispatcher: ResultDispatcher,
    settings: SearchSettings,
}

impl SearchService {
    pub fn new(components: SearchComponents) -> Result<Self> {
        let SearchComponents {
            templates,
            membership,
            deleted_paths,
            registries,
            executor,
            settings,
        } = components;

        let dispatcher = ResultDispatcher::new(
            registries.batch_writers,
            registries.writers,
            registries.decorators,
        )?;

        Ok(Self {
            templates,
            builder: QueryBuilder::new(Arc::clone(&membership), deleted_paths),
            membership,
            resolver: PropertyResolver::new(registries.property_providers),
            executor,
            dispatcher,
            settings,
        })
    }

    pub fn settings(&self) -> &SearchSettings {
        &self.settings
    }

    /// The template at `path`, if it may be served.
    pub fn template(&self, path: &str) -> Result<Arc<SearchTemplate>> {
        if !path.starts_with(&self.settings.search_path_prefix)
            || path.split('/').any(|segment| segment == "..")
        {
            return Err(SearchError::Forbidden(path.to_string()));
        }
        self.templates
            .template(path)
            .ok_or_else(|| SearchError::TemplateNotFound(path.to_string()))
    }

    /// Resolve properties and build the query, without touching a backend.
    pub fn prepare(
        &self,
        template_path: &str,
        request_params: &[(String, String)],
        identity: &Identity,
    ) -> Result<PreparedSearch> {
        let template = self.template(template_path)?;
        let ctx = SearchContext {
            identity,
            request_params,
            membership: self.membership.as_ref(),
            template_path,
        };
        let properties = self.resolver.resolve(
            &ctx,
            Dialect::for_resource_type(template.resource_type()),
            template.default_values(),
            template.property_provider_names(),
        );
        let query = self.builder.build(&template, &properties, identity)?;
        let paging = Paging::resolve(
            &query,
            &template,
            request_params,
            self.settings.default_items_per_page,
        );

        Ok(PreparedSearch {
            template,
            query,
            paging,
        })
    }

    pub async fn run_search(
        &self,
        template_path: &str,
        request_params: &[(String, String)],
        identity: &Identity,
    ) -> Result<SearchRun> {
        let PreparedSearch {
            template,
            query,
            paging,
        } = self.prepare(template_path, request_params, identity)?;

        let result_set = self
            .executor
            .execute(&query, paging.offset(), paging.items_per_page)
            .await?;

        Ok(SearchRun {
            template,
            query,
            paging,
            result_set,
        })
    }

    /// Run the template and render the response body.
    #[tracing::instrument(skip(self, request_params, identity), fields(user = %identity.user_id()))]
    pub async fn search(
        &self,
        template_path: &str,
        request_params: &[(String, String)],
        identity: &Identity,
    ) -> Result<Map<String, Value>> {
        let started = Instant::now();
        let outcome = self.search_inner(template_path, request_params, identity).await;

        let (template_label, status) = match &outcome {
            Ok(_) => (template_path, "ok"),
            Err(e @ (SearchError::TemplateNotFound(_) | SearchError::Forbidden(_))) => {
                (UNKNOWN_TEMPLATE, e.kind())
            }
            Err(e) => (template_path, e.kind()),
        };
        SEARCH_REQUESTS_TOTAL
            .with_label_values(&[template_label, status])
            .inc();

        match &outcome {
            Ok(_) => tracing::debug!(
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Search completed"
            ),
            Err(e) => tracing::debug!(error = %e, "Search failed"),
        }
        outcome
    }

    async fn search_inner(
        &self,
        template_path: &str,
        request_params: &[(String, String)],
        identity: &Identity,
    ) -> Result<Map<String, Value>> {
        let mut run = self
            .run_search(template_path, request_params, identity)
            .await?;

        SEARCH_RESULTS
            .with_label_values(&[template_path])
            .observe(run.result_set.size() as f64);

        let ctx = WriteContext {
            identity,
            request_params,
            template_path,
            paging: run.paging,
        };
        self.dispatcher
            .dispatch(&run.template, &ctx, run.result_set.as_mut())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::memory::MemoryIndex;
    use crate::search::deleted_paths::DeletedPathsService;
    use crate::search::executor::ExecutorSettings;
    use crate::search::identity::StaticMembership;
    use crate::search::template::TemplateStore;
    use serde_json::json;

    fn service(store: TemplateStore) -> SearchService {
        let index = Arc::new(MemoryIndex::from_documents(vec![
            json!({"path": "/c/1", "type": "doc", "readers": ["alice"], "created_sort": 1}),
            json!({"path": "/c/2", "type": "doc", "readers": ["alice"], "created_sort": 2}),
            json!({"path": "/c/3", "type": "img", "readers": ["anonymous"]}),
        ]));
        SearchService::new(SearchComponents {
            templates: Arc::new(store),
            membership: Arc::new(StaticMembership::new()),
            deleted_paths: Arc::new(DeletedPathsService::new()),
            registries: HelperRegistries::with_builtins(),
            executor: QueryExecutor::new(ExecutorSettings::default())
                .with_backend(Dialect::Index, index),
            settings: SearchSettings::default(),
        })
        .unwrap()
    }

    fn params(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn templates_outside_the_search_path_are_forbidden() {
        let service = service(TemplateStore::new());
        assert_eq!(
            service.template("/etc/secret").unwrap_err(),
            SearchError::Forbidden("/etc/secret".to_string())
        );
        assert!(matches!(
            service.template("/var/../etc/x"),
            Err(SearchError::Forbidden(_))
        ));
        assert_eq!(
            service.template("/var/search/none").unwrap_err(),
            SearchError::TemplateNotFound("/var/search/none".to_string())
        );
    }

    #[test]
    fn prepare_resolves_query_and_paging() {
        let store = TemplateStore::new().with_template(
            SearchTemplate::new("/var/search/docs", "type:${kind}").with_default("items", "5"),
        );
        let prepared = service(store)
            .prepare(
                "/var/search/docs",
                &params(&[("kind", "doc"), ("page", "2")]),
                &Identity::user("alice"),
            )
            .unwrap();
        assert_eq!(prepared.query.query_string(), "type:doc");
        assert_eq!(prepared.paging, Paging::new(5, 2));
    }

    #[tokio::test]
    async fn search_renders_visible_results() {
        let store = TemplateStore::new().with_template(
            SearchTemplate::new("/var/search/docs", "type:${kind}")
                .with_option("sort", ["created desc"])
                .with_result_writer(PATH_WRITER),
        );
        let response = service(store)
            .search("/var/search/docs", &params(&[("kind", "doc")]), &Identity::user("alice"))
            .await
            .unwrap();
        assert_eq!(response["results"], json!(["/c/2", "/c/1"]));
        assert_eq!(response["total"], json!(2));
        assert_eq!(response["items"], json!(25));
    }

    #[tokio::test]
    async fn missing_parameters_abort_before_execution() {
        let store = TemplateStore::new()
            .with_template(SearchTemplate::new("/var/search/docs", "type:${kind}"));
        let err = service(store)
            .search("/var/search/docs", &[], &Identity::user("alice"))
            .await
            .unwrap_err();
        assert!(matches!(err, SearchError::MissingParameters(names) if names.contains("kind")));
    }
}
