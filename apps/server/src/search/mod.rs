//! The templated search pipeline.
//!
//! `TemplateSource -> PropertyResolver -> QueryBuilder -> QueryExecutor ->
//! ResultDispatcher`, driven by [`SearchService`].

pub mod decorators;
pub mod deleted_paths;
pub mod dispatch;
pub mod error;
pub mod executor;
pub mod filter;
pub mod identity;
pub mod paging;
pub mod properties;
pub mod providers;
pub mod query;
pub mod query_builder;
pub mod registry;
pub mod result;
pub mod service;
pub mod sort;
pub mod template;
pub mod writers;

pub use deleted_paths::{DeletedPaths, DeletedPathsService};
pub use dispatch::{
    BatchResultWriter, ResponseDecorator, ResultDispatcher, ResultWriter, WriteContext,
    WriterChoice,
};
pub use error::{Result, SearchError};
pub use executor::{BackendRequest, ExecutorSettings, QueryExecutor, SearchBackend};
pub use identity::{Identity, IdentityKind, MembershipDirectory, StaticMembership};
pub use paging::Paging;
pub use properties::{PropertyProvider, PropertyResolver, PropertyTable, SearchContext};
pub use query::{Dialect, OptionValue, Query};
pub use query_builder::QueryBuilder;
pub use registry::NamedRegistry;
pub use result::{FacetCount, FacetField, SearchHit, SearchResultSet, VecResultSet};
pub use service::{
    HelperRegistries, PreparedSearch, SearchComponents, SearchRun, SearchService, SearchSettings,
};
pub use sort::{SortField, SortOrder};
pub use template::{SearchTemplate, TemplateSource, TemplateStore};
