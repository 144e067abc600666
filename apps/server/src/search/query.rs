//! The executable form of a search template.

use std::collections::{BTreeMap, BTreeSet};

use quarry_template::{escape_index_value, escape_repository_value};
use serde::Serialize;

/// Resource type selecting the repository query dialect.
pub const REPOSITORY_SEARCH_RESOURCE_TYPE: &str = "quarry/repository-search";

pub const FILTER_QUERY_OPTION: &str = "fq";
pub const SORT_OPTION: &str = "sort";
pub const GROUP_OPTION: &str = "group";
pub const GROUP_TOTAL_COUNT_OPTION: &str = "group.ngroups";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// Lucene-style full-text index syntax.
    Index,
    /// The content repository's own query language.
    Repository,
}

impl Dialect {
    pub fn for_resource_type(resource_type: Option<&str>) -> Self {
        match resource_type {
            Some(REPOSITORY_SEARCH_RESOURCE_TYPE) => Self::Repository,
            _ => Self::Index,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Index => "index",
            Self::Repository => "repository",
        }
    }

    /// Escape a request-supplied value for embedding in this dialect.
    pub fn escape_value(&self, value: &str) -> String {
        match self {
            Self::Index => escape_index_value(value),
            Self::Repository => escape_repository_value(value),
        }
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum OptionValue {
    Scalar(String),
    Set(BTreeSet<String>),
}

impl OptionValue {
    /// Scalar for exactly one value, a set otherwise.
    pub fn from_values(mut values: Vec<String>) -> Self {
        if values.len() == 1 {
            Self::Scalar(values.remove(0))
        } else {
            Self::Set(values.into_iter().collect())
        }
    }

    pub fn as_scalar(&self) -> Option<&str> {
        match self {
            Self::Scalar(value) => Some(value),
            Self::Set(_) => None,
        }
    }

    pub fn values(&self) -> Vec<&str> {
        match self {
            Self::Scalar(value) => vec![value.as_str()],
            Self::Set(values) => values.iter().map(String::as_str).collect(),
        }
    }

    pub fn into_set(self) -> BTreeSet<String> {
        match self {
            Self::Scalar(value) => BTreeSet::from([value]),
            Self::Set(values) => values,
        }
    }
}

/// A fully resolved query. Built once and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Query {
    path: String,
    dialect: Dialect,
    query_string: String,
    options: BTreeMap<String, OptionValue>,
}

impl Query {
    pub fn new(
        path: impl Into<String>,
        dialect: Dialect,
        query_string: impl Into<String>,
        options: BTreeMap<String, OptionValue>,
    ) -> Self {
        Self {
            path: path.into(),
            dialect,
            query_string: query_string.into(),
            options,
        }
    }

    /// Path of the template this query was built from.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn query_string(&self) -> &str {
        &self.query_string
    }

    pub fn options(&self) -> &BTreeMap<String, OptionValue> {
        &self.options
    }

    pub fn option(&self, key: &str) -> Option<&OptionValue> {
        self.options.get(key)
    }
}
