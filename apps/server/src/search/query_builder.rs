//! Turns a template and a property table into an executable [`Query`].

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use quarry_template::{expand, expand_home_directory, missing_placeholders, missing_placeholders_with};

use super::deleted_paths::DeletedPaths;
use super::error::{Result, SearchError};
use super::filter::apply_security_filters;
use super::identity::{Identity, MembershipDirectory};
use super::properties::{is_reserved_key, PropertyTable};
use super::query::{
    Dialect, OptionValue, Query, GROUP_OPTION, GROUP_TOTAL_COUNT_OPTION, SORT_OPTION,
};
use super::template::SearchTemplate;

pub struct QueryBuilder {
    membership: Arc<dyn MembershipDirectory>,
    deleted_paths: Arc<dyn DeletedPaths>,
}

impl QueryBuilder {
    pub fn new(membership: Arc<dyn MembershipDirectory>, deleted_paths: Arc<dyn DeletedPaths>) -> Self {
        Self {
            membership,
            deleted_paths,
        }
    }

    /// Build the query for `template`. Fails before producing anything if a
    /// placeholder in the query or in any option cannot be resolved; the
    /// error names all of them.
    pub fn build(
        &self,
        template: &SearchTemplate,
        properties: &PropertyTable,
        identity: &Identity,
    ) -> Result<Query> {
        let dialect = Dialect::for_resource_type(template.resource_type());

        let expanded = expand(properties, template.template_string());
        let query_string = expand_home_directory(&expanded).into_owned();
        let mut missing: BTreeSet<String> = missing_placeholders(&query_string);

        let mut options = BTreeMap::new();
        for (key, raw_values) in template.query_options() {
            if is_reserved_key(key) || raw_values.is_empty() {
                continue;
            }
            let mut values = Vec::with_capacity(raw_values.len());
            for raw in raw_values {
                missing.extend(missing_placeholders_with(properties, raw));
                let mut value = expand(properties, raw);
                if key == SORT_OPTION {
                    value = dialect.escape_value(&value);
                }
                values.push(value);
            }
            options.insert(key.clone(), OptionValue::from_values(values));
        }

        if !missing.is_empty() {
            tracing::debug!(
                template = template.path(),
                missing = ?missing,
                "Template has unresolved placeholders"
            );
            return Err(SearchError::MissingParameters(missing));
        }

        if dialect == Dialect::Index {
            apply_security_filters(
                &mut options,
                identity,
                self.membership.as_ref(),
                self.deleted_paths.as_ref(),
            );
        }

        let grouped = options
            .get(GROUP_OPTION)
            .and_then(OptionValue::as_scalar)
            .is_some_and(|value| value == "true");
        if grouped && !options.contains_key(GROUP_TOTAL_COUNT_OPTION) {
            options.insert(
                GROUP_TOTAL_COUNT_OPTION.to_string(),
                OptionValue::Scalar("true".to_string()),
            );
        }

        Ok(Query::new(template.path(), dialect, query_string, options))
    }
}
