//! Visibility and deletion filters attached to index queries.

use std::collections::{BTreeMap, BTreeSet};

use quarry_template::escape_query_chars;

use super::deleted_paths::DeletedPaths;
use super::identity::{transitive_groups, Identity, MembershipDirectory};
use super::query::{OptionValue, FILTER_QUERY_OPTION};

pub const ANONYMOUS_READERS_FILTER: &str = "readers:anonymous";
pub const EXCLUDED_ITEMS_FILTER: &str = "-exclude:true";

/// `readers:(<id> OR <group> ...)` over the identity and every group it
/// belongs to, sorted and escaped.
pub fn readers_filter(identity: &Identity, membership: &dyn MembershipDirectory) -> String {
    let mut readers: BTreeSet<String> = transitive_groups(membership, identity.user_id())
        .iter()
        .map(|group| escape_query_chars(group))
        .collect();
    readers.insert(escape_query_chars(identity.user_id()));
    format!("readers:({})", join_or(readers.iter()))
}

/// `-path:(<p1> OR <p2> ...)`, or nothing when no path is pending removal.
pub fn deleted_paths_filter(deleted: &dyn DeletedPaths) -> Option<String> {
    let paths = deleted.deleted_paths();
    (!paths.is_empty()).then(|| format!("-path:({})", join_or(paths.iter())))
}

/// Merge the security filters into the `fq` option, replacing its value.
pub fn apply_security_filters(
    options: &mut BTreeMap<String, OptionValue>,
    identity: &Identity,
    membership: &dyn MembershipDirectory,
    deleted: &dyn DeletedPaths,
) {
    let mut filters = options
        .remove(FILTER_QUERY_OPTION)
        .map(OptionValue::into_set)
        .unwrap_or_default();

    if identity.is_anonymous() {
        filters.insert(ANONYMOUS_READERS_FILTER.to_string());
    } else if !identity.is_admin() {
        filters.insert(readers_filter(identity, membership));
    }
    filters.insert(EXCLUDED_ITEMS_FILTER.to_string());
    if let Some(filter) = deleted_paths_filter(deleted) {
        filters.insert(filter);
    }

    options.insert(FILTER_QUERY_OPTION.to_string(), OptionValue::Set(filters));
}

fn join_or<'a>(values: impl Iterator<Item = &'a String>) -> String {
    values.map(String::as_str).collect::<Vec<_>>().join(" OR ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::deleted_paths::DeletedPathsService;
    use crate::search::identity::StaticMembership;

    fn fq(options: &BTreeMap<String, OptionValue>) -> Vec<&str> {
        options[FILTER_QUERY_OPTION].values()
    }

    #[test]
    fn readers_include_nested_groups() {
        let membership = StaticMembership::new()
            .with_member("alice", "g-1")
            .with_member("g-1", "all staff");
        assert_eq!(
            readers_filter(&Identity::user("alice"), &membership),
            "readers:(alice OR all\\ staff OR g\\-1)"
        );
    }

    #[test]
    fn anonymous_sees_public_content_only() {
        let mut options = BTreeMap::new();
        apply_security_filters(
            &mut options,
            &Identity::anonymous(),
            &StaticMembership::new(),
            &DeletedPathsService::new(),
        );
        assert_eq!(
            fq(&options),
            vec!["-exclude:true", "readers:anonymous"]
        );
    }

    #[test]
    fn admin_skips_reader_filters_but_keeps_exclusions() {
        let mut options = BTreeMap::new();
        options.insert(
            FILTER_QUERY_OPTION.to_string(),
            OptionValue::Scalar("type:doc".to_string()),
        );
        apply_security_filters(
            &mut options,
            &Identity::admin("admin"),
            &StaticMembership::new(),
            &DeletedPathsService::from_paths(["/a", "/b"]),
        );
        assert_eq!(
            fq(&options),
            vec!["-exclude:true", "-path:(\\/a OR \\/b)", "type:doc"]
        );
    }
}
