//! Built-in property providers.

use quarry_template::escape_query_chars;

use super::identity::transitive_groups;
use super::properties::{PropertyProvider, PropertyTable, SearchContext};

pub const MANAGER_GROUPS_NO_AND_KEY: &str = "_meManagerGroupsNoAnd";
pub const VIEWER_GROUPS_NO_AND_KEY: &str = "_meViewerGroupsNoAnd";
pub const MANAGER_GROUPS_KEY: &str = "_meManagerGroups";
pub const VIEWER_GROUPS_KEY: &str = "_meViewerGroups";

/// Manager and viewer clauses over the user and all of their groups, for
/// templates that search content shared with the user.
///
/// Anonymous requests get nothing, so templates referencing these keys fail
/// with a missing parameter instead of matching public content.
#[derive(Debug, Default)]
pub struct MyGroupsPropertyProvider;

impl MyGroupsPropertyProvider {
    pub const NAME: &'static str = "MyGroups";
}

impl PropertyProvider for MyGroupsPropertyProvider {
    fn load_user_properties(&self, ctx: &SearchContext<'_>, properties: &mut PropertyTable) {
        if ctx.identity.is_anonymous() {
            return;
        }

        let user_id = ctx.identity.user_id();
        let mut principals = vec![escape_query_chars(user_id)];
        principals.extend(
            transitive_groups(ctx.membership, user_id)
                .iter()
                .map(|group| escape_query_chars(group)),
        );
        let principals = principals.join(" OR ");

        let managers = format!("manager:({principals})");
        let viewers = format!("viewer:({principals})");

        properties.insert(MANAGER_GROUPS_KEY, format!(" AND {managers}"));
        properties.insert(VIEWER_GROUPS_KEY, format!(" AND {viewers}"));
        properties.insert(MANAGER_GROUPS_NO_AND_KEY, managers);
        properties.insert(VIEWER_GROUPS_NO_AND_KEY, viewers);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::identity::{Identity, StaticMembership};

    fn load(identity: &Identity, membership: &StaticMembership) -> PropertyTable {
        let ctx = SearchContext {
            identity,
            request_params: &[],
            membership,
            template_path: "/var/search/pool",
        };
        let mut table = PropertyTable::new();
        MyGroupsPropertyProvider.load_user_properties(&ctx, &mut table);
        table
    }

    #[test]
    fn builds_manager_and_viewer_clauses() {
        let membership = StaticMembership::new()
            .with_member("alice", "team-a")
            .with_member("team-a", "staff");
        let table = load(&Identity::user("alice"), &membership);

        assert_eq!(
            table.get(MANAGER_GROUPS_NO_AND_KEY),
            Some("manager:(alice OR staff OR team\\-a)")
        );
        assert_eq!(
            table.get(VIEWER_GROUPS_KEY),
            Some(" AND viewer:(alice OR staff OR team\\-a)")
        );
    }

    #[test]
    fn anonymous_gets_nothing() {
        let table = load(&Identity::anonymous(), &StaticMembership::new());
        assert!(table.is_empty());
    }
}
