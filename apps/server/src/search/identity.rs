//! The identity a search runs as, and group membership lookups.

use std::collections::{BTreeSet, HashMap, VecDeque};

use serde::{Deserialize, Serialize};

pub const ANONYMOUS_USER_ID: &str = "anonymous";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentityKind {
    Anonymous,
    Admin,
    User,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    user_id: String,
    kind: IdentityKind,
}

impl Identity {
    pub fn anonymous() -> Self {
        Self {
            user_id: ANONYMOUS_USER_ID.to_string(),
            kind: IdentityKind::Anonymous,
        }
    }

    pub fn user(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            kind: IdentityKind::User,
        }
    }

    pub fn admin(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            kind: IdentityKind::Admin,
        }
    }

    /// Classify a user id asserted by the fronting proxy. Absent, blank or
    /// `anonymous` ids are anonymous; ids listed in `admin_users` are admins.
    pub fn classify(user_id: Option<&str>, admin_users: &[String]) -> Self {
        match user_id.map(str::trim) {
            None | Some("") | Some(ANONYMOUS_USER_ID) => Self::anonymous(),
            Some(id) if admin_users.iter().any(|admin| admin == id) => Self::admin(id),
            Some(id) => Self::user(id),
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn kind(&self) -> IdentityKind {
        self.kind
    }

    pub fn is_anonymous(&self) -> bool {
        self.kind == IdentityKind::Anonymous
    }

    pub fn is_admin(&self) -> bool {
        self.kind == IdentityKind::Admin
    }
}

/// Direct group membership of a principal (user or group).
pub trait MembershipDirectory: Send + Sync {
    fn direct_groups(&self, principal: &str) -> Vec<String>;
}

/// Membership loaded from a `principal -> [group, ...]` mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct StaticMembership {
    groups: HashMap<String, Vec<String>>,
}

impl StaticMembership {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_member(&mut self, principal: impl Into<String>, group: impl Into<String>) {
        let group = group.into();
        let groups = self.groups.entry(principal.into()).or_default();
        if !groups.contains(&group) {
            groups.push(group);
        }
    }

    pub fn with_member(mut self, principal: impl Into<String>, group: impl Into<String>) -> Self {
        self.add_member(principal, group);
        self
    }
}

impl MembershipDirectory for StaticMembership {
    fn direct_groups(&self, principal: &str) -> Vec<String> {
        self.groups.get(principal).cloned().unwrap_or_default()
    }
}

/// Every group `principal` belongs to, directly or through other groups.
/// Membership cycles terminate; the principal itself is never included.
pub fn transitive_groups(directory: &dyn MembershipDirectory, principal: &str) -> BTreeSet<String> {
    let mut seen = BTreeSet::new();
    let mut queue = VecDeque::from([principal.to_string()]);

    while let Some(current) = queue.pop_front() {
        for group in directory.direct_groups(&current) {
            if group != principal && seen.insert(group.clone()) {
                queue.push_back(group);
            }
        }
    }

    seen
}
