//! Per-request property tables and the providers that fill them.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use quarry_template::{escape_query_chars, private_path, Variables};

use super::identity::{Identity, MembershipDirectory};
use super::query::Dialect;
use super::registry::NamedRegistry;

pub const USER_ID_KEY: &str = "_userId";
pub const USER_PRIVATE_PATH_KEY: &str = "_userPrivatePath";

/// Key prefixes owned by the host repository; never treated as template
/// properties or query options.
pub const RESERVED_KEY_PREFIXES: &[&str] = &["jcr:", "sling:"];

pub fn is_reserved_key(key: &str) -> bool {
    RESERVED_KEY_PREFIXES
        .iter()
        .any(|prefix| key.starts_with(prefix))
}

/// Variables available to a template during one request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertyTable {
    entries: HashMap<String, String>,
}

impl PropertyTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Insert or overwrite, returning the previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.entries.insert(key.into(), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.entries.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl Variables for PropertyTable {
    fn lookup(&self, name: &str) -> Option<&str> {
        self.get(name)
    }
}

/// What a property provider may consult.
pub struct SearchContext<'a> {
    pub identity: &'a Identity,
    /// Request parameters in request order; a name may repeat.
    pub request_params: &'a [(String, String)],
    pub membership: &'a dyn MembershipDirectory,
    pub template_path: &'a str,
}

impl SearchContext<'_> {
    /// First value supplied for `name`.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.request_params
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// Adds computed properties. Providers run last and may overwrite anything.
pub trait PropertyProvider: Send + Sync {
    fn load_user_properties(&self, ctx: &SearchContext<'_>, properties: &mut PropertyTable);
}

pub type PropertyProviderRegistry = NamedRegistry<dyn PropertyProvider>;

/// Builds the [`PropertyTable`] for one request.
pub struct PropertyResolver {
    providers: Arc<PropertyProviderRegistry>,
}

impl PropertyResolver {
    pub fn new(providers: Arc<PropertyProviderRegistry>) -> Self {
        Self { providers }
    }

    /// Layers, lowest precedence first: the seeded user keys, template
    /// defaults, non-blank request parameters (escaped for `dialect`), then
    /// each named provider in order.
    pub fn resolve(
        &self,
        ctx: &SearchContext<'_>,
        dialect: Dialect,
        defaults: &BTreeMap<String, String>,
        provider_names: &[String],
    ) -> PropertyTable {
        let mut table = PropertyTable::new();

        let user_id = ctx.identity.user_id();
        table.insert(USER_ID_KEY, escape_query_chars(user_id));
        table.insert(
            USER_PRIVATE_PATH_KEY,
            escape_query_chars(&private_path(user_id)),
        );

        for (key, value) in defaults {
            if is_reserved_key(key) || key == USER_ID_KEY || key == USER_PRIVATE_PATH_KEY {
                continue;
            }
            table.insert(key.clone(), value.clone());
        }

        let mut seen = Vec::new();
        for (key, value) in ctx.request_params {
            if seen.contains(&key) {
                continue;
            }
            seen.push(key);
            if value.trim().is_empty() {
                continue;
            }
            table.insert(key.clone(), dialect.escape_value(value));
        }

        for name in provider_names {
            if let Some(provider) = self.providers.resolve(name) {
                provider.load_user_properties(ctx, &mut table);
            }
        }

        table
    }
}
