//! Query templates for the Quarry search pipeline
//!
//! - `${name}` placeholder parsing, expansion and missing-variable detection
//! - Escaping of values for the index and repository query syntaxes
//! - Home directory shorthand (`~user`) expansion

#![forbid(unsafe_code)]

pub mod error;
pub mod escape;
pub mod home;
pub mod template;

use std::collections::BTreeSet;

pub use error::{Error, Result};
pub use escape::{escape_index_value, escape_query_chars, escape_repository_value};
pub use home::{expand_home_directory, home_path, private_path};
pub use template::{Segment, Template, Variables};

/// Expand `text` against `vars`, leaving unresolved placeholders in place.
pub fn expand<V: Variables + ?Sized>(vars: &V, text: &str) -> String {
    Template::parse(text).expand(vars)
}

/// Every placeholder still present in `text`.
pub fn missing_placeholders(text: &str) -> BTreeSet<String> {
    Template::parse(text)
        .placeholder_names()
        .map(str::to_string)
        .collect()
}

/// Placeholders in `text` that `vars` cannot resolve.
pub fn missing_placeholders_with<V: Variables + ?Sized>(vars: &V, text: &str) -> BTreeSet<String> {
    Template::parse(text).missing(vars)
}
