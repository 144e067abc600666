//! Escaping helpers for values embedded in query text.
//!
//! Two levels exist for the Lucene-style index syntax:
//! - [`escape_query_chars`] escapes every syntax character and whitespace. It is
//!   used for identifiers (user ids, group ids, paths) that must match literally.
//! - [`escape_index_value`] is selective: it leaves whitespace, wildcards (`*`,
//!   `?`) and leading negation alone so request values can still express
//!   multi-term, wildcard and exclusion searches.

/// Characters with special meaning in the index query syntax.
const QUERY_SYNTAX_CHARS: &[char] = &[
    '\\', '+', '-', '!', '(', ')', ':', '^', '[', ']', '"', '{', '}', '~', '*', '?', '|', '&',
    ';', '/',
];

/// Characters escaped by the selective index escaper.
const SELECTIVE_INDEX_CHARS: &[char] = &[
    '\\', '"', ':', '(', ')', '[', ']', '{', '}', '^', '~', '!', '/', '+', '&', '|',
];

/// Escape every query syntax character and all whitespace.
pub fn escape_query_chars(input: &str) -> String {
    let mut out = String::with_capacity(input.len() + 8);
    for c in input.chars() {
        if QUERY_SYNTAX_CHARS.contains(&c) || c.is_whitespace() {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Selective escaping for free-text request values in the index syntax.
pub fn escape_index_value(input: &str) -> String {
    let mut out = String::with_capacity(input.len() + 4);
    for c in input.chars() {
        if SELECTIVE_INDEX_CHARS.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Escaping for the repository query syntax, where values are quoted strings.
pub fn escape_repository_value(input: &str) -> String {
    let mut out = String::with_capacity(input.len() + 4);
    for c in input.chars() {
        if c == '\\' || c == '"' {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
