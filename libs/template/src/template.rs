//! `${name}` placeholder templates.
//!
//! A template is parsed once into literal and placeholder segments. Expansion
//! substitutes placeholders that have a value and leaves the others verbatim,
//! so a partially expanded string still carries detectable `${name}` markers.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::hash::BuildHasher;

use crate::error::{Error, Result};

const OPEN: &str = "${";
const CLOSE: char = '}';

/// Read-only variable lookup used during expansion.
pub trait Variables {
    fn lookup(&self, name: &str) -> Option<&str>;
}

impl<S: BuildHasher> Variables for HashMap<String, String, S> {
    fn lookup(&self, name: &str) -> Option<&str> {
        self.get(name).map(String::as_str)
    }
}

impl Variables for BTreeMap<String, String> {
    fn lookup(&self, name: &str) -> Option<&str> {
        self.get(name).map(String::as_str)
    }
}

impl<V: Variables + ?Sized> Variables for &V {
    fn lookup(&self, name: &str) -> Option<&str> {
        (**self).lookup(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Placeholder {
        /// Trimmed variable name.
        name: String,
        /// Original text including the `${` and `}` delimiters.
        raw: String,
    },
}

/// A parsed template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    segments: Vec<Segment>,
}

impl Template {
    /// Parse leniently: an unterminated `${` or an empty `${}` is kept as
    /// literal text.
    pub fn parse(text: &str) -> Self {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut rest = text;

        while let Some(start) = rest.find(OPEN) {
            literal.push_str(&rest[..start]);
            let after_open = &rest[start + OPEN.len()..];
            let Some(end) = after_open.find(CLOSE) else {
                literal.push_str(&rest[start..]);
                rest = "";
                break;
            };

            let raw = &rest[start..start + OPEN.len() + end + 1];
            let name = after_open[..end].trim();
            if name.is_empty() {
                literal.push_str(raw);
            } else {
                if !literal.is_empty() {
                    segments.push(Segment::Literal(std::mem::take(&mut literal)));
                }
                segments.push(Segment::Placeholder {
                    name: name.to_string(),
                    raw: raw.to_string(),
                });
            }
            rest = &after_open[end + 1..];
        }

        literal.push_str(rest);
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Self { segments }
    }

    /// Parse and reject malformed placeholders.
    pub fn parse_strict(text: &str) -> Result<Self> {
        let mut offset = 0usize;
        let mut rest = text;
        while let Some(start) = rest.find(OPEN) {
            let pos = offset + start;
            let after_open = &rest[start + OPEN.len()..];
            let Some(end) = after_open.find(CLOSE) else {
                return Err(Error::Unterminated { pos });
            };
            if after_open[..end].trim().is_empty() {
                return Err(Error::EmptyName { pos });
            }
            let consumed = start + OPEN.len() + end + 1;
            offset += consumed;
            rest = &rest[consumed..];
        }
        Ok(Self::parse(text))
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Variable names referenced by the template, in order of appearance
    /// (duplicates included).
    pub fn placeholder_names(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Placeholder { name, .. } => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    pub fn has_placeholders(&self) -> bool {
        self.placeholder_names().next().is_some()
    }

    /// Substitute every placeholder that has a value.
    pub fn expand<V: Variables + ?Sized>(&self, vars: &V) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Placeholder { name, raw } => match vars.lookup(name) {
                    Some(value) => out.push_str(value),
                    None => out.push_str(raw),
                },
            }
        }
        out
    }

    /// Names referenced by the template that `vars` cannot resolve.
    pub fn missing<V: Variables + ?Sized>(&self, vars: &V) -> BTreeSet<String> {
        self.placeholder_names()
            .filter(|name| vars.lookup(name).is_none())
            .map(str::to_string)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn parse_splits_literals_and_placeholders() {
        let template = Template::parse("type:${kind} AND owner:${ _userId }");
        assert_eq!(
            template.segments(),
            &[
                Segment::Literal("type:".to_string()),
                Segment::Placeholder {
                    name: "kind".to_string(),
                    raw: "${kind}".to_string()
                },
                Segment::Literal(" AND owner:".to_string()),
                Segment::Placeholder {
                    name: "_userId".to_string(),
                    raw: "${ _userId }".to_string()
                },
            ]
        );
    }

    #[test]
    fn expand_leaves_unknown_placeholders_verbatim() {
        let template = Template::parse("a:${x} b:${y}");
        let out = template.expand(&vars(&[("x", "1")]));
        assert_eq!(out, "a:1 b:${y}");
    }

    #[test]
    fn expanded_values_are_not_re_expanded() {
        let template = Template::parse("${a}");
        let out = template.expand(&vars(&[("a", "${b}"), ("b", "nope")]));
        assert_eq!(out, "${b}");
    }

    #[test]
    fn lenient_parse_keeps_malformed_markers_as_text() {
        let template = Template::parse("x ${} y ${open");
        assert!(!template.has_placeholders());
        assert_eq!(template.expand(&vars(&[])), "x ${} y ${open");
    }

    #[test]
    fn strict_parse_reports_position() {
        assert_eq!(
            Template::parse_strict("ok ${a} bad ${b").unwrap_err(),
            Error::Unterminated { pos: 12 }
        );
        assert_eq!(
            Template::parse_strict("${ }").unwrap_err(),
            Error::EmptyName { pos: 0 }
        );
        assert!(Template::parse_strict("plain text").is_ok());
    }

    #[test]
    fn missing_is_sorted_and_deduplicated() {
        let template = Template::parse("${b} ${a} ${b} ${c}");
        let missing = template.missing(&vars(&[("c", "3")]));
        assert_eq!(
            missing.into_iter().collect::<Vec<_>>(),
            vec!["a".to_string(), "b".to_string()]
        );
    }
}
