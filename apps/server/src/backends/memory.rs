//! In-memory index for development and tests.
//!
//! Understands a subset of the Lucene query syntax:
//! - `*:*`, `field:value`, `field:"a phrase"`, `field:prefix*`, `field:*`
//! - `field:(a OR b)`, parenthesised groups, `AND`, `OR`, `NOT`, `-clause`
//! - juxtaposed clauses are ANDed
//!
//! Every `fq` parameter must also match. `facet.field` parameters are counted
//! over all matches.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{PoisonError, RwLock};

use anyhow::Context;
use async_trait::async_trait;
use serde_json::Value;

use crate::search::executor::{BackendRequest, SearchBackend};
use crate::search::query::FILTER_QUERY_OPTION;
use crate::search::result::{FacetCount, FacetField, SearchHit, SearchResultSet, VecResultSet};
use crate::search::sort::{SortField, SortOrder, RELEVANCE_FIELD, SORTABLE_SUFFIX};
use crate::search::{Result, SearchError};

const FACET_FIELD_PARAM: &str = "facet.field";
const FACET_PARAM: &str = "facet";

#[derive(Debug, Default)]
pub struct MemoryIndex {
    documents: RwLock<Vec<SearchHit>>,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index JSON objects. The `path` field (or `id`) names each document;
    /// anything that is not an object is skipped.
    pub fn from_documents(documents: Vec<Value>) -> Self {
        let index = Self::new();
        for document in documents {
            index.add_document(document);
        }
        index
    }

    /// Load a JSON array of documents from `file`.
    pub fn load(file: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(file)
            .with_context(|| format!("Failed to read documents from {}", file.display()))?;
        let documents: Vec<Value> = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse documents in {}", file.display()))?;
        let index = Self::from_documents(documents);
        tracing::info!(file = %file.display(), count = index.len(), "In-memory index loaded");
        Ok(index)
    }

    pub fn add_document(&self, document: Value) {
        let Value::Object(properties) = document else {
            tracing::warn!("Skipping index document that is not a JSON object");
            return;
        };
        let path = ["path", "id"]
            .iter()
            .find_map(|key| properties.get(*key).and_then(Value::as_str))
            .unwrap_or_default()
            .to_string();
        self.documents
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(SearchHit::new(path, properties));
    }

    pub fn len(&self) -> usize {
        self.documents
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn search(&self, request: &BackendRequest) -> Result<VecResultSet> {
        let query = parse_query(&request.query)?;
        let filters = request
            .param_values(FILTER_QUERY_OPTION)
            .map(parse_query)
            .collect::<Result<Vec<_>>>()?;

        let documents = self.documents.read().unwrap_or_else(PoisonError::into_inner);
        let mut matches: Vec<&SearchHit> = documents
            .iter()
            .filter(|hit| query.matches(hit) && filters.iter().all(|f| f.matches(hit)))
            .collect();

        let facets = facet_counts(request, &matches);
        sort_hits(&mut matches, &request.sort);

        let total = matches.len() as u64;
        let start = usize::try_from(request.start).unwrap_or(usize::MAX);
        let rows = usize::try_from(request.rows).unwrap_or(usize::MAX);
        let page = matches
            .into_iter()
            .skip(start)
            .take(rows)
            .cloned()
            .collect();

        Ok(VecResultSet::new(page, total, facets))
    }
}

#[async_trait]
impl SearchBackend for MemoryIndex {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn query(&self, request: &BackendRequest) -> Result<Box<dyn SearchResultSet>> {
        Ok(Box::new(self.search(request)?))
    }
}

fn facet_counts(request: &BackendRequest, matches: &[&SearchHit]) -> Option<Vec<FacetField>> {
    if request.param(FACET_PARAM) == Some("false") {
        return None;
    }
    let fields: Vec<&str> = request.param_values(FACET_FIELD_PARAM).collect();
    if fields.is_empty() {
        return None;
    }

    let facets = fields
        .into_iter()
        .map(|field| {
            let mut counts: HashMap<String, u64> = HashMap::new();
            for hit in matches {
                for value in field_values(hit, field) {
                    *counts.entry(value).or_default() += 1;
                }
            }
            let mut values: Vec<FacetCount> = counts
                .into_iter()
                .map(|(value, count)| FacetCount { value, count })
                .collect();
            values.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.value.cmp(&b.value)));
            FacetField {
                name: field.to_string(),
                values,
            }
        })
        .collect();
    Some(facets)
}

fn field_values(hit: &SearchHit, field: &str) -> Vec<String> {
    match hit.get(field) {
        Some(Value::Array(values)) => values.iter().filter_map(scalar_text).collect(),
        Some(value) => scalar_text(value).into_iter().collect(),
        None => Vec::new(),
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn sort_hits(hits: &mut [&SearchHit], sort: &[SortField]) {
    let keys: Vec<&SortField> = sort.iter().filter(|s| s.field != RELEVANCE_FIELD).collect();
    if keys.is_empty() {
        return;
    }
    hits.sort_by(|a, b| {
        keys.iter()
            .map(|key| compare_field(a, b, key))
            .find(|ordering| ordering.is_ne())
            .unwrap_or(Ordering::Equal)
    });
}

fn sort_value<'a>(hit: &'a SearchHit, field: &str) -> Option<&'a Value> {
    hit.first_value(field).or_else(|| {
        field
            .strip_suffix(SORTABLE_SUFFIX)
            .and_then(|base| hit.first_value(base))
    })
}

/// Missing values sort last in either direction.
fn compare_field(a: &SearchHit, b: &SearchHit, key: &SortField) -> Ordering {
    match (sort_value(a, &key.field), sort_value(b, &key.field)) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(x), Some(y)) => {
            let ordering = compare_values(x, y);
            match key.order {
                SortOrder::Asc => ordering,
                SortOrder::Desc => ordering.reverse(),
            }
        }
    }
}

fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        _ => scalar_text(a).cmp(&scalar_text(b)),
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    All,
    Term {
        field: Option<String>,
        pattern: Pattern,
    },
    Not(Box<Node>),
    And(Vec<Node>),
    Or(Vec<Node>),
}

#[derive(Debug, Clone, PartialEq)]
enum Pattern {
    Any,
    Exact(String),
    Prefix(String),
}

impl Pattern {
    fn parse(raw: &str) -> Self {
        if raw == "*" {
            return Self::Any;
        }
        if raw.len() >= 2 && raw.starts_with('"') && raw.ends_with('"') && !raw.ends_with("\\\"") {
            return Self::Exact(unescape(&raw[1..raw.len() - 1]));
        }
        if raw.ends_with('*') && !raw.ends_with("\\*") {
            return Self::Prefix(unescape(&raw[..raw.len() - 1]));
        }
        Self::Exact(unescape(raw))
    }

    fn matches_text(&self, text: &str) -> bool {
        match self {
            Self::Any => true,
            Self::Exact(expected) => text == expected,
            Self::Prefix(prefix) => text.starts_with(prefix.as_str()),
        }
    }

    fn matches_value(&self, value: &Value) -> bool {
        match value {
            Value::Array(values) => values.iter().any(|v| self.matches_value(v)),
            other => scalar_text(other).is_some_and(|text| self.matches_text(&text)),
        }
    }
}

impl Node {
    fn matches(&self, hit: &SearchHit) -> bool {
        match self {
            Self::All => true,
            Self::Term {
                field: Some(field),
                pattern,
            } => match hit.get(field) {
                Some(value) => pattern.matches_value(value),
                None if field == "path" => pattern.matches_text(hit.path()),
                None => false,
            },
            Self::Term {
                field: None,
                pattern,
            } => hit.properties().values().any(|v| pattern.matches_value(v)),
            Self::Not(inner) => !inner.matches(hit),
            Self::And(nodes) => nodes.iter().all(|n| n.matches(hit)),
            Self::Or(nodes) => nodes.iter().any(|n| n.matches(hit)),
        }
    }
}

fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(escaped) = chars.next() {
                out.push(escaped);
            }
        } else {
            out.push(c);
        }
    }
    out
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    LParen,
    RParen,
    And,
    Or,
    Not,
    Word(String),
}

fn syntax_error(message: impl Into<String>) -> SearchError {
    SearchError::execution_with_status(400, message)
}

fn tokenize(query: &str) -> Result<Vec<Token>> {
    fn finish(word: &mut String, tokens: &mut Vec<Token>) {
        if word.is_empty() {
            return;
        }
        let token = match word.as_str() {
            "AND" | "&&" => Token::And,
            "OR" | "||" => Token::Or,
            "NOT" => Token::Not,
            _ => Token::Word(word.clone()),
        };
        tokens.push(token);
        word.clear();
    }

    let mut tokens = Vec::new();
    let mut word = String::new();
    let mut chars = query.chars();

    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                word.push(c);
                let escaped = chars
                    .next()
                    .ok_or_else(|| syntax_error("query ends with a dangling escape"))?;
                word.push(escaped);
            }
            '"' => {
                word.push(c);
                let mut closed = false;
                while let Some(q) = chars.next() {
                    word.push(q);
                    if q == '\\' {
                        if let Some(escaped) = chars.next() {
                            word.push(escaped);
                        }
                    } else if q == '"' {
                        closed = true;
                        break;
                    }
                }
                if !closed {
                    return Err(syntax_error("unterminated phrase in query"));
                }
            }
            '(' => {
                finish(&mut word, &mut tokens);
                tokens.push(Token::LParen);
            }
            ')' => {
                finish(&mut word, &mut tokens);
                tokens.push(Token::RParen);
            }
            '-' | '!' if word.is_empty() => tokens.push(Token::Not),
            '+' if word.is_empty() => {}
            c if c.is_whitespace() => finish(&mut word, &mut tokens),
            c => word.push(c),
        }
    }
    finish(&mut word, &mut tokens);
    Ok(tokens)
}

/// Split `field:value` at the first unescaped colon outside a phrase.
fn split_field(word: &str) -> Option<(&str, &str)> {
    let mut escaped = false;
    for (i, c) in word.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' => escaped = true,
            '"' => return None,
            ':' => return Some((&word[..i], &word[i + 1..])),
            _ => {}
        }
    }
    None
}

/// Deepest parenthesis nesting accepted in a query.
const MAX_NESTING: usize = 64;

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn parse_or(&mut self, field: Option<&str>) -> Result<Node> {
        let mut nodes = vec![self.parse_and(field)?];
        while self.peek() == Some(&Token::Or) {
            self.pos += 1;
            nodes.push(self.parse_and(field)?);
        }
        Ok(collapse(nodes, Node::Or))
    }

    fn parse_and(&mut self, field: Option<&str>) -> Result<Node> {
        let mut nodes = vec![self.parse_unary(field)?];
        loop {
            match self.peek() {
                Some(Token::And) => {
                    self.pos += 1;
                    nodes.push(self.parse_unary(field)?);
                }
                Some(Token::Not | Token::LParen | Token::Word(_)) => {
                    nodes.push(self.parse_unary(field)?)
                }
                _ => break,
            }
        }
        Ok(collapse(nodes, Node::And))
    }

    fn parse_unary(&mut self, field: Option<&str>) -> Result<Node> {
        match self.next() {
            Some(Token::Not) => {
                // Runs of negations fold by parity.
                let mut negated = true;
                while self.peek() == Some(&Token::Not) {
                    self.pos += 1;
                    negated = !negated;
                }
                let operand = self.parse_unary(field)?;
                Ok(if negated {
                    Node::Not(Box::new(operand))
                } else {
                    operand
                })
            }
            Some(Token::LParen) => self.parse_group(field),
            Some(Token::Word(word)) => self.parse_term(&word, field),
            Some(other) => Err(syntax_error(format!("unexpected {other:?} in query"))),
            None => Err(syntax_error("query ends unexpectedly")),
        }
    }

    fn parse_group(&mut self, field: Option<&str>) -> Result<Node> {
        if self.depth >= MAX_NESTING {
            return Err(syntax_error("query nests parentheses too deeply"));
        }
        self.depth += 1;
        let node = self.parse_or(field)?;
        self.depth -= 1;
        match self.next() {
            Some(Token::RParen) => Ok(node),
            _ => Err(syntax_error("unbalanced parenthesis in query")),
        }
    }

    fn parse_term(&mut self, word: &str, field: Option<&str>) -> Result<Node> {
        match split_field(word) {
            Some(("*", "*")) => Ok(Node::All),
            Some((name, "")) if self.peek() == Some(&Token::LParen) => {
                self.pos += 1;
                self.parse_group(Some(name))
            }
            Some((_, "")) => Err(syntax_error(format!("missing value for {word}"))),
            Some((name, value)) => Ok(Node::Term {
                field: Some(unescape(name)),
                pattern: Pattern::parse(value),
            }),
            None => Ok(Node::Term {
                field: field.map(unescape),
                pattern: Pattern::parse(word),
            }),
        }
    }
}

fn collapse(mut nodes: Vec<Node>, combine: fn(Vec<Node>) -> Node) -> Node {
    if nodes.len() == 1 {
        nodes.remove(0)
    } else {
        combine(nodes)
    }
}

fn parse_query(query: &str) -> Result<Node> {
    let tokens = tokenize(query)?;
    if tokens.is_empty() {
        return Ok(Node::All);
    }
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let node = parser.parse_or(None)?;
    if parser.pos < parser.tokens.len() {
        return Err(syntax_error("unbalanced parenthesis in query"));
    }
    Ok(node)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::query::Dialect;
    use serde_json::json;

    fn index() -> MemoryIndex {
        MemoryIndex::from_documents(vec![
            json!({"path": "/c/1", "type": "doc", "owner": "alice", "tags": ["a", "b"], "created": 3}),
            json!({"path": "/c/2", "type": "doc", "owner": "bob", "tags": ["b"], "created": 1}),
            json!({"path": "/c/3", "type": "img", "owner": "alice", "exclude": true, "created": 2}),
            json!({"path": "/c/4", "type": "doc", "owner": "a:carol", "title": "Hello World"}),
            json!("not an object"),
        ])
    }

    fn request(query: &str, params: &[(&str, &str)]) -> BackendRequest {
        BackendRequest {
            dialect: Dialect::Index,
            query: query.to_string(),
            start: 0,
            rows: 100,
            sort: Vec::new(),
            params: params
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    fn paths(index: &MemoryIndex, request: &BackendRequest) -> Vec<String> {
        let mut results: Box<dyn SearchResultSet> = Box::new(index.search(request).unwrap());
        results.hits().map(|h| h.path().to_string()).collect()
    }

    #[test]
    fn skips_non_object_documents() {
        assert_eq!(index().len(), 4);
    }

    #[test]
    fn evaluates_terms_and_boolean_operators() {
        let index = index();
        assert_eq!(paths(&index, &request("*:*", &[])).len(), 4);
        assert_eq!(paths(&index, &request("type:doc AND owner:alice", &[])), vec!["/c/1"]);
        assert_eq!(paths(&index, &request("type:doc owner:bob", &[])), vec!["/c/2"]);
        assert_eq!(
            paths(&index, &request("owner:(alice OR bob) -type:img", &[])),
            vec!["/c/1", "/c/2"]
        );
        assert_eq!(paths(&index, &request("tags:a OR type:img", &[])), vec!["/c/1", "/c/3"]);
        assert_eq!(paths(&index, &request("owner:a\\:carol", &[])), vec!["/c/4"]);
        assert_eq!(paths(&index, &request("title:\"Hello World\"", &[])), vec!["/c/4"]);
        assert_eq!(paths(&index, &request("owner:al*", &[])), vec!["/c/1", "/c/3"]);
        assert_eq!(paths(&index, &request("path:\\/c\\/2", &[])), vec!["/c/2"]);
    }

    #[test]
    fn filter_queries_must_all_match() {
        let index = index();
        let request = request(
            "*:*",
            &[("fq", "-exclude:true"), ("fq", "owner:(alice OR bob)")],
        );
        assert_eq!(paths(&index, &request), vec!["/c/1", "/c/2"]);
    }

    #[test]
    fn sorts_and_pages() {
        let index = index();
        let mut req = request("*:*", &[]);
        req.sort = vec![SortField {
            field: "created_sort".to_string(),
            order: SortOrder::Desc,
        }];
        assert_eq!(paths(&index, &req), vec!["/c/1", "/c/3", "/c/2", "/c/4"]);

        req.start = 1;
        req.rows = 2;
        let results = index.search(&req).unwrap();
        assert_eq!(results.size(), 4);
        let mut results: Box<dyn SearchResultSet> = Box::new(results);
        let page: Vec<String> = results.hits().map(|h| h.path().to_string()).collect();
        assert_eq!(page, vec!["/c/3", "/c/2"]);
    }

    #[test]
    fn counts_facets_over_all_matches() {
        let index = index();
        let mut req = request("type:doc", &[("facet", "true"), ("facet.field", "tags")]);
        req.rows = 1;
        let results = index.search(&req).unwrap();
        let facets = results.facet_fields().unwrap();
        assert_eq!(facets[0].name, "tags");
        assert_eq!(
            facets[0].values,
            vec![
                FacetCount { value: "b".into(), count: 2 },
                FacetCount { value: "a".into(), count: 1 },
            ]
        );
        assert!(index.search(&request("*:*", &[])).unwrap().facet_fields().is_none());
    }

    #[test]
    fn malformed_queries_are_rejected() {
        let index = index();
        for query in ["(type:doc", "type:doc)", "title:\"open", "type:", "a\\"] {
            let err = index.search(&request(query, &[])).unwrap_err();
            assert!(
                matches!(err, SearchError::Execution { status: Some(400), .. }),
                "{query} should be rejected"
            );
        }
    }

    #[test]
    fn long_negation_runs_fold_without_recursing() {
        let index = index();
        let even = format!("{}type:doc", "-".repeat(100_000));
        assert_eq!(paths(&index, &request(&even, &[])).len(), 3);

        let odd = format!("{}type:doc", "-".repeat(100_001));
        assert_eq!(paths(&index, &request(&odd, &[])), vec!["/c/3"]);
    }

    #[test]
    fn deep_nesting_is_rejected() {
        let index = index();
        let query = format!("{}type:doc{}", "(".repeat(10_000), ")".repeat(10_000));
        let err = index.search(&request(&query, &[])).unwrap_err();
        assert!(matches!(err, SearchError::Execution { status: Some(400), .. }));

        let shallow = format!("{}type:doc{}", "(".repeat(8), ")".repeat(8));
        assert_eq!(paths(&index, &request(&shallow, &[])).len(), 3);
    }
}
