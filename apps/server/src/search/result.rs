//! Search results as returned by a backend.

use serde::Serialize;
use serde_json::{Map, Value};

/// One matching item: its path plus an opaque property bag.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    path: String,
    properties: Map<String, Value>,
}

impl SearchHit {
    pub fn new(path: impl Into<String>, properties: Map<String, Value>) -> Self {
        Self {
            path: path.into(),
            properties,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn properties(&self) -> &Map<String, Value> {
        &self.properties
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    /// First value of a possibly multi-valued property.
    pub fn first_value(&self, key: &str) -> Option<&Value> {
        match self.properties.get(key)? {
            Value::Array(values) => values.first(),
            value => Some(value),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FacetCount {
    pub value: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FacetField {
    pub name: String,
    pub values: Vec<FacetCount>,
}

impl FacetField {
    /// `{"<field>": [{"<value>": count}, ...]}`
    pub fn to_json(&self) -> Value {
        let counts: Vec<Value> = self
            .values
            .iter()
            .map(|facet| {
                let mut entry = Map::new();
                entry.insert(facet.value.clone(), Value::from(facet.count));
                Value::Object(entry)
            })
            .collect();
        let mut field = Map::new();
        field.insert(self.name.clone(), Value::Array(counts));
        Value::Object(field)
    }
}

/// Results of one backend call, consumed once.
pub trait SearchResultSet: Send {
    /// Next hit in backend order.
    fn next_hit(&mut self) -> Option<SearchHit>;

    /// Total number of matches, independent of paging.
    fn size(&self) -> u64;

    fn facet_fields(&self) -> Option<&[FacetField]>;
}

impl dyn SearchResultSet + '_ {
    pub fn hits(&mut self) -> Hits<'_> {
        Hits { results: self }
    }
}

/// Iterator adapter over a result set.
pub struct Hits<'a> {
    results: &'a mut dyn SearchResultSet,
}

impl Iterator for Hits<'_> {
    type Item = SearchHit;

    fn next(&mut self) -> Option<SearchHit> {
        self.results.next_hit()
    }
}

/// A result page already materialized in memory.
#[derive(Debug)]
pub struct VecResultSet {
    hits: std::vec::IntoIter<SearchHit>,
    size: u64,
    facets: Option<Vec<FacetField>>,
}

impl VecResultSet {
    pub fn new(hits: Vec<SearchHit>, size: u64, facets: Option<Vec<FacetField>>) -> Self {
        Self {
            hits: hits.into_iter(),
            size,
            facets,
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new(), 0, None)
    }
}

impl SearchResultSet for VecResultSet {
    fn next_hit(&mut self) -> Option<SearchHit> {
        self.hits.next()
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn facet_fields(&self) -> Option<&[FacetField]> {
        self.facets.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn hit(path: &str, props: Value) -> SearchHit {
        match props {
            Value::Object(map) => SearchHit::new(path, map),
            _ => SearchHit::new(path, Map::new()),
        }
    }

    #[test]
    fn first_value_unwraps_lists() {
        let hit = hit("/a", json!({"tags": ["x", "y"], "title": "T", "empty": []}));
        assert_eq!(hit.first_value("tags"), Some(&json!("x")));
        assert_eq!(hit.first_value("title"), Some(&json!("T")));
        assert_eq!(hit.first_value("empty"), None);
        assert_eq!(hit.first_value("missing"), None);
    }

    #[test]
    fn hits_drain_in_order_once() {
        let mut results: Box<dyn SearchResultSet> = Box::new(VecResultSet::new(
            vec![hit("/a", json!({})), hit("/b", json!({}))],
            7,
            None,
        ));
        let paths: Vec<String> = results.hits().map(|h| h.path().to_string()).collect();
        assert_eq!(paths, vec!["/a", "/b"]);
        assert_eq!(results.hits().count(), 0);
        assert_eq!(results.size(), 7);
    }

    #[test]
    fn facet_json_shape() {
        let facet = FacetField {
            name: "type".to_string(),
            values: vec![
                FacetCount { value: "doc".to_string(), count: 3 },
                FacetCount { value: "img".to_string(), count: 1 },
            ],
        };
        assert_eq!(facet.to_json(), json!({"type": [{"doc": 3}, {"img": 1}]}));
    }
}
