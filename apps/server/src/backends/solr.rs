//! Backend speaking the Solr `select` HTTP API.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::config::HttpMethod;
use crate::search::executor::{BackendRequest, SearchBackend};
use crate::search::result::{FacetCount, FacetField, SearchHit, SearchResultSet, VecResultSet};
use crate::search::{Result, SearchError};

pub struct SolrBackend {
    client: reqwest::Client,
    select_url: url::Url,
    method: HttpMethod,
}

impl SolrBackend {
    /// `base_url` is the Solr root (e.g. `http://localhost:8983/solr`).
    pub fn new(base_url: &str, core: &str, method: HttpMethod, timeout: Duration) -> Result<Self> {
        let mut select_url = url::Url::parse(base_url).map_err(|e| {
            SearchError::Configuration(format!("invalid Solr URL {base_url:?}: {e}"))
        })?;
        select_url
            .path_segments_mut()
            .map_err(|_| SearchError::Configuration(format!("Solr URL {base_url:?} cannot be a base")))?
            .pop_if_empty()
            .extend([core, "select"]);

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SearchError::Configuration(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            select_url,
            method,
        })
    }

    pub fn select_url(&self) -> &url::Url {
        &self.select_url
    }
}

/// Request parameters in the order Solr receives them.
pub fn select_params(request: &BackendRequest) -> Vec<(String, String)> {
    let mut params = vec![
        ("q".to_string(), request.query.clone()),
        ("start".to_string(), request.start.to_string()),
        ("rows".to_string(), request.rows.to_string()),
        ("wt".to_string(), "json".to_string()),
    ];
    if !request.sort.is_empty() {
        let sort = request
            .sort
            .iter()
            .map(|s| s.clause())
            .collect::<Vec<_>>()
            .join(",");
        params.push(("sort".to_string(), sort));
    }
    params.extend(request.params.iter().cloned());
    params
}

#[derive(Debug, Deserialize)]
struct SelectResponse {
    response: Option<SelectDocuments>,
    facet_counts: Option<FacetCounts>,
}

#[derive(Debug, Deserialize)]
struct SelectDocuments {
    #[serde(rename = "numFound")]
    num_found: u64,
    #[serde(default)]
    docs: Vec<Map<String, Value>>,
}

#[derive(Debug, Deserialize)]
struct FacetCounts {
    #[serde(default)]
    facet_fields: Map<String, Value>,
}

/// Map a `wt=json` select response into a result set.
pub fn parse_select_response(body: &[u8]) -> Result<VecResultSet> {
    let parsed: SelectResponse = serde_json::from_slice(body)
        .map_err(|e| SearchError::execution(format!("unreadable Solr response: {e}")))?;

    let (hits, total) = match parsed.response {
        Some(documents) => {
            let hits = documents
                .docs
                .into_iter()
                .map(|doc| {
                    let path = ["path", "id"]
                        .iter()
                        .find_map(|key| doc.get(*key).and_then(Value::as_str))
                        .unwrap_or_default()
                        .to_string();
                    SearchHit::new(path, doc)
                })
                .collect();
            (hits, documents.num_found)
        }
        None => (Vec::new(), 0),
    };

    let facets = parsed.facet_counts.map(|counts| {
        counts
            .facet_fields
            .into_iter()
            .map(|(name, flat)| FacetField {
                name,
                values: flat_facet_values(&flat),
            })
            .collect()
    });

    Ok(VecResultSet::new(hits, total, facets))
}

/// Solr lists facet counts flat: `[value, count, value, count, ...]`.
fn flat_facet_values(flat: &Value) -> Vec<FacetCount> {
    let Some(items) = flat.as_array() else {
        return Vec::new();
    };
    items
        .chunks_exact(2)
        .filter_map(|pair| {
            let value = match &pair[0] {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            Some(FacetCount {
                value,
                count: pair[1].as_u64()?,
            })
        })
        .collect()
}

#[async_trait]
impl SearchBackend for SolrBackend {
    fn name(&self) -> &'static str {
        "solr"
    }

    async fn query(&self, request: &BackendRequest) -> Result<Box<dyn SearchResultSet>> {
        let params = select_params(request);
        let builder = match self.method {
            HttpMethod::Get => self.client.get(self.select_url.clone()).query(&params),
            HttpMethod::Post => self.client.post(self.select_url.clone()).form(&params),
        };

        let response = builder.send().await.map_err(|e| SearchError::Execution {
            status: e.status().map(|s| s.as_u16()),
            message: format!("Solr request failed: {e}"),
        })?;

        let status = response.status();
        let body = response.bytes().await.map_err(|e| {
            SearchError::execution(format!("Failed to read Solr response: {e}"))
        })?;

        if !status.is_success() {
            let detail = String::from_utf8_lossy(&body);
            tracing::warn!(status = status.as_u16(), body = %detail, "Solr rejected the query");
            return Err(SearchError::execution_with_status(
                status.as_u16(),
                format!("Solr returned {status}"),
            ));
        }

        Ok(Box::new(parse_select_response(&body)?))
    }
}
