//! HTTP client for the external search index.
//!
//! Implements [`LexicalIndex`] against an Elasticsearch-compatible REST API:
//! `_search` with a `bool` query (weighted `multi_match` recall plus compiled
//! filter clauses) and `_doc` for single-record lookup. The client is built
//! once at startup and shared across all in-flight queries.

use async_trait::async_trait;
use cinesearch_core::config;
use cinesearch_core::error::RetrieveError;
use cinesearch_core::filter::Predicate;
use cinesearch_core::movie::MovieRecord;
use cinesearch_core::retrieve::{LexicalHit, LexicalIndex};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

pub struct ElasticIndex {
    client: reqwest::Client,
    base_url: String,
    index: String,
    scan_page_size: usize,
}

#[derive(Deserialize)]
struct SearchResponse {
    hits: HitsEnvelope,
}

#[derive(Deserialize)]
struct HitsEnvelope {
    hits: Vec<Hit>,
}

#[derive(Deserialize)]
struct Hit {
    #[serde(rename = "_score")]
    score: Option<f64>,
    #[serde(rename = "_source")]
    source: MovieRecord,
    /// Sort values echoed by the store, used as the scan pagination cursor.
    #[serde(default)]
    sort: Option<Value>,
}

#[derive(Deserialize)]
struct DocResponse {
    found: bool,
    #[serde(rename = "_source", default)]
    source: Option<MovieRecord>,
}

impl ElasticIndex {
    /// Builds the client. `api_key`, when set, is sent as an `ApiKey`
    /// authorization header on every request.
    pub fn new(
        base_url: &str,
        index: &str,
        api_key: Option<&str>,
    ) -> Result<Self, RetrieveError> {
        let mut headers = reqwest::header::HeaderMap::new();
        if let Some(key) = api_key {
            let value = reqwest::header::HeaderValue::from_str(&format!("ApiKey {key}"))
                .map_err(|e| RetrieveError::Transport(format!("invalid API key: {e}")))?;
            headers.insert(reqwest::header::AUTHORIZATION, value);
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config::EXTERNAL_CALL_TIMEOUT_SECS))
            .default_headers(headers)
            .build()
            .map_err(|e| RetrieveError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            index: index.to_string(),
            scan_page_size: config::SCAN_PAGE_SIZE,
        })
    }

    /// Startup reachability check against the index.
    pub async fn ping(&self) -> Result<(), RetrieveError> {
        let url = format!("{}/{}/_count", self.base_url, self.index);
        let response = self.client.get(&url).send().await.map_err(map_reqwest)?;
        if !response.status().is_success() {
            return Err(RetrieveError::Transport(format!(
                "index ping returned {}",
                response.status()
            )));
        }
        Ok(())
    }

    async fn search(&self, body: Value) -> Result<SearchResponse, RetrieveError> {
        let url = format!("{}/{}/_search", self.base_url, self.index);
        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(map_reqwest)?;
        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(RetrieveError::Transport(format!(
                "search returned {status}: {detail}"
            )));
        }
        response
            .json::<SearchResponse>()
            .await
            .map_err(|e| RetrieveError::Decode(e.to_string()))
    }
}

#[async_trait]
impl LexicalIndex for ElasticIndex {
    async fn retrieve(
        &self,
        text: &str,
        predicates: &[Predicate],
        fields: &[(&str, f32)],
        fuzzy: bool,
        limit: usize,
    ) -> Result<Vec<LexicalHit>, RetrieveError> {
        let mut multi_match = json!({
            "query": text,
            "fields": boosted_fields(fields),
        });
        if fuzzy {
            multi_match["fuzziness"] = json!("AUTO");
        }
        let body = json!({
            "size": limit,
            "query": {
                "bool": {
                    "must": [{ "multi_match": multi_match }],
                    "filter": filter_clauses(predicates),
                }
            }
        });

        let response = self.search(body).await?;
        Ok(response
            .hits
            .hits
            .into_iter()
            .map(|hit| LexicalHit {
                record: hit.source,
                score: hit.score.unwrap_or(0.0) as f32,
            })
            .collect())
    }

    /// Pages through the whole filtered corpus with a `search_after` cursor
    /// sorted on the `id` keyword, so semantic scoring sees every record, not
    /// one result window.
    async fn scan(&self, predicates: &[Predicate]) -> Result<Vec<MovieRecord>, RetrieveError> {
        let mut records = Vec::new();
        let mut cursor: Option<Value> = None;
        loop {
            let mut body = json!({
                "size": self.scan_page_size,
                "query": {
                    "bool": {
                        "must": [{ "match_all": {} }],
                        "filter": filter_clauses(predicates),
                    }
                },
                "sort": [{ "id": "asc" }],
            });
            if let Some(after) = cursor.take() {
                body["search_after"] = after;
            }

            let response = self.search(body).await?;
            let page = response.hits.hits;
            let full_page = page.len() == self.scan_page_size;
            cursor = page.last().and_then(|hit| hit.sort.clone());
            records.extend(page.into_iter().map(|hit| hit.source));

            if !full_page {
                break;
            }
            if cursor.is_none() {
                tracing::warn!(
                    fetched = records.len(),
                    "store returned no sort cursor, corpus scan truncated"
                );
                break;
            }
        }
        Ok(records)
    }

    async fn fetch(&self, id: &str) -> Result<Option<MovieRecord>, RetrieveError> {
        let url = format!("{}/{}/_doc/{}", self.base_url, self.index, id);
        let response = self.client.get(&url).send().await.map_err(map_reqwest)?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let status = response.status();
        if !status.is_success() {
            return Err(RetrieveError::Transport(format!(
                "fetch returned {status}"
            )));
        }
        let doc = response
            .json::<DocResponse>()
            .await
            .map_err(|e| RetrieveError::Decode(e.to_string()))?;
        Ok(doc.found.then_some(doc.source).flatten())
    }
}

fn map_reqwest(error: reqwest::Error) -> RetrieveError {
    if error.is_timeout() {
        RetrieveError::Timeout(Duration::from_secs(config::EXTERNAL_CALL_TIMEOUT_SECS))
    } else {
        RetrieveError::Transport(error.to_string())
    }
}

/// Formats `(field, weight)` pairs as the store's caret-boost syntax,
/// e.g. `"title^3"`. Unboosted fields are passed bare.
fn boosted_fields(fields: &[(&str, f32)]) -> Vec<String> {
    fields
        .iter()
        .map(|(name, weight)| {
            if (*weight - 1.0).abs() < f32::EPSILON {
                (*name).to_string()
            } else {
                format!("{name}^{weight}")
            }
        })
        .collect()
}

/// Compiled predicates to store filter clauses. `AllOf` expands to one
/// `match_phrase` clause per phrase so every phrase must match.
fn filter_clauses(predicates: &[Predicate]) -> Vec<Value> {
    let mut clauses = Vec::new();
    for predicate in predicates {
        match predicate {
            Predicate::Term { field, value } => {
                clauses.push(json!({ "term": { field: value } }));
            }
            Predicate::AnyOf { field, values } => {
                clauses.push(json!({ "terms": { field: values } }));
            }
            Predicate::AllOf { field, phrases } => {
                for phrase in phrases {
                    clauses.push(json!({ "match_phrase": { field: phrase } }));
                }
            }
            Predicate::Range { field, min, max } => {
                let mut bounds = serde_json::Map::new();
                if let Some(min) = min {
                    bounds.insert("gte".to_string(), json!(min));
                }
                if let Some(max) = max {
                    bounds.insert("lte".to_string(), json!(max));
                }
                clauses.push(json!({ "range": { field: bounds } }));
            }
        }
    }
    clauses
}
