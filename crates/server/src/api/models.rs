//! Request and response data transfer objects for the REST API.
//!
//! All types derive `Serialize` and/or `Deserialize` for JSON marshalling via
//! Axum. Search responses are bare arrays of the core
//! [`Movie`](cinesearch_core::movie::Movie) shape.

use cinesearch_core::config;
use cinesearch_core::filter::FilterSpec;
use cinesearch_core::fusion::Weights;
use serde::{Deserialize, Serialize};

/// Request body for `POST /api/v1/movies/search` and
/// `POST /api/v1/movies/hybrid-search`.
#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub query: String,
    #[serde(default = "default_size")]
    pub size: usize,
    #[serde(default)]
    pub min_score: f32,
    #[serde(default)]
    pub filters: FilterSpec,
    pub weights: Option<WeightsRequest>,
    /// Surface index failures as errors instead of empty results.
    #[serde(default)]
    pub strict: bool,
}

fn default_size() -> usize {
    config::DEFAULT_SIZE
}

/// Fusion weights as supplied by callers.
///
/// `bm25` is accepted as a legacy alias for `lexical`.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct WeightsRequest {
    #[serde(default = "default_weight", alias = "bm25")]
    pub lexical: f32,
    #[serde(default = "default_weight")]
    pub vector: f32,
}

fn default_weight() -> f32 {
    config::DEFAULT_LEXICAL_WEIGHT
}

impl From<WeightsRequest> for Weights {
    fn from(w: WeightsRequest) -> Self {
        Weights {
            lexical: w.lexical,
            vector: w.vector,
        }
    }
}

/// Query parameters for `GET /api/v1/movies/search`.
#[derive(Debug, Deserialize)]
pub struct KeywordSearchParams {
    pub query: String,
    #[serde(default = "default_size")]
    pub size: usize,
    pub year_min: Option<i64>,
    pub year_max: Option<i64>,
    pub rating_min: Option<f64>,
    /// Comma-separated genre names; all must match.
    pub genres: Option<String>,
}

impl KeywordSearchParams {
    /// Builds the structured filter spec the engine consumes from the flat
    /// query parameters.
    pub fn filters(&self) -> FilterSpec {
        let mut spec = FilterSpec::new();
        if self.year_min.is_some() || self.year_max.is_some() {
            spec.insert(
                "year".to_string(),
                serde_json::from_value(serde_json::json!({
                    "min": self.year_min,
                    "max": self.year_max,
                }))
                .expect("range shape is well-formed"),
            );
        }
        if let Some(rating_min) = self.rating_min {
            spec.insert(
                "vote_average".to_string(),
                serde_json::from_value(serde_json::json!({ "min": rating_min }))
                    .expect("range shape is well-formed"),
            );
        }
        if let Some(ref genres) = self.genres {
            let list: Vec<&str> = genres
                .split(',')
                .map(str::trim)
                .filter(|g| !g.is_empty())
                .collect();
            if !list.is_empty() {
                spec.insert(
                    "genres".to_string(),
                    serde_json::from_value(serde_json::json!(list))
                        .expect("list shape is well-formed"),
                );
            }
        }
        spec
    }
}

/// Response body for `GET /health`.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub index: String,
    pub embedder: String,
    pub uptime_secs: u64,
}
