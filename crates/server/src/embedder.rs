//! HTTP client for the external text-to-vector embedding service.
//!
//! Implements [`EmbeddingProvider`] against a text-embeddings-inference-style
//! REST API: `POST /embed` with `{"inputs": [text]}` answering a batch of
//! vectors. The configured dimension is checked against the first embedding at
//! startup so a model mismatch fails fast instead of silently skipping every
//! candidate.

use async_trait::async_trait;
use cinesearch_core::config;
use cinesearch_core::error::EmbedError;
use cinesearch_core::retrieve::EmbeddingProvider;
use serde_json::json;
use std::time::Duration;

pub struct HttpEmbedder {
    client: reqwest::Client,
    base_url: String,
    dimension: usize,
}

impl HttpEmbedder {
    pub fn new(base_url: &str, dimension: usize) -> Result<Self, EmbedError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config::EXTERNAL_CALL_TIMEOUT_SECS))
            .build()
            .map_err(|e| EmbedError::Unavailable(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            dimension,
        })
    }

    /// Startup check: embeds a probe string and verifies the answer has the
    /// configured dimension.
    pub async fn verify(&self) -> Result<(), EmbedError> {
        let probe = self.embed("startup probe").await?;
        if probe.len() != self.dimension {
            return Err(EmbedError::Failed(format!(
                "model produces {}-dimensional embeddings, configured for {}",
                probe.len(),
                self.dimension
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl EmbeddingProvider for HttpEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        let url = format!("{}/embed", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&json!({ "inputs": [text] }))
            .send()
            .await
            .map_err(|e| EmbedError::Unavailable(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(EmbedError::Failed(format!(
                "embed returned {status}: {detail}"
            )));
        }
        let mut batch: Vec<Vec<f32>> = response
            .json()
            .await
            .map_err(|e| EmbedError::Failed(format!("malformed embed response: {e}")))?;
        match batch.len() {
            1 => Ok(batch.remove(0)),
            n => Err(EmbedError::Failed(format!(
                "expected one embedding, got {n}"
            ))),
        }
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}
