//! Error taxonomy for the retrieval pipeline.
//!
//! Only infrastructure-level failures surface as errors. Per-candidate scoring
//! skips and malformed filter shapes are recovered locally and never reach
//! these types; a failed store call degrades to an empty result unless the
//! caller requests failure visibility.

use std::time::Duration;
use thiserror::Error;

/// Failure of a single call to the external index.
///
/// Recovered per-query as an empty candidate set by default; see
/// [`crate::engine::QuerySpec::strict`] for failure visibility.
#[derive(Debug, Error)]
pub enum RetrieveError {
    /// The store was unreachable or returned a transport-level error.
    #[error("index request failed: {0}")]
    Transport(String),
    /// The store did not answer within the configured deadline.
    #[error("index request timed out after {0:?}")]
    Timeout(Duration),
    /// The store answered with a body this crate could not decode.
    #[error("malformed index response: {0}")]
    Decode(String),
}

/// Failure of a call to the embedding service.
#[derive(Debug, Error)]
pub enum EmbedError {
    /// The embedding service was unreachable.
    #[error("embedding service unavailable: {0}")]
    Unavailable(String),
    /// The service answered but the embedding was unusable.
    #[error("embedding request failed: {0}")]
    Failed(String),
}

/// Top-level error returned by the search engine.
#[derive(Debug, Error)]
pub enum SearchError {
    /// A required collaborator is misconfigured or unreachable at startup.
    /// Fatal: no query processing proceeds.
    #[error("configuration: {0}")]
    Configuration(String),
    /// A per-query store failure, surfaced only on strict queries.
    #[error(transparent)]
    Retrieval(#[from] RetrieveError),
    /// The embedding service failed for this query. Hybrid and semantic modes
    /// cannot proceed without a query vector.
    #[error(transparent)]
    Embedding(#[from] EmbedError),
}
