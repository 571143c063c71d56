//! External collaborator seams.
//!
//! The engine consumes two process-wide services, constructed once at startup
//! and shared read-only across concurrent queries: the lexical text index and
//! the embedding model. Both are injected as trait objects so the pipeline
//! never depends on a concrete store or model.

use crate::error::{EmbedError, RetrieveError};
use crate::filter::Predicate;
use crate::movie::MovieRecord;
use async_trait::async_trait;

/// A lexically-recalled candidate: the stored record plus the store's raw
/// relevance score. The score is opaque and store-defined; the engine assumes
/// only that higher is better within one retrieval call.
#[derive(Debug, Clone)]
pub struct LexicalHit {
    pub record: MovieRecord,
    pub score: f32,
}

/// The external text index (inverted index + stored vectors).
///
/// Implementations must tolerate concurrent read access from many in-flight
/// queries and should bound each call with a timeout, reported as
/// [`RetrieveError::Timeout`].
#[async_trait]
pub trait LexicalIndex: Send + Sync {
    /// Multi-field keyword query with per-field boosts and optional
    /// edit-distance tolerance, constrained by `predicates`.
    ///
    /// Returns up to `limit` hits ordered by descending store relevance.
    async fn retrieve(
        &self,
        text: &str,
        predicates: &[Predicate],
        fields: &[(&str, f32)],
        fuzzy: bool,
        limit: usize,
    ) -> Result<Vec<LexicalHit>, RetrieveError>;

    /// Every record passing `predicates`, for corpus-wide semantic scoring.
    /// Order is unspecified.
    async fn scan(&self, predicates: &[Predicate]) -> Result<Vec<MovieRecord>, RetrieveError>;

    /// Single record by identifier; `None` when absent.
    async fn fetch(&self, id: &str) -> Result<Option<MovieRecord>, RetrieveError>;
}

/// The external text-to-vector embedding model.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Maps query text to a vector of [`dimension`](Self::dimension) length.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError>;

    /// Fixed output dimensionality of this provider.
    fn dimension(&self) -> usize;
}
