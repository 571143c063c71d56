//! The search engine: hybrid, semantic, and keyword query pipelines.
//!
//! Each query is one linear pass — compile filters, recall, score, fuse,
//! assemble — over shared read-only service handles. A failed store call
//! degrades to an empty result (with a warning) unless the query asks for
//! failure visibility; only embedding-service failure, which leaves hybrid and
//! semantic modes without a query vector, propagates as an error.

use crate::config;
use crate::error::SearchError;
use crate::filter::{self, FilterSpec};
use crate::fusion::{self, Candidate, Weights};
use crate::movie::Movie;
use crate::retrieve::{EmbeddingProvider, LexicalHit, LexicalIndex};
use crate::score;
use ordered_float::OrderedFloat;
use std::cmp::Reverse;
use std::sync::Arc;

/// A fully-resolved search query.
#[derive(Debug, Clone)]
pub struct QuerySpec {
    /// Free-text query.
    pub text: String,
    /// Requested result size.
    pub size: usize,
    /// Minimum similarity floor, honored by semantic mode.
    pub min_score: f32,
    /// Structured filters, compiled to predicates per query.
    pub filters: FilterSpec,
    /// Fusion weights, used by hybrid mode.
    pub weights: Weights,
    /// When set, a failed store call surfaces as an error instead of an
    /// empty result.
    pub strict: bool,
}

impl QuerySpec {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            size: config::DEFAULT_SIZE,
            min_score: 0.0,
            filters: FilterSpec::new(),
            weights: Weights::default(),
            strict: false,
        }
    }
}

/// Size of the lexical recall pool for a hybrid query.
///
/// Over-fetches three candidates per requested result so the vector rerank has
/// room to reorder, capped so worst-case scoring cost stays bounded.
pub fn overfetch_limit(requested: usize) -> usize {
    requested
        .saturating_mul(config::OVERFETCH_MULTIPLIER)
        .min(config::OVERFETCH_CAP)
}

/// Hybrid retrieval engine over injected service handles.
///
/// Both handles are process-wide, constructed once at startup, and shared
/// read-only across concurrent queries.
pub struct SearchEngine {
    index: Arc<dyn LexicalIndex>,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl SearchEngine {
    pub fn new(index: Arc<dyn LexicalIndex>, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self { index, embedder }
    }

    /// Hybrid search: over-fetching lexical recall, per-candidate vector
    /// scoring, weighted fusion, truncation.
    pub async fn hybrid(&self, query: &QuerySpec) -> Result<Vec<Movie>, SearchError> {
        let predicates = filter::compile(&query.filters);
        let limit = overfetch_limit(query.size);

        let pool = match self
            .index
            .retrieve(
                &query.text,
                &predicates,
                config::LEXICAL_FIELD_WEIGHTS,
                true,
                limit,
            )
            .await
        {
            Ok(hits) => hits,
            Err(e) => return recover_retrieval(e, query.strict),
        };
        if pool.is_empty() {
            return Ok(Vec::new());
        }

        let query_vector = self.query_vector(&query.text).await?;

        // Candidates without a usable embedding are dropped, not zeroed.
        let candidates: Vec<Candidate> = pool
            .into_iter()
            .filter_map(|LexicalHit { record, score: raw }| {
                score::vector_score(&query_vector, &record)
                    .map(|vector| Candidate::new(record, raw, vector))
            })
            .collect();

        let fused = fusion::fuse(candidates, query.weights, query.size);
        Ok(fused
            .into_iter()
            .map(|c| Movie::from_record(&c.record, c.combined))
            .collect())
    }

    /// Pure semantic search: scores the entire filtered corpus by cosine
    /// similarity, honoring the caller's minimum-score floor. No overfetch.
    pub async fn semantic(&self, query: &QuerySpec) -> Result<Vec<Movie>, SearchError> {
        let predicates = filter::compile(&query.filters);
        let query_vector = self.query_vector(&query.text).await?;

        let corpus = match self.index.scan(&predicates).await {
            Ok(records) => records,
            Err(e) => return recover_retrieval(e, query.strict),
        };

        let mut scored: Vec<(crate::movie::MovieRecord, f32)> = corpus
            .into_iter()
            .filter_map(|record| {
                score::vector_score(&query_vector, &record).map(|s| (record, s))
            })
            .filter(|(_, s)| *s >= query.min_score)
            .collect();
        scored.sort_by_key(|(_, s)| Reverse(OrderedFloat(*s)));
        scored.truncate(query.size);

        Ok(scored
            .into_iter()
            .map(|(record, s)| Movie::from_record(&record, s))
            .collect())
    }

    /// Embeds the query text, checking the answer against the provider's
    /// declared dimensionality. A mismatch means the process is wired to the
    /// wrong model and every candidate would be skipped, so it surfaces as a
    /// configuration error rather than an empty result.
    async fn query_vector(&self, text: &str) -> Result<Vec<f32>, SearchError> {
        let vector = self.embedder.embed(text).await?;
        let expected = self.embedder.dimension();
        if vector.len() != expected {
            return Err(SearchError::Configuration(format!(
                "embedder produced a {}-dimensional vector, configured for {expected}",
                vector.len()
            )));
        }
        Ok(vector)
    }

    /// Pure keyword search: exactly `size` store-ranked hits, no vector
    /// scoring, exposing the store's raw relevance score.
    pub async fn keyword(&self, query: &QuerySpec) -> Result<Vec<Movie>, SearchError> {
        let predicates = filter::compile(&query.filters);

        let hits = match self
            .index
            .retrieve(
                &query.text,
                &predicates,
                config::LEXICAL_FIELD_WEIGHTS,
                true,
                query.size,
            )
            .await
        {
            Ok(hits) => hits,
            Err(e) => return recover_retrieval(e, query.strict),
        };

        Ok(hits
            .into_iter()
            .map(|hit| Movie::from_record(&hit.record, hit.score))
            .collect())
    }

    /// Single movie by identifier. `None` when absent or when the store call
    /// fails non-strictly.
    pub async fn movie_by_id(&self, id: &str) -> Result<Option<Movie>, SearchError> {
        match self.index.fetch(id).await {
            Ok(record) => Ok(record.map(|r| Movie::from_record(&r, 1.0))),
            Err(e) => {
                tracing::warn!(error = %e, id, "fetch failed, reporting not found");
                Ok(None)
            }
        }
    }
}

/// Maps a per-query store failure to the documented degraded behavior:
/// an empty result with a warning, unless the caller asked for visibility.
fn recover_retrieval(
    error: crate::error::RetrieveError,
    strict: bool,
) -> Result<Vec<Movie>, SearchError> {
    if strict {
        return Err(error.into());
    }
    tracing::warn!(error = %error, "lexical retrieval failed, degrading to empty result");
    Ok(Vec::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{EmbedError, RetrieveError};
    use crate::filter::Predicate;
    use crate::movie::MovieRecord;
    use async_trait::async_trait;
    use std::collections::BTreeMap;
    use std::time::Duration;

    /// In-memory stand-in for the external index: token matching with
    /// edit-distance tolerance across the weighted fields, predicate
    /// filtering, descending stable order.
    struct MemoryIndex {
        records: Vec<MovieRecord>,
    }

    #[async_trait]
    impl LexicalIndex for MemoryIndex {
        async fn retrieve(
            &self,
            text: &str,
            predicates: &[Predicate],
            fields: &[(&str, f32)],
            fuzzy: bool,
            limit: usize,
        ) -> Result<Vec<LexicalHit>, RetrieveError> {
            let mut hits: Vec<LexicalHit> = self
                .records
                .iter()
                .filter(|r| predicates.iter().all(|p| p.matches(r)))
                .filter_map(|r| {
                    let score = lexical_score(text, r, fields, fuzzy);
                    (score > 0.0).then(|| LexicalHit {
                        record: r.clone(),
                        score,
                    })
                })
                .collect();
            hits.sort_by_key(|h| Reverse(OrderedFloat(h.score)));
            hits.truncate(limit);
            Ok(hits)
        }

        async fn scan(
            &self,
            predicates: &[Predicate],
        ) -> Result<Vec<MovieRecord>, RetrieveError> {
            Ok(self
                .records
                .iter()
                .filter(|r| predicates.iter().all(|p| p.matches(r)))
                .cloned()
                .collect())
        }

        async fn fetch(&self, id: &str) -> Result<Option<MovieRecord>, RetrieveError> {
            Ok(self
                .records
                .iter()
                .find(|r| r.id.as_deref() == Some(id))
                .cloned())
        }
    }

    /// Index whose every call fails, for degraded-path tests.
    struct BrokenIndex;

    #[async_trait]
    impl LexicalIndex for BrokenIndex {
        async fn retrieve(
            &self,
            _: &str,
            _: &[Predicate],
            _: &[(&str, f32)],
            _: bool,
            _: usize,
        ) -> Result<Vec<LexicalHit>, RetrieveError> {
            Err(RetrieveError::Timeout(Duration::from_secs(10)))
        }

        async fn scan(&self, _: &[Predicate]) -> Result<Vec<MovieRecord>, RetrieveError> {
            Err(RetrieveError::Transport("connection refused".to_string()))
        }

        async fn fetch(&self, _: &str) -> Result<Option<MovieRecord>, RetrieveError> {
            Err(RetrieveError::Transport("connection refused".to_string()))
        }
    }

    /// Embedder returning a fixed vector per known text, a zero vector
    /// otherwise.
    struct StubEmbedder {
        known: BTreeMap<String, Vec<f32>>,
        dimension: usize,
    }

    #[async_trait]
    impl EmbeddingProvider for StubEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
            Ok(self
                .known
                .get(text)
                .cloned()
                .unwrap_or_else(|| vec![0.0; self.dimension]))
        }

        fn dimension(&self) -> usize {
            self.dimension
        }
    }

    /// Embedder whose output length contradicts its declared dimension.
    struct MiswiredEmbedder;

    #[async_trait]
    impl EmbeddingProvider for MiswiredEmbedder {
        async fn embed(&self, _: &str) -> Result<Vec<f32>, EmbedError> {
            Ok(vec![1.0, 0.0])
        }

        fn dimension(&self) -> usize {
            3
        }
    }

    struct DownEmbedder;

    #[async_trait]
    impl EmbeddingProvider for DownEmbedder {
        async fn embed(&self, _: &str) -> Result<Vec<f32>, EmbedError> {
            Err(EmbedError::Unavailable("connection refused".to_string()))
        }

        fn dimension(&self) -> usize {
            3
        }
    }

    fn lexical_score(query: &str, record: &MovieRecord, fields: &[(&str, f32)], fuzzy: bool) -> f32 {
        let query_tokens: Vec<String> = tokenize(query);
        let mut score = 0.0;
        for (field, weight) in fields {
            let Some(text) = record.text_field(field) else {
                continue;
            };
            let field_tokens = tokenize(text);
            for q in &query_tokens {
                if field_tokens.iter().any(|t| token_matches(q, t, fuzzy)) {
                    score += weight;
                }
            }
        }
        score
    }

    fn tokenize(text: &str) -> Vec<String> {
        text.split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .map(str::to_lowercase)
            .collect()
    }

    /// AUTO-style tolerance: short tokens exact, mid-length one edit,
    /// long tokens two.
    fn token_matches(a: &str, b: &str, fuzzy: bool) -> bool {
        if a == b {
            return true;
        }
        if !fuzzy {
            return false;
        }
        let allowed = match a.chars().count() {
            0..=2 => 0,
            3..=5 => 1,
            _ => 2,
        };
        edit_distance(a, b) <= allowed
    }

    fn edit_distance(a: &str, b: &str) -> usize {
        let a: Vec<char> = a.chars().collect();
        let b: Vec<char> = b.chars().collect();
        let mut prev: Vec<usize> = (0..=b.len()).collect();
        for (i, ca) in a.iter().enumerate() {
            let mut current = vec![i + 1];
            for (j, cb) in b.iter().enumerate() {
                let substitution = prev[j] + usize::from(ca != cb);
                current.push(substitution.min(prev[j + 1] + 1).min(current[j] + 1));
            }
            prev = current;
        }
        prev[b.len()]
    }

    fn movie(id: &str, title: &str, genres: &str, embedding: Vec<f32>) -> MovieRecord {
        MovieRecord {
            id: Some(id.to_string()),
            title: Some(title.to_string()),
            genres: Some(genres.to_string()),
            embedding: Some(embedding),
            ..MovieRecord::default()
        }
    }

    fn catalog() -> Vec<MovieRecord> {
        vec![
            movie("1", "Mission Impossible", "Action, Thriller", vec![1.0, 0.0, 0.0]),
            movie("2", "The Matrix", "Action, Sci-Fi", vec![0.0, 1.0, 0.0]),
            movie("3", "Blade Runner", "Sci-Fi", vec![0.0, 0.9, 0.1]),
            movie("4", "Mission to Mars", "Sci-Fi", vec![0.2, 0.8, 0.0]),
        ]
    }

    fn engine_with(records: Vec<MovieRecord>) -> SearchEngine {
        let known = BTreeMap::from([
            ("dystopian future".to_string(), vec![0.0, 1.0, 0.0]),
            ("spy thriller".to_string(), vec![1.0, 0.0, 0.0]),
            ("mission to mars".to_string(), vec![0.2, 0.8, 0.0]),
        ]);
        SearchEngine::new(
            Arc::new(MemoryIndex { records }),
            Arc::new(StubEmbedder {
                known,
                dimension: 3,
            }),
        )
    }

    fn ids(movies: &[Movie]) -> Vec<&str> {
        movies.iter().map(|m| m.id.as_str()).collect()
    }

    #[test]
    fn test_overfetch_rule() {
        assert_eq!(overfetch_limit(10), 30);
        assert_eq!(overfetch_limit(40), 100);
        assert_eq!(overfetch_limit(0), 0);
    }

    #[tokio::test]
    async fn test_misspelled_query_still_recalls() {
        let engine = engine_with(catalog());
        let query = QuerySpec::new("Mission Imposible");
        let results = engine.keyword(&query).await.unwrap();
        assert!(
            ids(&results).contains(&"1"),
            "fuzzy recall should find Mission Impossible, got {:?}",
            ids(&results)
        );
    }

    #[tokio::test]
    async fn test_hybrid_lexical_only_weights_match_keyword_order() {
        let engine = engine_with(catalog());
        let mut query = QuerySpec::new("mission");
        query.size = 2;
        query.weights = Weights {
            lexical: 1.0,
            vector: 0.0,
        };
        let hybrid = engine.hybrid(&query).await.unwrap();
        let keyword = engine.keyword(&query).await.unwrap();
        assert_eq!(ids(&hybrid), ids(&keyword));
    }

    #[tokio::test]
    async fn test_semantic_ranks_by_embedding_proximity() {
        let engine = engine_with(catalog());
        let query = QuerySpec::new("dystopian future");
        let results = engine.semantic(&query).await.unwrap();
        assert_eq!(ids(&results)[0], "2", "closest embedding should rank first");
    }

    #[tokio::test]
    async fn test_hybrid_vector_signal_reorders_pool() {
        let engine = engine_with(catalog());
        // Both "Mission" titles recall; with vector-only weights the record
        // whose embedding is nearest the query must rank first.
        let mut query = QuerySpec::new("mission to mars");
        query.weights = Weights {
            lexical: 0.0,
            vector: 1.0,
        };
        let results = engine.hybrid(&query).await.unwrap();
        assert_eq!(ids(&results)[0], "4");
    }

    #[tokio::test]
    async fn test_hybrid_empty_pool_is_empty_result() {
        let engine = engine_with(catalog());
        let query = QuerySpec::new("zzzzzzzz");
        let results = engine.hybrid(&query).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_hybrid_drops_candidates_without_embedding() {
        let mut records = catalog();
        records.push(MovieRecord {
            id: Some("5".to_string()),
            title: Some("Mission Unembeddable".to_string()),
            ..MovieRecord::default()
        });
        let engine = engine_with(records);
        let query = QuerySpec::new("mission");
        let results = engine.hybrid(&query).await.unwrap();
        assert!(!ids(&results).contains(&"5"));
        assert!(ids(&results).contains(&"1"));
    }

    #[tokio::test]
    async fn test_genre_filter_is_conjunctive_in_pipeline() {
        let engine = engine_with(catalog());
        let mut query = QuerySpec::new("action");
        query.filters = serde_json::from_value(
            serde_json::json!({"genres": ["Action", "Sci-Fi"]}),
        )
        .unwrap();
        let results = engine.keyword(&query).await.unwrap();
        assert_eq!(ids(&results), vec!["2"]);
    }

    #[tokio::test]
    async fn test_semantic_min_score_floor() {
        let engine = engine_with(catalog());
        let mut query = QuerySpec::new("spy thriller");
        query.min_score = 0.9;
        let results = engine.semantic(&query).await.unwrap();
        // Only the aligned embedding clears the floor.
        assert_eq!(ids(&results), vec!["1"]);
        assert!(results[0].score >= 0.9);
    }

    #[tokio::test]
    async fn test_retrieval_failure_degrades_to_empty() {
        let engine = SearchEngine::new(
            Arc::new(BrokenIndex),
            Arc::new(StubEmbedder {
                known: BTreeMap::new(),
                dimension: 3,
            }),
        );
        let query = QuerySpec::new("anything");
        assert!(engine.hybrid(&query).await.unwrap().is_empty());
        assert!(engine.keyword(&query).await.unwrap().is_empty());
        assert!(engine.semantic(&query).await.unwrap().is_empty());
        assert!(engine.movie_by_id("1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_strict_query_surfaces_retrieval_failure() {
        let engine = SearchEngine::new(
            Arc::new(BrokenIndex),
            Arc::new(StubEmbedder {
                known: BTreeMap::new(),
                dimension: 3,
            }),
        );
        let mut query = QuerySpec::new("anything");
        query.strict = true;
        assert!(matches!(
            engine.hybrid(&query).await,
            Err(SearchError::Retrieval(_))
        ));
    }

    #[tokio::test]
    async fn test_embedder_failure_is_an_error() {
        let engine = SearchEngine::new(
            Arc::new(MemoryIndex { records: catalog() }),
            Arc::new(DownEmbedder),
        );
        let query = QuerySpec::new("mission");
        assert!(matches!(
            engine.hybrid(&query).await,
            Err(SearchError::Embedding(_))
        ));
        // Keyword mode never embeds, so it is unaffected.
        assert!(!engine.keyword(&query).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_dimension_mismatch_is_a_configuration_error() {
        let engine = SearchEngine::new(
            Arc::new(MemoryIndex { records: catalog() }),
            Arc::new(MiswiredEmbedder),
        );
        let query = QuerySpec::new("mission");
        assert!(matches!(
            engine.hybrid(&query).await,
            Err(SearchError::Configuration(_))
        ));
        assert!(matches!(
            engine.semantic(&query).await,
            Err(SearchError::Configuration(_))
        ));
    }

    #[tokio::test]
    async fn test_movie_by_id() {
        let engine = engine_with(catalog());
        let found = engine.movie_by_id("2").await.unwrap().unwrap();
        assert_eq!(found.title, "The Matrix");
        assert_eq!(found.score, 1.0);
        assert!(engine.movie_by_id("999").await.unwrap().is_none());
    }
}
