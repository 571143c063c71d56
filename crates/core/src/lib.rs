//! # cinesearch-core
//!
//! Hybrid retrieval and fusion engine for the movie catalog: compiles
//! structured filters into retrieval predicates, runs an over-fetching lexical
//! recall pass against an external index, scores candidates by embedding-space
//! cosine similarity, and fuses the two signals into one ranked result list.
//!
//! The text index and the embedding model are external collaborators, consumed
//! through the [`retrieve::LexicalIndex`] and [`retrieve::EmbeddingProvider`]
//! traits. This crate never owns an index.

/// Global configuration constants: defaults, limits, and tuning parameters.
pub mod config;
/// Search engine: hybrid, semantic, and keyword query pipelines.
pub mod engine;
/// Error taxonomy: configuration, retrieval, and embedding failures.
pub mod error;
/// Filter compiler: structured filter specs to retrieval predicates.
pub mod filter;
/// Score fusion: lexical normalization, weighted combination, ranking.
pub mod fusion;
/// Movie record types: stored shape and public result shape.
pub mod movie;
/// External collaborator seams: lexical index and embedding provider traits.
pub mod retrieve;
/// Vector scoring: cosine similarity mapped onto the unit interval.
pub mod score;
