//! cinesearch-server — HTTP server for cinesearch.
//!
//! Provides the REST API and the concrete clients for the external index and
//! embedding services. The retrieval and fusion pipeline lives in
//! `cinesearch-core`.

/// REST API layer: Axum router, HTTP handlers, models, metrics.
pub mod api;
/// HTTP client for the external text-to-vector embedding service.
pub mod embedder;
/// HTTP client for the external search index.
pub mod index;
