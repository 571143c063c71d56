//! Global configuration constants for cinesearch.
//!
//! All tuning parameters and defaults are defined here. Runtime configuration
//! (index URL, embedding service URL, port) is handled via CLI arguments and
//! environment variables in the server binary.

/// Default number of results per search request.
pub const DEFAULT_SIZE: usize = 10;

/// Maximum number of results (`size`) per search request.
pub const MAX_SIZE: usize = 1_000;

/// Over-fetch multiplier for the hybrid lexical recall pass.
///
/// The lexical retriever fetches `size * OVERFETCH_MULTIPLIER` candidates so
/// the vector rerank has a meaningful pool to reorder.
pub const OVERFETCH_MULTIPLIER: usize = 3;

/// Upper bound on the hybrid recall pool, regardless of requested size.
///
/// Bounds the worst-case vector scoring cost per query.
pub const OVERFETCH_CAP: usize = 100;

/// Default lexical weight in hybrid fusion.
pub const DEFAULT_LEXICAL_WEIGHT: f32 = 0.5;

/// Default vector weight in hybrid fusion.
pub const DEFAULT_VECTOR_WEIGHT: f32 = 0.5;

/// Default embedding dimensionality (all-MiniLM-class models).
pub const DEFAULT_EMBEDDING_DIM: usize = 384;

/// Field name that triggers conjunctive (AND) list-filter compilation.
///
/// A list filter on any other field is disjunctive (OR). This asymmetry is a
/// documented product policy: a multi-genre filter expresses precise intent
/// ("Action AND Sci-Fi"), not a broad category union.
pub const GENRES_FIELD: &str = "genres";

/// Weighted fields for the lexical multi-field query.
///
/// Title matches count most, overview next, the remaining descriptive fields
/// equally. Weight 1.0 fields are passed unboosted to the store.
pub const LEXICAL_FIELD_WEIGHTS: &[(&str, f32)] = &[
    ("title", 3.0),
    ("overview", 2.0),
    ("genres", 1.0),
    ("tagline", 1.0),
    ("director", 1.0),
    ("cast", 1.0),
];

/// Page size for the pure-semantic corpus scan.
///
/// The scan paginates with a sort cursor until the corpus is exhausted, so
/// this bounds per-call cost, not total recall.
pub const SCAN_PAGE_SIZE: usize = 1_000;

/// Timeout for a single call to the external index or embedding service.
pub const EXTERNAL_CALL_TIMEOUT_SECS: u64 = 10;

/// Default HTTP server port.
pub const DEFAULT_PORT: u16 = 8000;

/// Per-request timeout in seconds.
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Maximum HTTP request body size in bytes (1 MB).
pub const MAX_REQUEST_BODY_BYTES: usize = 1024 * 1024;
