//! Vector scoring.
//!
//! Cosine similarity between the query embedding and a candidate's stored
//! embedding, remapped from the natural `[-1, 1]` range onto `[0, 1]` via
//! `(cos + 1) / 2` so it is directly comparable with a normalized lexical
//! score.

use crate::movie::MovieRecord;

/// Cosine similarity of two equal-length vectors.
///
/// Defined as `0.0` when either magnitude is zero.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Remaps a cosine value from `[-1, 1]` onto `[0, 1]`.
pub fn unit_interval(cosine: f32) -> f32 {
    ((cosine + 1.0) / 2.0).clamp(0.0, 1.0)
}

/// Scores one candidate against the query embedding.
///
/// Returns `None` when the candidate has no stored embedding or its length
/// does not match the query's: a per-candidate scoring skip, never fatal to
/// the batch. Skipped candidates are dropped from the fused set rather than
/// defaulted to zero, which would unfairly penalize them against candidates
/// that were never considered.
pub fn vector_score(query: &[f32], record: &MovieRecord) -> Option<f32> {
    let embedding = record.embedding.as_deref()?;
    if embedding.len() != query.len() {
        tracing::debug!(
            id = record.id.as_deref().unwrap_or(""),
            expected = query.len(),
            got = embedding.len(),
            "embedding dimension mismatch, candidate skipped"
        );
        return None;
    }
    Some(unit_interval(cosine_similarity(query, embedding)))
}
