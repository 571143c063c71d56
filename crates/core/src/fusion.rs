//! Score fusion.
//!
//! Normalizes raw lexical scores against the batch maximum, combines them with
//! vector scores under caller-supplied weights, and produces a stable,
//! descending, truncated ranking. Normalization is batch-relative: the store's
//! raw scores have no global scale, so each recall pool is normalized against
//! its own best hit.

use crate::config;
use crate::movie::MovieRecord;
use ordered_float::OrderedFloat;
use serde::Deserialize;
use std::cmp::Reverse;

/// Fusion weights for the lexical and vector signals.
///
/// Weights need not sum to 1; both must be non-negative (enforced at the API
/// boundary via [`Weights::is_valid`]). When both are zero the fusion would be
/// undefined, so [`Weights::resolve`] falls back to the 0.5/0.5 default.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq)]
pub struct Weights {
    pub lexical: f32,
    pub vector: f32,
}

impl Default for Weights {
    fn default() -> Self {
        Self {
            lexical: config::DEFAULT_LEXICAL_WEIGHT,
            vector: config::DEFAULT_VECTOR_WEIGHT,
        }
    }
}

impl Weights {
    /// Both weights finite and non-negative.
    pub fn is_valid(&self) -> bool {
        self.lexical.is_finite()
            && self.vector.is_finite()
            && self.lexical >= 0.0
            && self.vector >= 0.0
    }

    /// Substitutes the documented 0.5/0.5 fallback when both weights are zero.
    pub fn resolve(self) -> Self {
        if self.lexical == 0.0 && self.vector == 0.0 {
            tracing::debug!("both fusion weights zero, falling back to 0.5/0.5");
            Self::default()
        } else {
            self
        }
    }
}

/// A transient per-query candidate carrying both retrieval signals.
///
/// Created for one query and discarded with the response; never persisted.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub record: MovieRecord,
    /// Raw, store-defined lexical relevance score.
    pub lexical_raw: f32,
    /// Cosine-derived vector score, already in `[0, 1]`.
    pub vector: f32,
    /// Fused score, filled in by [`fuse`].
    pub combined: f32,
}

impl Candidate {
    pub fn new(record: MovieRecord, lexical_raw: f32, vector: f32) -> Self {
        Self {
            record,
            lexical_raw,
            vector,
            combined: 0.0,
        }
    }
}

/// Fuses both signals into one ranking.
///
/// Lexical scores are divided by the batch maximum (all zero when the batch is
/// empty or its maximum is zero), combined as
/// `w_lex * normalized_lexical + w_vec * vector`, sorted descending with ties
/// keeping their arrival order, and truncated to `size`. An empty pool fuses
/// to an empty result; a pool smaller than `size` is returned whole.
pub fn fuse(mut candidates: Vec<Candidate>, weights: Weights, size: usize) -> Vec<Candidate> {
    let weights = weights.resolve();
    let max_raw = candidates
        .iter()
        .map(|c| c.lexical_raw)
        .fold(0.0f32, f32::max);

    for candidate in &mut candidates {
        let normalized = if max_raw > 0.0 {
            candidate.lexical_raw / max_raw
        } else {
            0.0
        };
        candidate.combined = weights.lexical * normalized + weights.vector * candidate.vector;
    }

    // Stable sort: equal combined scores keep the lexical retriever's order.
    candidates.sort_by_key(|c| Reverse(OrderedFloat(c.combined)));
    candidates.truncate(size);
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(id: &str, lexical_raw: f32, vector: f32) -> Candidate {
        let record = MovieRecord {
            id: Some(id.to_string()),
            ..MovieRecord::default()
        };
        Candidate::new(record, lexical_raw, vector)
    }

    fn ids(candidates: &[Candidate]) -> Vec<&str> {
        candidates
            .iter()
            .map(|c| c.record.id.as_deref().unwrap_or(""))
            .collect()
    }

    #[test]
    fn test_empty_pool_fuses_to_empty() {
        assert!(fuse(Vec::new(), Weights::default(), 10).is_empty());
    }

    #[test]
    fn test_size_larger_than_pool_returns_pool() {
        let fused = fuse(vec![candidate("a", 1.0, 0.5)], Weights::default(), 10);
        assert_eq!(fused.len(), 1);
    }

    #[test]
    fn test_truncates_to_size() {
        let pool = (0..8)
            .map(|i| candidate(&i.to_string(), 8.0 - i as f32, 0.5))
            .collect();
        let fused = fuse(pool, Weights::default(), 3);
        assert_eq!(fused.len(), 3);
    }

    #[test]
    fn test_sorted_non_increasing() {
        let pool = vec![
            candidate("a", 1.0, 0.2),
            candidate("b", 5.0, 0.9),
            candidate("c", 3.0, 0.1),
        ];
        let fused = fuse(pool, Weights::default(), 10);
        for pair in fused.windows(2) {
            assert!(pair[0].combined >= pair[1].combined);
        }
        assert_eq!(ids(&fused)[0], "b");
    }

    #[test]
    fn test_uniform_lexical_batch_normalizes_to_one() {
        let pool = vec![
            candidate("a", 4.2, 0.0),
            candidate("b", 4.2, 0.0),
            candidate("c", 4.2, 0.0),
        ];
        let weights = Weights {
            lexical: 1.0,
            vector: 0.0,
        };
        let fused = fuse(pool, weights, 10);
        for c in &fused {
            assert!((c.combined - 1.0).abs() < 1e-6, "normalized != 1.0");
        }
    }

    #[test]
    fn test_zero_max_lexical_batch_normalizes_to_zero() {
        let pool = vec![candidate("a", 0.0, 0.8), candidate("b", 0.0, 0.3)];
        let fused = fuse(pool, Weights::default(), 10);
        assert!((fused[0].combined - 0.4).abs() < 1e-6);
        assert!((fused[1].combined - 0.15).abs() < 1e-6);
    }

    #[test]
    fn test_ties_keep_arrival_order() {
        let pool = vec![
            candidate("first", 2.0, 0.5),
            candidate("second", 2.0, 0.5),
            candidate("third", 2.0, 0.5),
        ];
        let fused = fuse(pool, Weights::default(), 10);
        assert_eq!(ids(&fused), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_combined_scores_bounded_by_weight_sum() {
        for (w_lex, w_vec) in [(0.5, 0.5), (1.0, 0.0), (0.3, 1.7), (2.0, 2.0)] {
            let weights = Weights {
                lexical: w_lex,
                vector: w_vec,
            };
            let pool = vec![
                candidate("a", 9.0, 1.0),
                candidate("b", 4.5, 0.7),
                candidate("c", 0.1, 0.0),
            ];
            for c in fuse(pool, weights, 10) {
                assert!(c.combined >= 0.0);
                assert!(c.combined <= w_lex + w_vec + 1e-6);
            }
        }
    }

    #[test]
    fn test_unit_weight_sum_keeps_scores_in_unit_interval() {
        let pool = vec![candidate("a", 3.0, 0.9), candidate("b", 1.0, 0.2)];
        let weights = Weights {
            lexical: 0.7,
            vector: 0.3,
        };
        for c in fuse(pool, weights, 10) {
            assert!((0.0..=1.0).contains(&c.combined));
        }
    }

    #[test]
    fn test_both_zero_weights_fall_back_to_default() {
        let pool = vec![candidate("a", 2.0, 0.6)];
        let fused = fuse(
            pool,
            Weights {
                lexical: 0.0,
                vector: 0.0,
            },
            10,
        );
        // 0.5 * 1.0 + 0.5 * 0.6
        assert!((fused[0].combined - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_negative_weights_invalid() {
        assert!(!Weights {
            lexical: -0.1,
            vector: 0.5
        }
        .is_valid());
        assert!(!Weights {
            lexical: 0.5,
            vector: f32::NAN
        }
        .is_valid());
        assert!(Weights::default().is_valid());
    }
}
