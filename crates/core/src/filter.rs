//! Filter compiler: structured filter specs to retrieval predicates.
//!
//! A [`FilterSpec`] maps field names to loosely-shaped values (scalar, list, or
//! `{min, max}` range). Compilation produces the tagged [`Predicate`] variants
//! the store evaluates. Two deliberate policies:
//!
//! - A list filter on the `genres` field compiles to a conjunctive
//!   [`Predicate::AllOf`] (every genre must match as a phrase), while a list on
//!   any other field compiles to the disjunctive [`Predicate::AnyOf`]. The
//!   asymmetry distinguishes precise multi-genre intent from broad category
//!   filters.
//! - Unknown field names compile normally and malformed value shapes are
//!   dropped for that field only. Filtering is permissive, not a schema
//!   validator: the store simply matches nothing on fields that do not exist.

use crate::config;
use crate::movie::MovieRecord;
use serde::Deserialize;
use std::collections::BTreeMap;

/// Structured filter specification: field name to filter value.
pub type FilterSpec = BTreeMap<String, FilterValue>;

/// A loosely-shaped filter value as supplied by callers.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    /// Inclusive numeric range; either bound may be open.
    Range(RangeBounds),
    /// List of values: OR semantics, except on the `genres` field (AND).
    List(Vec<serde_json::Value>),
    /// Single scalar: exact-match semantics.
    Scalar(serde_json::Value),
}

/// `{min, max}` bounds of a range filter.
///
/// Unknown keys are rejected so that arbitrary objects fall through to the
/// malformed-shape branch instead of silently parsing as an unbounded range.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RangeBounds {
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
}

/// A compiled retrieval predicate, evaluated by the store.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Exact match on one field.
    Term {
        field: String,
        value: serde_json::Value,
    },
    /// Field matches at least one of the listed values.
    AnyOf {
        field: String,
        values: Vec<serde_json::Value>,
    },
    /// Field text contains every listed phrase. Used for `genres`.
    AllOf { field: String, phrases: Vec<String> },
    /// Inclusive numeric range; an absent bound leaves that side open.
    Range {
        field: String,
        min: Option<f64>,
        max: Option<f64>,
    },
}

/// Compiles a filter spec into predicates.
///
/// An empty spec compiles to no predicates (identity: all documents pass).
/// Malformed entries degrade to "no filter on this field" with a debug log.
pub fn compile(spec: &FilterSpec) -> Vec<Predicate> {
    let mut predicates = Vec::with_capacity(spec.len());
    for (field, value) in spec {
        match value {
            FilterValue::Range(RangeBounds {
                min: None,
                max: None,
            }) => {
                tracing::debug!(field, "range filter without bounds ignored");
            }
            FilterValue::Range(RangeBounds { min, max }) => {
                predicates.push(Predicate::Range {
                    field: field.clone(),
                    min: *min,
                    max: *max,
                });
            }
            FilterValue::List(values) if field == config::GENRES_FIELD => {
                let phrases: Vec<String> = values
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect();
                if phrases.is_empty() {
                    tracing::debug!(field, "genre filter without string entries ignored");
                } else {
                    predicates.push(Predicate::AllOf {
                        field: field.clone(),
                        phrases,
                    });
                }
            }
            FilterValue::List(values) => {
                if values.is_empty() {
                    tracing::debug!(field, "empty list filter ignored");
                } else {
                    predicates.push(Predicate::AnyOf {
                        field: field.clone(),
                        values: values.clone(),
                    });
                }
            }
            FilterValue::Scalar(value) => match value {
                serde_json::Value::Null
                | serde_json::Value::Object(_)
                | serde_json::Value::Array(_) => {
                    tracing::debug!(field, "unrecognized filter shape ignored");
                }
                _ => predicates.push(Predicate::Term {
                    field: field.clone(),
                    value: value.clone(),
                }),
            },
        }
    }
    predicates
}

impl Predicate {
    /// Evaluates this predicate against a record in process.
    ///
    /// Mirrors the store-side semantics: exact term equality
    /// (case-insensitive for text), OR over `AnyOf` values, phrase containment
    /// AND over `AllOf`, inclusive range bounds. A field absent from the
    /// record never matches.
    pub fn matches(&self, record: &MovieRecord) -> bool {
        match self {
            Predicate::Term { field, value } => term_matches(record, field, value),
            Predicate::AnyOf { field, values } => {
                values.iter().any(|v| term_matches(record, field, v))
            }
            Predicate::AllOf { field, phrases } => match record.text_field(field) {
                Some(text) => {
                    let text = text.to_lowercase();
                    phrases.iter().all(|p| text.contains(&p.to_lowercase()))
                }
                None => false,
            },
            Predicate::Range { field, min, max } => match record.numeric_field(field) {
                Some(n) => min.map_or(true, |lo| n >= lo) && max.map_or(true, |hi| n <= hi),
                None => false,
            },
        }
    }
}

fn term_matches(record: &MovieRecord, field: &str, value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::String(s) => record
            .text_field(field)
            .is_some_and(|t| t.eq_ignore_ascii_case(s)),
        serde_json::Value::Number(n) => match (record.numeric_field(field), n.as_f64()) {
            (Some(field_value), Some(wanted)) => (field_value - wanted).abs() < f64::EPSILON,
            _ => false,
        },
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn spec(json: serde_json::Value) -> FilterSpec {
        serde_json::from_value(json).expect("valid filter spec")
    }

    fn record_with_genres(genres: &str) -> MovieRecord {
        MovieRecord {
            genres: Some(genres.to_string()),
            ..MovieRecord::default()
        }
    }

    #[test]
    fn test_empty_spec_compiles_to_identity() {
        assert!(compile(&FilterSpec::new()).is_empty());
    }

    #[test]
    fn test_scalar_compiles_to_term() {
        let predicates = compile(&spec(json!({"director": "Christopher Nolan"})));
        assert_eq!(
            predicates,
            vec![Predicate::Term {
                field: "director".to_string(),
                value: json!("Christopher Nolan"),
            }]
        );
    }

    #[test]
    fn test_list_compiles_to_any_of() {
        let predicates = compile(&spec(json!({"status": ["Released", "Post Production"]})));
        assert!(matches!(&predicates[0], Predicate::AnyOf { field, values }
            if field == "status" && values.len() == 2));
    }

    #[test]
    fn test_genres_list_compiles_to_all_of() {
        let predicates = compile(&spec(json!({"genres": ["Action", "Sci-Fi"]})));
        assert_eq!(
            predicates,
            vec![Predicate::AllOf {
                field: "genres".to_string(),
                phrases: vec!["Action".to_string(), "Sci-Fi".to_string()],
            }]
        );
    }

    #[test]
    fn test_range_bounds() {
        let predicates = compile(&spec(json!({"year": {"min": 1990, "max": 1999}})));
        assert_eq!(
            predicates,
            vec![Predicate::Range {
                field: "year".to_string(),
                min: Some(1990.0),
                max: Some(1999.0),
            }]
        );
    }

    #[test]
    fn test_open_ended_range() {
        let predicates = compile(&spec(json!({"vote_average": {"min": 7.5}})));
        assert_eq!(
            predicates,
            vec![Predicate::Range {
                field: "vote_average".to_string(),
                min: Some(7.5),
                max: None,
            }]
        );
    }

    #[test]
    fn test_malformed_shapes_degrade_to_no_filter() {
        let predicates = compile(&spec(json!({
            "year": {},
            "genres": [42, false],
            "director": null,
            "title": "Inception"
        })));
        // Only the well-formed entry survives.
        assert_eq!(predicates.len(), 1);
        assert!(matches!(&predicates[0], Predicate::Term { field, .. } if field == "title"));
    }

    #[test]
    fn test_unknown_field_compiles_normally() {
        let predicates = compile(&spec(json!({"no_such_field": "value"})));
        assert_eq!(predicates.len(), 1);
        // The permissive policy: the predicate exists, it just matches nothing.
        assert!(!predicates[0].matches(&MovieRecord::default()));
    }

    #[test]
    fn test_genre_and_vs_generic_or() {
        let action = record_with_genres("Action");
        let both = record_with_genres("Action, Sci-Fi");
        let scifi = record_with_genres("Sci-Fi");

        let genre_and = &compile(&spec(json!({"genres": ["Action", "Sci-Fi"]})))[0];
        assert!(!genre_and.matches(&action));
        assert!(genre_and.matches(&both));
        assert!(!genre_and.matches(&scifi));

        // A list on any other field keeps OR semantics.
        let status_or = &compile(&spec(json!({"status": ["Released", "Rumored"]})))[0];
        let released = MovieRecord {
            status: Some("Released".to_string()),
            ..MovieRecord::default()
        };
        assert!(status_or.matches(&released));
    }

    #[test]
    fn test_range_matches_inclusive() {
        let record = MovieRecord {
            year: Some(1999),
            ..MovieRecord::default()
        };
        let p = Predicate::Range {
            field: "year".to_string(),
            min: Some(1999.0),
            max: Some(1999.0),
        };
        assert!(p.matches(&record));
    }

    #[test]
    fn test_term_matches_case_insensitive_text() {
        let record = MovieRecord {
            director: Some("Christopher Nolan".to_string()),
            ..MovieRecord::default()
        };
        let p = Predicate::Term {
            field: "director".to_string(),
            value: json!("christopher nolan"),
        };
        assert!(p.matches(&record));
    }

    #[test]
    fn test_numeric_term_match() {
        let record = MovieRecord {
            year: Some(2010),
            ..MovieRecord::default()
        };
        let p = Predicate::Term {
            field: "year".to_string(),
            value: json!(2010),
        };
        assert!(p.matches(&record));
    }

    #[test]
    fn test_absent_field_never_matches() {
        let p = Predicate::Range {
            field: "runtime".to_string(),
            min: Some(0.0),
            max: None,
        };
        assert!(!p.matches(&MovieRecord::default()));
    }
}
