//! Movie record types.
//!
//! [`MovieRecord`] is the stored shape owned by the external index: every field
//! may be absent, and the dense embedding vector rides alongside the metadata.
//! [`Movie`] is the public result shape; absent fields resolve to
//! type-appropriate defaults exactly once, at this assembly boundary, so
//! optionality never leaks into API responses.

use serde::{Deserialize, Deserializer, Serialize};

/// A stored movie document as returned by the external index.
///
/// Read-only from this crate's perspective. Field names mirror the persisted
/// index mapping; unknown fields in the source are ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MovieRecord {
    /// Stable identifier. The index may store it as a number; it is always a
    /// string here.
    #[serde(default, deserialize_with = "id_as_string")]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub original_title: Option<String>,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub tagline: Option<String>,
    /// Comma-separated genre names, e.g. `"Action, Science Fiction"`.
    #[serde(default)]
    pub genres: Option<String>,
    #[serde(default)]
    pub director: Option<String>,
    #[serde(default)]
    pub cast: Option<String>,
    #[serde(default)]
    pub writers: Option<String>,
    #[serde(default)]
    pub producers: Option<String>,
    #[serde(default)]
    pub production_companies: Option<String>,
    #[serde(default)]
    pub production_countries: Option<String>,
    #[serde(default)]
    pub spoken_languages: Option<String>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub year: Option<i64>,
    #[serde(default)]
    pub runtime: Option<i64>,
    #[serde(default)]
    pub vote_average: Option<f64>,
    #[serde(default)]
    pub vote_count: Option<f64>,
    #[serde(default)]
    pub popularity: Option<f64>,
    #[serde(default)]
    pub imdb_rating: Option<f64>,
    #[serde(default)]
    pub imdb_votes: Option<f64>,
    #[serde(default)]
    pub budget: Option<i64>,
    #[serde(default)]
    pub revenue: Option<i64>,
    #[serde(default)]
    pub profit: Option<f64>,
    #[serde(default)]
    pub roi: Option<f64>,
    /// Dense embedding vector sized to the configured dimension.
    #[serde(default)]
    pub embedding: Option<Vec<f32>>,
}

impl MovieRecord {
    /// Textual field lookup by index field name. Returns `None` for absent
    /// values and for names that are not text fields.
    pub fn text_field(&self, name: &str) -> Option<&str> {
        let value = match name {
            "id" => &self.id,
            "title" => &self.title,
            "original_title" => &self.original_title,
            "overview" => &self.overview,
            "tagline" => &self.tagline,
            "genres" => &self.genres,
            "director" => &self.director,
            "cast" => &self.cast,
            "writers" => &self.writers,
            "producers" => &self.producers,
            "production_companies" => &self.production_companies,
            "production_countries" => &self.production_countries,
            "spoken_languages" => &self.spoken_languages,
            "release_date" => &self.release_date,
            "status" => &self.status,
            "poster_path" => &self.poster_path,
            _ => return None,
        };
        value.as_deref()
    }

    /// Numeric field lookup by index field name.
    pub fn numeric_field(&self, name: &str) -> Option<f64> {
        match name {
            "year" => self.year.map(|v| v as f64),
            "runtime" => self.runtime.map(|v| v as f64),
            "vote_average" => self.vote_average,
            "vote_count" => self.vote_count,
            "popularity" => self.popularity,
            "imdb_rating" => self.imdb_rating,
            "imdb_votes" => self.imdb_votes,
            "budget" => self.budget.map(|v| v as f64),
            "revenue" => self.revenue.map(|v| v as f64),
            "profit" => self.profit,
            "roi" => self.roi,
            _ => None,
        }
    }
}

/// A movie in the public result shape, carrying the final relevance score.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Movie {
    pub id: String,
    pub title: String,
    pub overview: String,
    pub release_date: String,
    pub vote_average: f64,
    pub popularity: f64,
    pub genres: String,
    pub director: String,
    pub cast: String,
    pub poster_path: String,
    pub tagline: String,
    pub runtime: i64,
    pub imdb_rating: f64,
    /// Final score: fused for hybrid, similarity for semantic, raw lexical for
    /// keyword mode.
    pub score: f32,
}

impl Movie {
    /// Assembles the public shape from a stored record, attaching `score`.
    ///
    /// Absent fields default to empty string / zero; nothing null-propagates
    /// into the response.
    pub fn from_record(record: &MovieRecord, score: f32) -> Self {
        Self {
            id: record.id.clone().unwrap_or_default(),
            title: record.title.clone().unwrap_or_default(),
            overview: record.overview.clone().unwrap_or_default(),
            release_date: record.release_date.clone().unwrap_or_default(),
            vote_average: record.vote_average.unwrap_or_default(),
            popularity: record.popularity.unwrap_or_default(),
            genres: record.genres.clone().unwrap_or_default(),
            director: record.director.clone().unwrap_or_default(),
            cast: record.cast.clone().unwrap_or_default(),
            poster_path: record.poster_path.clone().unwrap_or_default(),
            tagline: record.tagline.clone().unwrap_or_default(),
            runtime: record.runtime.unwrap_or_default(),
            imdb_rating: record.imdb_rating.unwrap_or_default(),
            score,
        }
    }
}

/// Accepts a JSON string or number for the `id` field.
fn id_as_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}
