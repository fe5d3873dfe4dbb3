//! Recommendation query parameters
//!
//! Two stages:
//! - [`CandidateParameters`]: what the model proposed, converted from a JSON
//!   tree but not yet budget-reduced or range-checked
//! - [`RecommendationParameters`]: accepted by the validator; required fields
//!   are present and every value is within range

use serde::Serialize;
use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;
use thiserror::Error;

/// Hard cap on combined seed count per recommendation query
pub const MAX_TOTAL_SEEDS: usize = 5;

/// Seed categories, ordered genres → tracks → artists
///
/// The derived ordering is the tie-break order used by seed-budget reduction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum SeedCategory {
    Genres,
    Tracks,
    Artists,
}

impl SeedCategory {
    pub const ALL: [SeedCategory; 3] = [SeedCategory::Genres, SeedCategory::Tracks, SeedCategory::Artists];

    /// Parameter key used in model responses and outbound queries
    pub fn key(self) -> &'static str {
        match self {
            SeedCategory::Genres => "seed_genres",
            SeedCategory::Tracks => "seed_tracks",
            SeedCategory::Artists => "seed_artists",
        }
    }
}

/// Seeds grouped by category
///
/// A category is either absent or holds at least one value; removing the last
/// value of a category removes the category.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedSet {
    seeds: BTreeMap<SeedCategory, Vec<String>>,
}

impl SeedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a category's values; an empty list makes the category absent
    pub fn insert(&mut self, category: SeedCategory, values: Vec<String>) {
        if values.is_empty() {
            self.seeds.remove(&category);
        } else {
            self.seeds.insert(category, values);
        }
    }

    pub fn with(mut self, category: SeedCategory, values: &[&str]) -> Self {
        self.insert(category, values.iter().map(|v| v.to_string()).collect());
        self
    }

    pub fn get(&self, category: SeedCategory) -> Option<&[String]> {
        self.seeds.get(&category).map(Vec::as_slice)
    }

    pub fn contains(&self, category: SeedCategory) -> bool {
        self.seeds.contains_key(&category)
    }

    pub fn count(&self, category: SeedCategory) -> usize {
        self.seeds.get(&category).map_or(0, Vec::len)
    }

    /// Combined seed count across all categories
    pub fn total(&self) -> usize {
        self.seeds.values().map(Vec::len).sum()
    }

    pub fn remove(&mut self, category: SeedCategory) -> Option<Vec<String>> {
        self.seeds.remove(&category)
    }

    /// Remove one value by position, dropping the category when it empties
    pub fn remove_at(&mut self, category: SeedCategory, index: usize) -> Option<String> {
        let values = self.seeds.get_mut(&category)?;
        if index >= values.len() {
            return None;
        }
        let removed = values.remove(index);
        if values.is_empty() {
            self.seeds.remove(&category);
        }
        Some(removed)
    }

    /// Keep only matching values, dropping the category when it empties
    pub fn retain<F>(&mut self, category: SeedCategory, keep: F)
    where
        F: FnMut(&String) -> bool,
    {
        if let Some(values) = self.seeds.get_mut(&category) {
            values.retain(keep);
            if values.is_empty() {
                self.seeds.remove(&category);
            }
        }
    }

    /// Present categories in genres → tracks → artists order
    pub fn iter(&self) -> impl Iterator<Item = (SeedCategory, &[String])> {
        self.seeds.iter().map(|(c, v)| (*c, v.as_slice()))
    }
}

/// Reasons a parameter-synthesis response is rejected as malformed
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParameterParseError {
    #[error("response is not a JSON object")]
    NotAnObject,

    #[error("'{0}' must be an array of strings")]
    InvalidSeedList(&'static str),

    #[error("'{0}' must be a number")]
    NotANumber(&'static str),
}

/// Parameter set as proposed by the model, before reduction and validation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CandidateParameters {
    pub seeds: SeedSet,
    pub target_valence: Option<f64>,
    pub target_energy: Option<f64>,
    pub target_tempo: Option<f64>,
    pub target_acousticness: Option<f64>,
    pub target_danceability: Option<f64>,
    pub target_instrumentalness: Option<f64>,
    pub target_speechiness: Option<f64>,
    pub min_instrumentalness: Option<f64>,
    /// Raw JSON number so that `10.0` or `12.5` reaches the validator as non-integer
    pub limit: Option<Number>,
}

impl CandidateParameters {
    /// Convert a parsed model response field by field
    ///
    /// Unknown keys are ignored. Seed lists must be arrays of strings; blank
    /// strings are dropped and an empty list leaves the category absent.
    /// Numeric keys, when present and not null, must be JSON numbers.
    pub fn from_json(value: &Value) -> Result<Self, ParameterParseError> {
        let object = value.as_object().ok_or(ParameterParseError::NotAnObject)?;

        let mut seeds = SeedSet::new();
        for category in SeedCategory::ALL {
            if let Some(values) = seed_list(object, category.key())? {
                seeds.insert(category, values);
            }
        }

        Ok(Self {
            seeds,
            target_valence: number(object, "target_valence")?,
            target_energy: number(object, "target_energy")?,
            target_tempo: number(object, "target_tempo")?,
            target_acousticness: number(object, "target_acousticness")?,
            target_danceability: number(object, "target_danceability")?,
            target_instrumentalness: number(object, "target_instrumentalness")?,
            target_speechiness: number(object, "target_speechiness")?,
            min_instrumentalness: number(object, "min_instrumentalness")?,
            limit: raw_number(object, "limit")?,
        })
    }
}

fn seed_list(
    object: &Map<String, Value>,
    key: &'static str,
) -> Result<Option<Vec<String>>, ParameterParseError> {
    match object.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_str()
                    .map(|s| s.trim().to_string())
                    .ok_or(ParameterParseError::InvalidSeedList(key))
            })
            .filter(|item| !matches!(item, Ok(s) if s.is_empty()))
            .collect::<Result<Vec<_>, _>>()
            .map(Some),
        Some(_) => Err(ParameterParseError::InvalidSeedList(key)),
    }
}

fn number(object: &Map<String, Value>, key: &'static str) -> Result<Option<f64>, ParameterParseError> {
    match object.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value
            .as_f64()
            .map(Some)
            .ok_or(ParameterParseError::NotANumber(key)),
    }
}

fn raw_number(object: &Map<String, Value>, key: &'static str) -> Result<Option<Number>, ParameterParseError> {
    match object.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => Ok(Some(n.clone())),
        Some(_) => Err(ParameterParseError::NotANumber(key)),
    }
}

/// Audio-feature targets of an accepted parameter set
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AudioTargets {
    pub valence: f64,
    pub energy: f64,
    /// Beats per minute
    pub tempo: f64,
    pub acousticness: Option<f64>,
    pub danceability: Option<f64>,
    pub instrumentalness: Option<f64>,
    pub speechiness: Option<f64>,
}

impl AudioTargets {
    /// `(key, value)` pairs of the targets that are set
    pub fn pairs(&self) -> Vec<(&'static str, f64)> {
        let mut pairs = vec![
            ("target_valence", self.valence),
            ("target_energy", self.energy),
            ("target_tempo", self.tempo),
        ];
        let optional = [
            ("target_acousticness", self.acousticness),
            ("target_danceability", self.danceability),
            ("target_instrumentalness", self.instrumentalness),
            ("target_speechiness", self.speechiness),
        ];
        pairs.extend(optional.into_iter().filter_map(|(k, v)| v.map(|v| (k, v))));
        pairs
    }
}

/// Parameter set accepted by the validator
#[derive(Debug, Clone, PartialEq)]
pub struct RecommendationParameters {
    pub seeds: SeedSet,
    pub targets: AudioTargets,
    pub min_instrumentalness: Option<f64>,
    /// Number of tracks to request (1..=50)
    pub limit: u32,
}

impl RecommendationParameters {
    /// Flattened `key: value` rendering in a stable order
    ///
    /// Seed lists are joined with ", ".
    pub fn rendered_pairs(&self) -> Vec<(String, String)> {
        let mut pairs: Vec<(String, String)> = self
            .seeds
            .iter()
            .map(|(category, values)| (category.key().to_string(), values.join(", ")))
            .collect();

        pairs.extend(
            self.targets
                .pairs()
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string())),
        );

        if let Some(min) = self.min_instrumentalness {
            pairs.push(("min_instrumentalness".to_string(), min.to_string()));
        }
        pairs.push(("limit".to_string(), self.limit.to_string()));
        pairs
    }
}
