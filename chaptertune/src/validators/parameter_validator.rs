//! Parameter validation
//!
//! Checks run in a fixed order and the first failure is reported:
//! 1. Total seed count within 1..=5
//! 2. Each present seed category holds 1..=5 seeds
//! 3. `target_valence` and `target_energy` present and within [0, 1]
//! 4. `target_tempo` present and >= 0
//! 5. Optional unit-range features within [0, 1] when present
//! 6. `limit` an integer within 1..=50
//!
//! A passing candidate is converted into [`RecommendationParameters`].

use crate::models::{AudioTargets, CandidateParameters, RecommendationParameters, MAX_TOTAL_SEEDS};
use serde_json::Number;
use thiserror::Error;

pub const MIN_LIMIT: u32 = 1;
pub const MAX_LIMIT: u32 = 50;

/// First failing check of a candidate parameter set
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("total seed count {0} outside 1..=5")]
    SeedTotal(usize),

    #[error("{category} has {count} seeds (expected 1..=5)")]
    SeedCategoryCount { category: &'static str, count: usize },

    #[error("{0} is missing")]
    MissingField(&'static str),

    #[error("{field} = {value} is outside [0, 1]")]
    OutOfUnitRange { field: &'static str, value: f64 },

    #[error("target_tempo = {0} must be a non-negative number")]
    InvalidTempo(f64),

    #[error("limit = {0} must be an integer in 1..=50")]
    InvalidLimit(Number),
}

/// Validate a reduced candidate and convert it into accepted parameters
pub fn validate(candidate: &CandidateParameters) -> Result<RecommendationParameters, ValidationError> {
    // 1. Seed budget
    let total = candidate.seeds.total();
    if !(1..=MAX_TOTAL_SEEDS).contains(&total) {
        return Err(ValidationError::SeedTotal(total));
    }

    // 2. Per-category counts
    for (category, values) in candidate.seeds.iter() {
        if !(1..=MAX_TOTAL_SEEDS).contains(&values.len()) {
            return Err(ValidationError::SeedCategoryCount {
                category: category.key(),
                count: values.len(),
            });
        }
    }

    // 3. Required unit-range targets
    let valence = required_unit(candidate.target_valence, "target_valence")?;
    let energy = required_unit(candidate.target_energy, "target_energy")?;

    // 4. Tempo
    let tempo = candidate
        .target_tempo
        .ok_or(ValidationError::MissingField("target_tempo"))?;
    if !(tempo.is_finite() && tempo >= 0.0) {
        return Err(ValidationError::InvalidTempo(tempo));
    }

    // 5. Optional unit-range features
    let acousticness = optional_unit(candidate.target_acousticness, "target_acousticness")?;
    let danceability = optional_unit(candidate.target_danceability, "target_danceability")?;
    let instrumentalness = optional_unit(candidate.target_instrumentalness, "target_instrumentalness")?;
    let speechiness = optional_unit(candidate.target_speechiness, "target_speechiness")?;
    let min_instrumentalness = optional_unit(candidate.min_instrumentalness, "min_instrumentalness")?;

    // 6. Limit
    let raw_limit = candidate
        .limit
        .as_ref()
        .ok_or(ValidationError::MissingField("limit"))?;
    let limit = raw_limit
        .as_u64()
        .filter(|l| (MIN_LIMIT as u64..=MAX_LIMIT as u64).contains(l))
        .ok_or_else(|| ValidationError::InvalidLimit(raw_limit.clone()))?;

    Ok(RecommendationParameters {
        seeds: candidate.seeds.clone(),
        targets: AudioTargets {
            valence,
            energy,
            tempo,
            acousticness,
            danceability,
            instrumentalness,
            speechiness,
        },
        min_instrumentalness,
        limit: limit as u32,
    })
}

fn required_unit(value: Option<f64>, field: &'static str) -> Result<f64, ValidationError> {
    let value = value.ok_or(ValidationError::MissingField(field))?;
    check_unit(value, field)
}

fn optional_unit(value: Option<f64>, field: &'static str) -> Result<Option<f64>, ValidationError> {
    value.map(|v| check_unit(v, field)).transpose()
}

fn check_unit(value: f64, field: &'static str) -> Result<f64, ValidationError> {
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(ValidationError::OutOfUnitRange { field, value })
    }
}
