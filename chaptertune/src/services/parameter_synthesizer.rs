//! Recommendation parameter synthesis
//!
//! One model call per chapter, no retry. The response goes through
//! parse → category flags → genre vocabulary → seed budget → validation
//! before it is accepted.

use super::llm_client::{strip_code_fence, CompletionRequest, LlmError, TextGenerator};
use crate::models::{CandidateParameters, ChapterRecord, ParameterParseError, RecommendationParameters, SeedCategory};
use crate::validators::parameter_validator::{self, ValidationError};
use crate::validators::seed_budget;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::{debug, warn};

const SYSTEM_PROMPT: &str =
    "You are a music curator who maps the mood of book chapters to music. You answer with a single JSON object and nothing else.";

/// Parameter synthesis errors
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SynthesisError {
    #[error("model request failed: {0}")]
    Model(#[from] LlmError),

    #[error("response is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("response is malformed: {0}")]
    Malformed(#[from] ParameterParseError),

    #[error("parameters rejected: {0}")]
    Validation(#[from] ValidationError),
}

/// Synthesis options
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesisSettings {
    /// Ask for and keep track-name seeds
    pub use_track_seeds: bool,
    /// Ask for and keep artist-name seeds
    pub use_artist_seeds: bool,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for SynthesisSettings {
    fn default() -> Self {
        Self {
            use_track_seeds: true,
            use_artist_seeds: true,
            max_tokens: 500,
            temperature: 0.7,
        }
    }
}

/// Inputs for one chapter
#[derive(Debug, Clone, Copy)]
pub struct SynthesisRequest<'a> {
    pub book_title: &'a str,
    pub chapter: &'a ChapterRecord,
    pub music_preferences: &'a str,
    /// Genre seeds the recommendation engine accepts; empty disables filtering
    pub available_genres: &'a [String],
}

/// Produces validated recommendation parameters for a chapter
pub struct ParameterSynthesizer {
    generator: Arc<dyn TextGenerator>,
    settings: SynthesisSettings,
    rng: Mutex<StdRng>,
}

impl ParameterSynthesizer {
    pub fn new(generator: Arc<dyn TextGenerator>, settings: SynthesisSettings) -> Self {
        Self::with_rng(generator, settings, StdRng::from_entropy())
    }

    /// Use a fixed random source for seed reduction
    pub fn with_rng(generator: Arc<dyn TextGenerator>, settings: SynthesisSettings, rng: StdRng) -> Self {
        Self {
            generator,
            settings,
            rng: Mutex::new(rng),
        }
    }

    /// Single attempt at parameters for one chapter
    pub async fn synthesize(&self, request: SynthesisRequest<'_>) -> Result<RecommendationParameters, SynthesisError> {
        let prompt = build_prompt(&request, &self.settings);

        let raw = self
            .generator
            .complete(CompletionRequest {
                system: Some(SYSTEM_PROMPT.to_string()),
                prompt,
                max_tokens: self.settings.max_tokens,
                temperature: self.settings.temperature,
            })
            .await?;
        debug!(chapter = request.chapter.number, raw = %raw, "Raw parameter response");

        let cleaned = strip_code_fence(&raw);
        let value: serde_json::Value =
            serde_json::from_str(cleaned).map_err(|e| SynthesisError::InvalidJson(e.to_string()))?;

        let mut candidate = CandidateParameters::from_json(&value)?;
        self.apply_category_flags(&mut candidate);
        filter_genres(&mut candidate, request.available_genres);

        let candidate = {
            let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            seed_budget::reduce(candidate, &mut *rng)
        };

        Ok(parameter_validator::validate(&candidate)?)
    }

    fn apply_category_flags(&self, candidate: &mut CandidateParameters) {
        if !self.settings.use_track_seeds {
            candidate.seeds.remove(SeedCategory::Tracks);
        }
        if !self.settings.use_artist_seeds {
            candidate.seeds.remove(SeedCategory::Artists);
        }
    }
}

/// Drop genre seeds outside the vocabulary (case-insensitive, kept lowercase)
fn filter_genres(candidate: &mut CandidateParameters, available_genres: &[String]) {
    if available_genres.is_empty() {
        return;
    }
    let Some(genres) = candidate.seeds.remove(SeedCategory::Genres) else {
        return;
    };

    let vocabulary: HashSet<String> = available_genres.iter().map(|g| g.to_lowercase()).collect();
    let (kept, dropped): (Vec<String>, Vec<String>) = genres
        .into_iter()
        .map(|g| g.to_lowercase())
        .partition(|g| vocabulary.contains(g));

    if !dropped.is_empty() {
        warn!(dropped = ?dropped, "Dropped genre seeds not in the available genre list");
    }
    candidate.seeds.insert(SeedCategory::Genres, kept);
}

fn build_prompt(request: &SynthesisRequest<'_>, settings: &SynthesisSettings) -> String {
    let mut fields = vec![
        "\"seed_genres\": list of up to 5 genres matching the chapter's mood and themes, chosen only from the available genres".to_string(),
    ];
    if settings.use_track_seeds {
        fields.push("\"seed_tracks\": optional list of song titles (with artist) that fit the chapter".to_string());
    }
    if settings.use_artist_seeds {
        fields.push("\"seed_artists\": optional list of artist names that fit the chapter".to_string());
    }
    fields.extend(
        [
            "\"target_valence\": float in [0, 1], musical positiveness",
            "\"target_energy\": float in [0, 1], intensity and activity",
            "\"target_tempo\": estimated tempo in BPM (non-negative number)",
            "\"target_acousticness\": optional float in [0, 1]",
            "\"target_danceability\": optional float in [0, 1]",
            "\"target_instrumentalness\": optional float in [0, 1]",
            "\"target_speechiness\": optional float in [0, 1], presence of spoken words",
            "\"limit\": integer number of tracks between 1 and 50",
        ]
        .iter()
        .map(|s| s.to_string()),
    );

    let genres = if request.available_genres.is_empty() {
        "(unavailable; use common genre names)".to_string()
    } else {
        request.available_genres.join(", ")
    };

    let field_list: String = fields
        .iter()
        .enumerate()
        .map(|(i, f)| format!("{}. {}\n", i + 1, f))
        .collect();

    format!(
        "Generate music recommendation parameters for a chapter of a book.\n\n\
         Book: {title}\n\
         Chapter {number} summary: {summary}\n\
         Music preferences: {preferences}\n\
         Available genres: {genres}\n\n\
         The combined number of seeds across all seed lists must not exceed 5.\n\
         Return one JSON object with these keys:\n{fields}",
        title = request.book_title.trim(),
        number = request.chapter.number,
        summary = request.chapter.summary.trim(),
        preferences = request.music_preferences.trim(),
        genres = genres,
        fields = field_list,
    )
}
