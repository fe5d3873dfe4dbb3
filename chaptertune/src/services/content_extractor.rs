//! Chapter extraction
//!
//! Turns a book title and free-text notes into an ordered chapter list with a
//! generative text model. Truncated output is the usual cause of invalid
//! JSON, so every retry doubles, triples, ... the output-token budget:
//! attempt `i` (0-based) requests `initial_token_budget * (i + 1)` tokens.
//! Attempts follow each other without delay.

use super::llm_client::{strip_code_fence, CompletionRequest, LlmError, TextGenerator};
use crate::models::{BookChapters, ChapterParseError};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

const SYSTEM_PROMPT: &str = "You are a literary assistant. You answer with a single JSON object and nothing else.";

/// Chapter extraction errors
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ExtractionError {
    #[error("model request failed: {0}")]
    Model(#[from] LlmError),

    #[error("response is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("response has the wrong structure: {0}")]
    InvalidStructure(#[from] ChapterParseError),

    #[error("no valid chapter structure after {attempts} attempts (last error: {last_error})")]
    Exhausted {
        attempts: u32,
        last_error: Box<ExtractionError>,
    },
}

/// Retry budget for chapter extraction
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionSettings {
    pub max_attempts: u32,
    /// Output-token budget of the first attempt
    pub initial_token_budget: u32,
    pub temperature: f32,
}

impl Default for ExtractionSettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_token_budget: 1000,
            temperature: 0.7,
        }
    }
}

impl ExtractionSettings {
    /// Token budget for a 0-based attempt index
    pub fn token_budget(&self, attempt: u32) -> u32 {
        self.initial_token_budget.saturating_mul(attempt + 1)
    }
}

/// Extracts chapter structure from free-text notes
pub struct ContentExtractor {
    generator: Arc<dyn TextGenerator>,
    settings: ExtractionSettings,
}

impl ContentExtractor {
    pub fn new(generator: Arc<dyn TextGenerator>, settings: ExtractionSettings) -> Self {
        Self { generator, settings }
    }

    /// Extract the chapter list, retrying with a growing token budget
    ///
    /// Returns [`ExtractionError::Exhausted`] after `max_attempts` consecutive
    /// failures; the caller treats that as fatal for the run.
    pub async fn extract(&self, book_title: &str, free_text: &str) -> Result<BookChapters, ExtractionError> {
        let prompt = build_prompt(book_title, free_text);
        let max_attempts = self.settings.max_attempts.max(1);
        let mut last_error = None;

        for attempt in 0..max_attempts {
            let budget = self.settings.token_budget(attempt);

            match self.attempt(&prompt, budget).await {
                Ok(book) => {
                    if !book.count_matches() {
                        warn!(
                            reported = book.chapter_count,
                            returned = book.chapters.len(),
                            "Reported chapter count differs from chapter list; using the list"
                        );
                    }
                    info!(
                        chapters = book.chapters.len(),
                        attempt = attempt + 1,
                        "Extracted chapter information"
                    );
                    return Ok(book);
                }
                Err(err) => {
                    warn!(
                        attempt = attempt + 1,
                        max_attempts,
                        token_budget = budget,
                        error = %err,
                        "Chapter extraction attempt failed, retrying with increased token budget"
                    );
                    last_error = Some(err);
                }
            }
        }

        let last_error = last_error.unwrap_or(ExtractionError::InvalidJson("no attempts made".to_string()));
        Err(ExtractionError::Exhausted {
            attempts: max_attempts,
            last_error: Box::new(last_error),
        })
    }

    async fn attempt(&self, prompt: &str, max_tokens: u32) -> Result<BookChapters, ExtractionError> {
        let raw = self
            .generator
            .complete(CompletionRequest {
                system: Some(SYSTEM_PROMPT.to_string()),
                prompt: prompt.to_string(),
                max_tokens,
                temperature: self.settings.temperature,
            })
            .await?;
        debug!(raw = %raw, "Raw chapter response");

        let cleaned = strip_code_fence(&raw);
        debug!(cleaned = %cleaned, "Cleaned chapter response");

        let value: serde_json::Value =
            serde_json::from_str(cleaned).map_err(|e| ExtractionError::InvalidJson(e.to_string()))?;

        Ok(BookChapters::from_json(&value)?)
    }
}

/// Prompt asking for the full chapter list of a book
pub fn build_prompt(book_title: &str, free_text: &str) -> String {
    format!(
        r#"Book title: "{title}"

Notes from the reader (comments and summaries of some chapters):
{notes}

Using the notes and what you know about this book:
1. Determine the total number of chapters.
2. Write a short summary for every chapter, including chapters the notes do not mention.

Respond with one JSON object of exactly this shape:
{{
  "num_chapters": <integer>,
  "chapters": [
    {{"number": 1, "summary": "<summary of chapter 1>"}},
    {{"number": 2, "summary": "<summary of chapter 2>"}}
  ]
}}"#,
        title = book_title.trim(),
        notes = free_text.trim(),
    )
}
