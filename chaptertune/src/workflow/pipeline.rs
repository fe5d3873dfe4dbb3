//! Pipeline Orchestrator
//!
//! Runs one book end to end:
//! - **Phase 1**: Chapter extraction (once per book, fatal on failure)
//! - **Phase 2**: Genre vocabulary fetch (failure only disables the genre filter)
//! - **Phase 3**: Per chapter, in ascending order: parameter synthesis, then
//!   playlist assembly
//!
//! # Error Handling
//! - Per-chapter error isolation: a skipped chapter never stops the run
//! - Run-scoped failures ([`PipelineError`]) stop before any chapter is processed
//! - Progress reporting via optional [`PipelineEvent`] channel
//!
//! # Example
//! ```rust,ignore
//! let pipeline = Pipeline::new(config, generator, music_service);
//! let summary = pipeline.run(&inputs).await?;
//! ```

use super::{CreatedPlaylist, PipelineEvent, RunSummary, SkippedChapter};
use crate::error::{ChapterFailure, PipelineError};
use crate::models::{ChapterRecord, RunInputs};
use crate::services::content_extractor::{ContentExtractor, ExtractionSettings};
use crate::services::llm_client::TextGenerator;
use crate::services::music_service::MusicService;
use crate::services::parameter_synthesizer::{ParameterSynthesizer, SynthesisRequest, SynthesisSettings};
use crate::services::playlist_assembler::{AssemblyRequest, PlaylistAssembler, PlaylistOutcome};
use crate::utils::api_retry::{RateLimitedInvoker, RetryPolicy};
use chaptertune_common::config::{PipelineSettings, DEFAULT_TEMPERATURE};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Allowed attempts per music-service call
pub const API_ATTEMPTS_RANGE: std::ops::RangeInclusive<u32> = 3..=5;

/// Pipeline configuration
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Ask for and resolve track-name seeds
    pub use_track_seeds: bool,
    /// Ask for and resolve artist-name seeds
    pub use_artist_seeds: bool,
    /// Write the parameter description onto each playlist
    pub write_descriptions: bool,
    /// Attempts per music-service call (3..=5)
    pub api_max_attempts: u32,
    pub extraction: ExtractionSettings,
    /// Sampling temperature for both model calls
    pub temperature: f32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::from_settings(&PipelineSettings::default(), DEFAULT_TEMPERATURE)
    }
}

impl PipelineConfig {
    /// Build from the `[pipeline]` TOML section
    pub fn from_settings(settings: &PipelineSettings, temperature: f32) -> Self {
        let api_max_attempts = settings
            .api_max_attempts
            .clamp(*API_ATTEMPTS_RANGE.start(), *API_ATTEMPTS_RANGE.end());
        if api_max_attempts != settings.api_max_attempts {
            warn!(
                configured = settings.api_max_attempts,
                applied = api_max_attempts,
                "api_max_attempts outside 3..=5, clamped"
            );
        }

        Self {
            use_track_seeds: settings.use_track_seeds,
            use_artist_seeds: settings.use_artist_seeds,
            write_descriptions: settings.write_descriptions,
            api_max_attempts,
            extraction: ExtractionSettings {
                max_attempts: settings.extraction_max_attempts.max(1),
                initial_token_budget: settings.extraction_token_budget.max(1),
                temperature,
            },
            temperature,
        }
    }

    /// Synthesis options derived from the seed flags
    pub fn synthesis_settings(&self) -> SynthesisSettings {
        SynthesisSettings {
            use_track_seeds: self.use_track_seeds,
            use_artist_seeds: self.use_artist_seeds,
            temperature: self.temperature,
            ..SynthesisSettings::default()
        }
    }
}

/// Book → per-chapter playlists
pub struct Pipeline {
    extractor: ContentExtractor,
    synthesizer: ParameterSynthesizer,
    assembler: PlaylistAssembler,
    music_service: Arc<dyn MusicService>,
    invoker: RateLimitedInvoker,
    event_tx: Option<mpsc::Sender<PipelineEvent>>,
}

impl Pipeline {
    /// Create pipeline whose retries sleep on the tokio timer
    pub fn new(
        config: PipelineConfig,
        generator: Arc<dyn TextGenerator>,
        music_service: Arc<dyn MusicService>,
    ) -> Self {
        let invoker = RateLimitedInvoker::with_policy(RetryPolicy::with_max_attempts(config.api_max_attempts));
        Self::with_components(
            config.clone(),
            ContentExtractor::new(generator.clone(), config.extraction.clone()),
            ParameterSynthesizer::new(generator, config.synthesis_settings()),
            music_service,
            invoker,
        )
    }

    /// Create pipeline from prebuilt components
    pub fn with_components(
        config: PipelineConfig,
        extractor: ContentExtractor,
        synthesizer: ParameterSynthesizer,
        music_service: Arc<dyn MusicService>,
        invoker: RateLimitedInvoker,
    ) -> Self {
        let assembler = PlaylistAssembler::new(music_service.clone(), invoker.clone(), config.write_descriptions);
        Self {
            extractor,
            synthesizer,
            assembler,
            music_service,
            invoker,
            event_tx: None,
        }
    }

    /// Attach an event channel for progress reporting
    pub fn with_events(mut self, event_tx: mpsc::Sender<PipelineEvent>) -> Self {
        self.event_tx = Some(event_tx);
        self
    }

    /// Process a whole book
    ///
    /// # Returns
    /// * Summary of created playlists and skipped chapters (chapter failures are
    ///   recorded, not returned)
    pub async fn run(&self, inputs: &RunInputs) -> Result<RunSummary, PipelineError> {
        let mut summary = RunSummary::start(&inputs.book_title);
        info!(book = %inputs.book_title, "Pipeline starting");

        // Phase 1: Chapters
        let book = self
            .extractor
            .extract(&inputs.book_title, &inputs.notes)
            .await
            .map_err(|e| {
                error!(error = %e, "Chapter extraction failed, aborting run");
                PipelineError::ExtractionExhausted(e)
            })?;

        let total = book.chapters.len();
        self.emit_event(PipelineEvent::ChaptersExtracted { count: total }).await;

        // Phase 2: Genre vocabulary
        let available_genres = self.fetch_genre_seeds().await;

        // Phase 3: Chapters, strictly sequential
        for chapter in &book.chapters {
            self.emit_event(PipelineEvent::ChapterStarted {
                chapter: chapter.number,
                total,
            })
            .await;

            match self.process_chapter(inputs, chapter, &available_genres).await {
                Ok(outcome) => {
                    info!(
                        chapter = chapter.number,
                        url = %outcome.playlist.public_url,
                        tracks = outcome.track_count,
                        "Chapter playlist complete"
                    );
                    self.emit_event(PipelineEvent::ChapterCompleted {
                        chapter: chapter.number,
                        url: outcome.playlist.public_url.clone(),
                    })
                    .await;
                    summary.created.push(CreatedPlaylist {
                        chapter: chapter.number,
                        url: outcome.playlist.public_url,
                        track_count: outcome.track_count,
                        description: outcome.playlist.description,
                    });
                }
                Err(failure) => {
                    warn!(chapter = chapter.number, reason = %failure, "Skipping chapter");
                    self.emit_event(PipelineEvent::ChapterSkipped {
                        chapter: chapter.number,
                        reason: failure.to_string(),
                    })
                    .await;
                    summary.skipped.push(SkippedChapter {
                        chapter: chapter.number,
                        reason: failure,
                    });
                }
            }
        }

        summary.finish();
        self.emit_event(PipelineEvent::RunCompleted {
            created: summary.created.len(),
            skipped: summary.skipped.len(),
        })
        .await;

        info!(
            created = summary.created.len(),
            skipped = summary.skipped.len(),
            "Pipeline finished"
        );
        Ok(summary)
    }

    async fn process_chapter(
        &self,
        inputs: &RunInputs,
        chapter: &ChapterRecord,
        available_genres: &[String],
    ) -> Result<PlaylistOutcome, ChapterFailure> {
        debug!(chapter = chapter.number, summary = %chapter.summary, "Processing chapter");

        let parameters = self
            .synthesizer
            .synthesize(SynthesisRequest {
                book_title: &inputs.book_title,
                chapter,
                music_preferences: &inputs.music_preferences,
                available_genres,
            })
            .await?;
        debug!(chapter = chapter.number, parameters = ?parameters.rendered_pairs(), "Accepted parameters");

        self.assembler
            .assemble(AssemblyRequest {
                book_title: &inputs.book_title,
                chapter_number: chapter.number,
                parameters: &parameters,
                vocal_preference: inputs.vocal_preference,
                min_instrumentalness_override: inputs.min_instrumentalness,
            })
            .await
    }

    /// Genre vocabulary, or empty (filter disabled) when the fetch fails
    async fn fetch_genre_seeds(&self) -> Vec<String> {
        match self
            .invoker
            .invoke("get genre seeds", || self.music_service.genre_seeds())
            .await
        {
            Ok(genres) if !genres.is_empty() => {
                info!(count = genres.len(), "Fetched available genre seeds");
                genres
            }
            Ok(_) => {
                warn!("Music service returned no genre seeds; genre filtering disabled");
                Vec::new()
            }
            Err(e) => {
                warn!(error = %e, "Failed to fetch genre seeds; genre filtering disabled");
                Vec::new()
            }
        }
    }

    async fn emit_event(&self, event: PipelineEvent) {
        if let Some(tx) = &self.event_tx {
            if let Err(e) = tx.send(event).await {
                debug!("Event receiver dropped: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_clamps_api_attempts() {
        let settings = PipelineSettings {
            api_max_attempts: 9,
            ..Default::default()
        };
        assert_eq!(PipelineConfig::from_settings(&settings, 0.7).api_max_attempts, 5);

        let settings = PipelineSettings {
            api_max_attempts: 1,
            ..Default::default()
        };
        assert_eq!(PipelineConfig::from_settings(&settings, 0.7).api_max_attempts, 3);
    }

    #[test]
    fn test_config_carries_flags() {
        let settings = PipelineSettings {
            use_artist_seeds: false,
            write_descriptions: false,
            extraction_token_budget: 800,
            ..Default::default()
        };
        let config = PipelineConfig::from_settings(&settings, 0.2);

        assert!(config.use_track_seeds);
        assert!(!config.use_artist_seeds);
        assert!(!config.write_descriptions);
        assert_eq!(config.extraction.initial_token_budget, 800);
        assert_eq!(config.extraction.temperature, 0.2);
        assert!(!config.synthesis_settings().use_artist_seeds);
    }
}
