//! Error types for chaptertune
//!
//! Failures are either chapter-scoped ([`ChapterFailure`]): the chapter is
//! skipped and the run moves on. Or they are run-scoped ([`PipelineError`]):
//! the run stops before any chapter is processed.

use crate::services::content_extractor::ExtractionError;
use crate::services::music_service::MusicApiError;
use crate::services::parameter_synthesizer::SynthesisError;
use thiserror::Error;

/// Why a single chapter produced no playlist
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ChapterFailure {
    /// Model output missing, unparseable, or rejected by validation
    #[error("parameter synthesis failed: {0}")]
    Synthesis(#[from] SynthesisError),

    /// Music-service call failed permanently or after retries
    #[error("music service error: {0}")]
    Service(#[from] MusicApiError),

    /// Track/artist name resolution left the query without any seed
    #[error("no seeds left after resolving track and artist names")]
    NoSeeds,

    /// Recommendation query returned no tracks
    #[error("recommendation query returned no tracks")]
    EmptyResult,
}

/// Failures that end the run
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A client could not be constructed (credentials, connectivity)
    #[error("initialisation failed: {0}")]
    FatalInit(String),

    #[error("chapter extraction failed: {0}")]
    ExtractionExhausted(#[from] ExtractionError),
}

impl From<chaptertune_common::Error> for PipelineError {
    fn from(err: chaptertune_common::Error) -> Self {
        PipelineError::FatalInit(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validators::parameter_validator::ValidationError;

    #[test]
    fn test_chapter_failure_messages() {
        let failure = ChapterFailure::from(SynthesisError::Validation(ValidationError::InvalidLimit(0.into())));
        assert_eq!(
            failure.to_string(),
            "parameter synthesis failed: parameters rejected: limit = 0 must be an integer in 1..=50"
        );
        assert_eq!(
            ChapterFailure::from(MusicApiError::RateLimited { retry_after: None }),
            ChapterFailure::Service(MusicApiError::RateLimited { retry_after: None })
        );
    }

    #[test]
    fn test_config_error_is_fatal() {
        let err = PipelineError::from(chaptertune_common::Error::Config("OPENAI_API_KEY not set".into()));
        assert!(matches!(err, PipelineError::FatalInit(msg) if msg.contains("OPENAI_API_KEY")));
    }
}
