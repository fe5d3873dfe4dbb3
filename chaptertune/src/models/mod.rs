//! Data models for chaptertune
//!
//! Chapters, recommendation parameters, music-service entities and run inputs.
//! All of them live for a single run; nothing is cached across runs.

pub mod chapters;
pub mod parameters;
pub mod playlist;
pub mod run_inputs;

pub use chapters::{BookChapters, ChapterParseError, ChapterRecord};
pub use parameters::{
    AudioTargets, CandidateParameters, ParameterParseError, RecommendationParameters, SeedCategory,
    SeedSet, MAX_TOTAL_SEEDS,
};
pub use playlist::{chapter_playlist_name, Playlist, Track};
pub use run_inputs::{RunInputs, VocalPreference};
