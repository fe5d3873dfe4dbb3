//! Service modules for the book-to-playlist pipeline
//!
//! External clients (text model, music service) sit behind traits so the
//! pipeline components can be driven by test doubles.

pub mod content_extractor;
pub mod llm_client;
pub mod music_service;
pub mod parameter_synthesizer;
pub mod playlist_assembler;
pub mod spotify_client;

pub use content_extractor::{ContentExtractor, ExtractionError, ExtractionSettings};
pub use llm_client::{CompletionRequest, LlmError, OpenAiClient, TextGenerator};
pub use music_service::{MusicApiError, MusicService, RecommendationQuery};
pub use parameter_synthesizer::{ParameterSynthesizer, SynthesisError, SynthesisRequest, SynthesisSettings};
pub use playlist_assembler::{AssemblyRequest, PlaylistAssembler, PlaylistOutcome};
pub use spotify_client::{SpotifyClient, SpotifyCredentials};
