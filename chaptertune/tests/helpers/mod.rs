//! Test Helper Utilities
//!
//! Test doubles for the text model, the music service and the retry clock.

#![allow(dead_code)]

pub mod in_memory_music;
pub mod recording_sleeper;
pub mod scripted_generator;

pub use in_memory_music::{tracks, InMemoryMusicService, RecordedPlaylist};
pub use recording_sleeper::RecordingSleeper;
pub use scripted_generator::{chapters_json, ScriptedGenerator};
