//! chaptertune library interface
//!
//! Exposes the pipeline components for the binary and for integration testing.

pub mod config;
pub mod error;
pub mod models;
pub mod presets;
pub mod services;
pub mod utils;
pub mod validators;
pub mod workflow;

pub use crate::error::{ChapterFailure, PipelineError};
