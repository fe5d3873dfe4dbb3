//! # chaptertune common library
//!
//! Shared code for the chaptertune workspace:
//! - Error type and result alias
//! - TOML configuration model and multi-tier setting resolution
//! - Logging (tracing subscriber) initialisation

pub mod config;
pub mod error;
pub mod logging;

pub use error::{Error, Result};
