//! Per-book workflow engine
//!
//! Extracts chapters once, then processes each chapter sequentially:
//! parameter synthesis followed by playlist assembly. A chapter's failure is
//! recorded in the [`RunSummary`] and the run continues with the next one.

pub mod pipeline;

use crate::error::ChapterFailure;
use chrono::{DateTime, Utc};

pub use pipeline::{Pipeline, PipelineConfig};

/// Progress events emitted during a run
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    ChaptersExtracted { count: usize },
    ChapterStarted { chapter: u32, total: usize },
    ChapterCompleted { chapter: u32, url: String },
    ChapterSkipped { chapter: u32, reason: String },
    RunCompleted { created: usize, skipped: usize },
}

/// Playlist created for a chapter
#[derive(Debug, Clone, PartialEq)]
pub struct CreatedPlaylist {
    pub chapter: u32,
    pub url: String,
    pub track_count: usize,
    /// `None` when descriptions are disabled or the update failed
    pub description: Option<String>,
}

/// Chapter that produced no playlist
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedChapter {
    pub chapter: u32,
    pub reason: ChapterFailure,
}

/// Outcome of one run
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub book_title: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub created: Vec<CreatedPlaylist>,
    pub skipped: Vec<SkippedChapter>,
}

impl RunSummary {
    pub fn start(book_title: &str) -> Self {
        Self {
            book_title: book_title.to_string(),
            started_at: Utc::now(),
            finished_at: None,
            created: Vec::new(),
            skipped: Vec::new(),
        }
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    /// Wall-clock duration in milliseconds (0 while running)
    pub fn duration_ms(&self) -> i64 {
        self.finished_at
            .map(|end| (end - self.started_at).num_milliseconds())
            .unwrap_or(0)
    }
}
