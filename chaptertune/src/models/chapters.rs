//! Chapter structure extracted from free-text book notes
//!
//! The model response is parsed into a generic JSON tree first and then
//! converted field by field, so malformed output never reaches the domain types.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Reasons a chapter-extraction response is rejected as malformed
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ChapterParseError {
    #[error("response is not a JSON object")]
    NotAnObject,

    #[error("missing or invalid 'num_chapters' (expected positive integer)")]
    InvalidChapterCount,

    #[error("missing or invalid 'chapters' array")]
    MissingChapters,

    #[error("chapter list is empty")]
    EmptyChapters,

    #[error("chapter entry {index} is malformed: {reason}")]
    InvalidEntry { index: usize, reason: &'static str },

    #[error("chapter number {0} appears more than once")]
    DuplicateNumber(u32),

    #[error("chapter numbers are not consecutive from 1 (expected {expected}, found {found})")]
    NonConsecutive { expected: u32, found: u32 },
}

/// One chapter and its summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterRecord {
    /// 1-based chapter number
    pub number: u32,
    pub summary: String,
}

/// Ordered chapter list for one book
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookChapters {
    /// Chapter count as reported by the model (advisory)
    pub chapter_count: u32,
    /// Chapters sorted by ascending number
    pub chapters: Vec<ChapterRecord>,
}

impl BookChapters {
    /// Convert a parsed model response into chapters
    ///
    /// Expected shape: `{"num_chapters": int, "chapters": [{"number": int, "summary": string}]}`.
    /// Chapters are sorted by number; numbers must be unique and form `1..=n`.
    pub fn from_json(value: &Value) -> Result<Self, ChapterParseError> {
        let object = value.as_object().ok_or(ChapterParseError::NotAnObject)?;

        let chapter_count = object
            .get("num_chapters")
            .and_then(Value::as_u64)
            .filter(|n| *n > 0)
            .and_then(|n| u32::try_from(n).ok())
            .ok_or(ChapterParseError::InvalidChapterCount)?;

        let entries = object
            .get("chapters")
            .and_then(Value::as_array)
            .ok_or(ChapterParseError::MissingChapters)?;

        if entries.is_empty() {
            return Err(ChapterParseError::EmptyChapters);
        }

        let mut chapters = entries
            .iter()
            .enumerate()
            .map(|(index, entry)| parse_entry(index, entry))
            .collect::<Result<Vec<_>, _>>()?;

        chapters.sort_by_key(|c| c.number);

        for (position, chapter) in chapters.iter().enumerate() {
            let expected = position as u32 + 1;
            if chapter.number == expected {
                continue;
            }
            if position > 0 && chapters[position - 1].number == chapter.number {
                return Err(ChapterParseError::DuplicateNumber(chapter.number));
            }
            return Err(ChapterParseError::NonConsecutive {
                expected,
                found: chapter.number,
            });
        }

        Ok(Self {
            chapter_count,
            chapters,
        })
    }

    /// True when the reported chapter count equals the number of chapters returned
    pub fn count_matches(&self) -> bool {
        self.chapters.len() == self.chapter_count as usize
    }
}

fn parse_entry(index: usize, entry: &Value) -> Result<ChapterRecord, ChapterParseError> {
    let object = entry.as_object().ok_or(ChapterParseError::InvalidEntry {
        index,
        reason: "not an object",
    })?;

    let number = object
        .get("number")
        .and_then(Value::as_u64)
        .filter(|n| *n > 0)
        .and_then(|n| u32::try_from(n).ok())
        .ok_or(ChapterParseError::InvalidEntry {
            index,
            reason: "'number' must be a positive integer",
        })?;

    let summary = object
        .get("summary")
        .and_then(Value::as_str)
        .ok_or(ChapterParseError::InvalidEntry {
            index,
            reason: "'summary' must be a string",
        })?;

    Ok(ChapterRecord {
        number,
        summary: summary.trim().to_string(),
    })
}
