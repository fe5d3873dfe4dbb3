//! Music-service entities handled during one chapter

use serde::{Deserialize, Serialize};

/// Track returned by a recommendation query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub id: String,
    pub name: String,
    /// First credited artist
    pub artist_name: String,
    pub uri: String,
}

/// Playlist created for one chapter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Playlist {
    pub id: String,
    pub public_url: String,
    /// Set by a separate update after creation
    pub description: Option<String>,
}

/// Playlist name for a chapter: `"<book_title> - Chapter <n>"`
pub fn chapter_playlist_name(book_title: &str, chapter_number: u32) -> String {
    format!("{} - Chapter {}", book_title.trim(), chapter_number)
}
