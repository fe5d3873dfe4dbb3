//! In-memory music service

use async_trait::async_trait;
use chaptertune::models::{Playlist, Track};
use chaptertune::services::{MusicApiError, MusicService, RecommendationQuery};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

/// Playlist state as written through the service
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedPlaylist {
    pub id: String,
    pub name: String,
    pub public: bool,
    pub uris: Vec<String>,
    pub description: Option<String>,
}

#[derive(Default)]
struct State {
    genres: Vec<String>,
    track_ids: HashMap<String, String>,
    artist_ids: HashMap<String, String>,
    recommendation_results: VecDeque<Vec<Track>>,
    failures: HashMap<&'static str, VecDeque<MusicApiError>>,
    calls: Vec<String>,
    queries: Vec<RecommendationQuery>,
    playlists: Vec<RecordedPlaylist>,
}

/// Music service double with injectable failures
///
/// Failures queued per operation name (`genre_seeds`, `search_track`,
/// `search_artist`, `recommendations`, `create_playlist`, `add_tracks`,
/// `update_description`) are returned before the call succeeds.
#[derive(Default)]
pub struct InMemoryMusicService {
    state: Mutex<State>,
}

impl InMemoryMusicService {
    pub fn new(genres: &[&str]) -> Arc<Self> {
        let service = Self::default();
        service.state.lock().unwrap().genres = genres.iter().map(|g| g.to_string()).collect();
        Arc::new(service)
    }

    pub fn add_track(&self, name: &str, id: &str) {
        self.state.lock().unwrap().track_ids.insert(name.to_string(), id.to_string());
    }

    pub fn add_artist(&self, name: &str, id: &str) {
        self.state.lock().unwrap().artist_ids.insert(name.to_string(), id.to_string());
    }

    /// Queue the tracks returned by the next recommendation query
    pub fn push_recommendations(&self, tracks: Vec<Track>) {
        self.state.lock().unwrap().recommendation_results.push_back(tracks);
    }

    pub fn fail_next(&self, operation: &'static str, error: MusicApiError) {
        self.state
            .lock()
            .unwrap()
            .failures
            .entry(operation)
            .or_default()
            .push_back(error);
    }

    pub fn playlists(&self) -> Vec<RecordedPlaylist> {
        self.state.lock().unwrap().playlists.clone()
    }

    pub fn queries(&self) -> Vec<RecommendationQuery> {
        self.state.lock().unwrap().queries.clone()
    }

    /// Operation names in call order, failed attempts included
    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn call_count(&self, operation: &str) -> usize {
        self.state.lock().unwrap().calls.iter().filter(|c| *c == operation).count()
    }

    fn begin(&self, operation: &'static str) -> Result<(), MusicApiError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(operation.to_string());
        match state.failures.get_mut(operation).and_then(VecDeque::pop_front) {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

/// Canned tracks `<prefix>-1..=n`
pub fn tracks(prefix: &str, n: usize) -> Vec<Track> {
    (1..=n)
        .map(|i| Track {
            id: format!("{}-{}", prefix, i),
            name: format!("{} song {}", prefix, i),
            artist_name: format!("{} artist", prefix),
            uri: format!("spotify:track:{}-{}", prefix, i),
        })
        .collect()
}

#[async_trait]
impl MusicService for InMemoryMusicService {
    async fn genre_seeds(&self) -> Result<Vec<String>, MusicApiError> {
        self.begin("genre_seeds")?;
        Ok(self.state.lock().unwrap().genres.clone())
    }

    async fn search_track(&self, name: &str) -> Result<Option<String>, MusicApiError> {
        self.begin("search_track")?;
        Ok(self.state.lock().unwrap().track_ids.get(name).cloned())
    }

    async fn search_artist(&self, name: &str) -> Result<Option<String>, MusicApiError> {
        self.begin("search_artist")?;
        Ok(self.state.lock().unwrap().artist_ids.get(name).cloned())
    }

    async fn recommendations(&self, query: &RecommendationQuery) -> Result<Vec<Track>, MusicApiError> {
        self.begin("recommendations")?;
        let mut state = self.state.lock().unwrap();
        state.queries.push(query.clone());
        let n = state.queries.len();
        Ok(state
            .recommendation_results
            .pop_front()
            .unwrap_or_else(|| tracks(&format!("q{}", n), 3)))
    }

    async fn create_playlist(&self, name: &str, public: bool) -> Result<Playlist, MusicApiError> {
        self.begin("create_playlist")?;
        let mut state = self.state.lock().unwrap();
        let id = format!("pl{}", state.playlists.len() + 1);
        state.playlists.push(RecordedPlaylist {
            id: id.clone(),
            name: name.to_string(),
            public,
            uris: Vec::new(),
            description: None,
        });
        Ok(Playlist {
            public_url: format!("https://open.spotify.com/playlist/{}", id),
            id,
            description: None,
        })
    }

    async fn add_tracks(&self, playlist_id: &str, uris: &[String]) -> Result<(), MusicApiError> {
        self.begin("add_tracks")?;
        let mut state = self.state.lock().unwrap();
        let playlist = state
            .playlists
            .iter_mut()
            .find(|p| p.id == playlist_id)
            .ok_or_else(|| MusicApiError::NotFound(playlist_id.to_string()))?;
        playlist.uris.extend_from_slice(uris);
        Ok(())
    }

    async fn update_description(&self, playlist_id: &str, description: &str) -> Result<(), MusicApiError> {
        self.begin("update_description")?;
        let mut state = self.state.lock().unwrap();
        let playlist = state
            .playlists
            .iter_mut()
            .find(|p| p.id == playlist_id)
            .ok_or_else(|| MusicApiError::NotFound(playlist_id.to_string()))?;
        playlist.description = Some(description.to_string());
        Ok(())
    }
}
