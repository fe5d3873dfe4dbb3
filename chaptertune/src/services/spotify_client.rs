//! Spotify Web API client
//!
//! Implements [`MusicService`] against `https://api.spotify.com/v1`.
//! Retry is not handled here: every method performs exactly one request and
//! classifies failures into [`MusicApiError`] for the invoker to act on.

use super::music_service::{MusicApiError, MusicService, RecommendationQuery};
use crate::models::{Playlist, Track};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const SPOTIFY_API_BASE: &str = "https://api.spotify.com/v1";
const SPOTIFY_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
const USER_AGENT: &str = concat!("chaptertune/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT_SECS: u64 = 10;
/// Spotify accepts at most 100 URIs per add-items request
const MAX_URIS_PER_REQUEST: usize = 100;

/// Credentials for a user-authorised session
///
/// With a refresh token (plus client id and secret) a fresh access token is
/// obtained at connect time; otherwise `access_token` is used as-is.
#[derive(Clone, Default)]
pub struct SpotifyCredentials {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub refresh_token: Option<String>,
    pub access_token: Option<String>,
}

impl std::fmt::Debug for SpotifyCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redact = |v: &Option<String>| v.as_ref().map(|_| "<redacted>");
        f.debug_struct("SpotifyCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &redact(&self.client_secret))
            .field("refresh_token", &redact(&self.refresh_token))
            .field("access_token", &redact(&self.access_token))
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct CurrentUser {
    id: String,
}

#[derive(Debug, Deserialize)]
struct GenreSeedsResponse {
    genres: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    tracks: Option<SearchPage>,
    #[serde(default)]
    artists: Option<SearchPage>,
}

#[derive(Debug, Deserialize)]
struct SearchPage {
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    id: String,
}

#[derive(Debug, Deserialize)]
struct RecommendationsResponse {
    tracks: Vec<SpotifyTrack>,
}

#[derive(Debug, Deserialize)]
struct SpotifyTrack {
    id: String,
    name: String,
    uri: String,
    #[serde(default)]
    artists: Vec<SpotifyArtist>,
}

#[derive(Debug, Deserialize)]
struct SpotifyArtist {
    name: String,
}

impl From<SpotifyTrack> for Track {
    fn from(track: SpotifyTrack) -> Self {
        Track {
            id: track.id,
            name: track.name,
            artist_name: track
                .artists
                .into_iter()
                .next()
                .map(|a| a.name)
                .unwrap_or_else(|| "Unknown".to_string()),
            uri: track.uri,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SpotifyPlaylist {
    id: String,
    external_urls: ExternalUrls,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ExternalUrls {
    spotify: String,
}

impl From<SpotifyPlaylist> for Playlist {
    fn from(playlist: SpotifyPlaylist) -> Self {
        Playlist {
            id: playlist.id,
            public_url: playlist.external_urls.spotify,
            description: playlist.description.filter(|d| !d.is_empty()),
        }
    }
}

#[derive(Debug, Serialize)]
struct CreatePlaylistBody<'a> {
    name: &'a str,
    public: bool,
}

#[derive(Debug, Serialize)]
struct AddItemsBody<'a> {
    uris: &'a [String],
}

#[derive(Debug, Serialize)]
struct ChangeDetailsBody<'a> {
    description: &'a str,
    public: bool,
}

/// Spotify Web API client bound to one user session
pub struct SpotifyClient {
    http_client: reqwest::Client,
    api_base: String,
    access_token: String,
    user_id: String,
}

impl SpotifyClient {
    /// Authenticate and resolve the current user
    ///
    /// Any failure here is fatal for the run: nothing downstream works without
    /// an authorised client.
    pub async fn connect(credentials: &SpotifyCredentials) -> Result<Self, MusicApiError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| MusicApiError::Request(e.to_string()))?;

        let access_token = match (
            credentials.refresh_token.as_deref(),
            credentials.client_id.as_deref(),
            credentials.client_secret.as_deref(),
        ) {
            (Some(refresh_token), Some(client_id), Some(client_secret)) => {
                tracing::debug!("Exchanging Spotify refresh token for access token");
                refresh_access_token(&http_client, client_id, client_secret, refresh_token).await?
            }
            _ => credentials.access_token.clone().ok_or_else(|| {
                MusicApiError::Unauthorized(
                    "no Spotify access token or refresh token configured".to_string(),
                )
            })?,
        };

        let mut client = Self {
            http_client,
            api_base: SPOTIFY_API_BASE.to_string(),
            access_token,
            user_id: String::new(),
        };

        let me: CurrentUser = client.get_json("/me", &[]).await?;
        client.user_id = me.id;

        tracing::info!(user_id = %client.user_id, "Connected to Spotify");
        Ok(client)
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, MusicApiError> {
        let response = request
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(|e| MusicApiError::from_transport(&e))?;

        check_status(response).await
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(String, String)],
    ) -> Result<T, MusicApiError> {
        let url = format!("{}{}", self.api_base, path);
        tracing::debug!(url = %url, "Querying Spotify API");

        let response = self.send(self.http_client.get(&url).query(query)).await?;
        response
            .json()
            .await
            .map_err(|e| MusicApiError::Parse(e.to_string()))
    }

    async fn search_first(&self, name: &str, kind: &str) -> Result<Option<String>, MusicApiError> {
        let query = [
            ("q".to_string(), name.to_string()),
            ("type".to_string(), kind.to_string()),
            ("limit".to_string(), "1".to_string()),
        ];
        let response: SearchResponse = self.get_json("/search", &query).await?;

        let page = match kind {
            "track" => response.tracks,
            _ => response.artists,
        };
        Ok(page.and_then(|p| p.items.into_iter().next()).map(|item| item.id))
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, MusicApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let retry_after = response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let body = response.text().await.unwrap_or_default();

    Err(MusicApiError::from_status(
        status.as_u16(),
        retry_after.as_deref(),
        body,
    ))
}

async fn refresh_access_token(
    http_client: &reqwest::Client,
    client_id: &str,
    client_secret: &str,
    refresh_token: &str,
) -> Result<String, MusicApiError> {
    let form = [("grant_type", "refresh_token"), ("refresh_token", refresh_token)];

    let response = http_client
        .post(SPOTIFY_TOKEN_URL)
        .basic_auth(client_id, Some(client_secret))
        .form(&form)
        .send()
        .await
        .map_err(|e| MusicApiError::from_transport(&e))?;

    let token: TokenResponse = check_status(response)
        .await?
        .json()
        .await
        .map_err(|e| MusicApiError::Parse(e.to_string()))?;

    Ok(token.access_token)
}

#[async_trait]
impl MusicService for SpotifyClient {
    async fn genre_seeds(&self) -> Result<Vec<String>, MusicApiError> {
        let response: GenreSeedsResponse = self
            .get_json("/recommendations/available-genre-seeds", &[])
            .await?;
        Ok(response.genres)
    }

    async fn search_track(&self, name: &str) -> Result<Option<String>, MusicApiError> {
        self.search_first(name, "track").await
    }

    async fn search_artist(&self, name: &str) -> Result<Option<String>, MusicApiError> {
        self.search_first(name, "artist").await
    }

    async fn recommendations(&self, query: &RecommendationQuery) -> Result<Vec<Track>, MusicApiError> {
        let response: RecommendationsResponse = self
            .get_json("/recommendations", &query.query_pairs())
            .await?;
        Ok(response.tracks.into_iter().map(Track::from).collect())
    }

    async fn create_playlist(&self, name: &str, public: bool) -> Result<Playlist, MusicApiError> {
        let url = format!("{}/users/{}/playlists", self.api_base, self.user_id);
        let response = self
            .send(self.http_client.post(&url).json(&CreatePlaylistBody { name, public }))
            .await?;

        let playlist: SpotifyPlaylist = response
            .json()
            .await
            .map_err(|e| MusicApiError::Parse(e.to_string()))?;
        Ok(playlist.into())
    }

    async fn add_tracks(&self, playlist_id: &str, uris: &[String]) -> Result<(), MusicApiError> {
        let url = format!("{}/playlists/{}/tracks", self.api_base, playlist_id);
        for chunk in uris.chunks(MAX_URIS_PER_REQUEST) {
            self.send(self.http_client.post(&url).json(&AddItemsBody { uris: chunk }))
                .await?;
        }
        Ok(())
    }

    async fn update_description(&self, playlist_id: &str, description: &str) -> Result<(), MusicApiError> {
        let url = format!("{}/playlists/{}", self.api_base, playlist_id);
        self.send(self.http_client.put(&url).json(&ChangeDetailsBody {
            description,
            public: false,
        }))
        .await?;
        Ok(())
    }
}
