//! Music service abstraction
//!
//! Every component that talks to the streaming service receives a
//! `&dyn MusicService` explicitly, so tests can substitute an in-memory double.

use crate::models::{AudioTargets, Playlist, SeedSet, Track};
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Music service errors
///
/// `RateLimited` and `Connectivity` are transient and retried by the
/// invoker; everything else fails the call immediately.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MusicApiError {
    #[error("Rate limit exceeded (retry after {retry_after:?})")]
    RateLimited { retry_after: Option<Duration> },

    #[error("Connectivity error: {0}")]
    Connectivity(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("Request error: {0}")]
    Request(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

impl MusicApiError {
    /// Classify a non-success HTTP response
    ///
    /// `retry_after` is the raw `Retry-After` header value (seconds).
    pub fn from_status(status: u16, retry_after: Option<&str>, body: String) -> Self {
        match status {
            429 => MusicApiError::RateLimited {
                retry_after: parse_retry_after(retry_after),
            },
            401 | 403 => MusicApiError::Unauthorized(body),
            404 => MusicApiError::NotFound(body),
            502..=504 => MusicApiError::Connectivity(format!("HTTP {}: {}", status, body)),
            _ => MusicApiError::Api(status, body),
        }
    }

    /// Classify a transport-level failure
    ///
    /// Failures while sending the request or reading the body (resets,
    /// connections closed mid-exchange) count as connectivity.
    pub fn from_transport(err: &reqwest::Error) -> Self {
        if err.is_connect() || err.is_timeout() || err.is_request() || err.is_body() {
            MusicApiError::Connectivity(err.to_string())
        } else if err.is_decode() {
            MusicApiError::Parse(err.to_string())
        } else {
            MusicApiError::Request(err.to_string())
        }
    }
}

/// Parse a `Retry-After` header given in whole seconds
pub fn parse_retry_after(value: Option<&str>) -> Option<Duration> {
    value
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

/// Outbound recommendation query
///
/// Track and artist seeds hold service-native IDs, not names.
#[derive(Debug, Clone, PartialEq)]
pub struct RecommendationQuery {
    pub seeds: SeedSet,
    pub targets: AudioTargets,
    pub min_instrumentalness: Option<f64>,
    pub limit: u32,
}

impl RecommendationQuery {
    /// Query-string pairs; seed values are comma-joined
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs: Vec<(String, String)> = self
            .seeds
            .iter()
            .map(|(category, values)| (category.key().to_string(), values.join(",")))
            .collect();

        pairs.extend(
            self.targets
                .pairs()
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string())),
        );

        if let Some(min) = self.min_instrumentalness {
            pairs.push(("min_instrumentalness".to_string(), min.to_string()));
        }
        pairs.push(("limit".to_string(), self.limit.to_string()));
        pairs
    }
}

/// Streaming-service operations used by the pipeline
#[async_trait]
pub trait MusicService: Send + Sync {
    /// Genre strings accepted as recommendation seeds
    async fn genre_seeds(&self) -> Result<Vec<String>, MusicApiError>;

    /// Best-match track ID for a free-text name, `None` if nothing matched
    async fn search_track(&self, name: &str) -> Result<Option<String>, MusicApiError>;

    /// Best-match artist ID for a free-text name, `None` if nothing matched
    async fn search_artist(&self, name: &str) -> Result<Option<String>, MusicApiError>;

    async fn recommendations(&self, query: &RecommendationQuery) -> Result<Vec<Track>, MusicApiError>;

    async fn create_playlist(&self, name: &str, public: bool) -> Result<Playlist, MusicApiError>;

    /// Append track URIs in the given order
    async fn add_tracks(&self, playlist_id: &str, uris: &[String]) -> Result<(), MusicApiError>;

    async fn update_description(&self, playlist_id: &str, description: &str) -> Result<(), MusicApiError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SeedCategory;

    #[test]
    fn test_status_classification() {
        assert_eq!(
            MusicApiError::from_status(429, Some("7"), String::new()),
            MusicApiError::RateLimited {
                retry_after: Some(Duration::from_secs(7))
            }
        );
        assert_eq!(
            MusicApiError::from_status(429, None, String::new()),
            MusicApiError::RateLimited { retry_after: None }
        );
        assert!(matches!(
            MusicApiError::from_status(401, None, "expired".into()),
            MusicApiError::Unauthorized(_)
        ));
        assert!(matches!(
            MusicApiError::from_status(503, None, String::new()),
            MusicApiError::Connectivity(_)
        ));
        assert_eq!(
            MusicApiError::from_status(400, None, "bad".into()),
            MusicApiError::Api(400, "bad".into())
        );
    }

    #[tokio::test]
    async fn test_dropped_connection_is_connectivity() {
        use tokio::io::AsyncReadExt;
        use tokio::net::TcpListener;

        // Server reads the request, then closes without responding
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = socket.read(&mut buf).await;
        });

        let err = reqwest::Client::new()
            .get(format!("http://{}/v1/me", addr))
            .send()
            .await
            .unwrap_err();
        server.await.unwrap();

        assert!(matches!(
            MusicApiError::from_transport(&err),
            MusicApiError::Connectivity(_)
        ));
    }

    #[tokio::test]
    async fn test_refused_connection_is_connectivity() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = reqwest::Client::new()
            .get(format!("http://{}/v1/me", addr))
            .send()
            .await
            .unwrap_err();

        assert!(matches!(
            MusicApiError::from_transport(&err),
            MusicApiError::Connectivity(_)
        ));
    }

    #[test]
    fn test_retry_after_parsing() {
        assert_eq!(parse_retry_after(Some(" 12 ")), Some(Duration::from_secs(12)));
        assert_eq!(parse_retry_after(Some("soon")), None);
        assert_eq!(parse_retry_after(None), None);
    }

    #[test]
    fn test_query_pairs() {
        let query = RecommendationQuery {
            seeds: SeedSet::new()
                .with(SeedCategory::Genres, &["ambient", "piano"])
                .with(SeedCategory::Tracks, &["4uLU6hMCjMI75M1A2tKUQC"]),
            targets: AudioTargets {
                valence: 0.4,
                energy: 0.3,
                tempo: 90.0,
                acousticness: None,
                danceability: Some(0.2),
                instrumentalness: None,
                speechiness: None,
            },
            min_instrumentalness: Some(0.5),
            limit: 25,
        };

        let pairs = query.query_pairs();
        assert_eq!(pairs[0], ("seed_genres".to_string(), "ambient,piano".to_string()));
        assert_eq!(pairs[1], ("seed_tracks".to_string(), "4uLU6hMCjMI75M1A2tKUQC".to_string()));
        assert!(pairs.contains(&("target_danceability".to_string(), "0.2".to_string())));
        assert!(pairs.contains(&("min_instrumentalness".to_string(), "0.5".to_string())));
        assert_eq!(pairs.last(), Some(&("limit".to_string(), "25".to_string())));
    }
}
