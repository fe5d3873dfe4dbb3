//! Playlist assembly for one chapter
//!
//! Resolves seed names, queries recommendations, creates a private playlist,
//! adds the tracks and writes a description. Every music-service call goes
//! through the [`RateLimitedInvoker`]. Creation and description update are
//! separate calls: a failed description leaves the playlist in place.

use super::music_service::{MusicService, RecommendationQuery};
use crate::error::ChapterFailure;
use crate::models::{chapter_playlist_name, Playlist, RecommendationParameters, SeedCategory, SeedSet, VocalPreference};
use crate::utils::api_retry::RateLimitedInvoker;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Description length limit of the music service
pub const MAX_DESCRIPTION_CHARS: usize = 300;

const SAMPLE_TRACKS_LOGGED: usize = 5;

/// Inputs for one chapter's playlist
#[derive(Debug, Clone, Copy)]
pub struct AssemblyRequest<'a> {
    pub book_title: &'a str,
    pub chapter_number: u32,
    pub parameters: &'a RecommendationParameters,
    pub vocal_preference: VocalPreference,
    /// Takes precedence over the preference when within [0, 1]
    pub min_instrumentalness_override: Option<f64>,
}

/// A created playlist
#[derive(Debug, Clone, PartialEq)]
pub struct PlaylistOutcome {
    pub playlist: Playlist,
    pub track_count: usize,
}

/// Builds one playlist per chapter on the music service
pub struct PlaylistAssembler {
    service: Arc<dyn MusicService>,
    invoker: RateLimitedInvoker,
    write_descriptions: bool,
}

impl PlaylistAssembler {
    pub fn new(service: Arc<dyn MusicService>, invoker: RateLimitedInvoker, write_descriptions: bool) -> Self {
        Self {
            service,
            invoker,
            write_descriptions,
        }
    }

    pub async fn assemble(&self, request: AssemblyRequest<'_>) -> Result<PlaylistOutcome, ChapterFailure> {
        let chapter = request.chapter_number;
        let parameters = request.parameters;

        // 1. Track and artist names → service IDs
        let seeds = self.resolve_seeds(chapter, &parameters.seeds).await;
        if seeds.total() == 0 {
            return Err(ChapterFailure::NoSeeds);
        }

        // 2. Effective instrumentalness floor
        let min_instrumentalness = effective_min_instrumentalness(
            request.vocal_preference,
            request.min_instrumentalness_override,
            parameters.min_instrumentalness,
        );

        // 3. Recommendations
        let query = RecommendationQuery {
            seeds,
            targets: parameters.targets.clone(),
            min_instrumentalness,
            limit: parameters.limit,
        };
        let tracks = self
            .invoker
            .invoke("get recommendations", || self.service.recommendations(&query))
            .await?;

        // 4. Nothing to put in a playlist
        if tracks.is_empty() {
            return Err(ChapterFailure::EmptyResult);
        }

        info!(chapter, tracks = tracks.len(), "Received recommendations");
        for track in tracks.iter().take(SAMPLE_TRACKS_LOGGED) {
            info!(chapter, "  {} by {}", track.name, track.artist_name);
        }

        // 5. Private playlist
        let name = chapter_playlist_name(request.book_title, chapter);
        let mut playlist = self
            .invoker
            .invoke("create playlist", || self.service.create_playlist(&name, false))
            .await?;
        info!(chapter, playlist_id = %playlist.id, name = %name, "Created playlist");

        // 6. Tracks in received order
        let uris: Vec<String> = tracks.iter().map(|t| t.uri.clone()).collect();
        self.invoker
            .invoke("add tracks", || self.service.add_tracks(&playlist.id, &uris))
            .await?;

        // 7. Description, applied separately
        if self.write_descriptions {
            let final_parameters = RecommendationParameters {
                min_instrumentalness,
                ..parameters.clone()
            };
            let description = render_description(&final_parameters, request.vocal_preference);

            let result = self
                .invoker
                .invoke("update description", || {
                    self.service.update_description(&playlist.id, &description)
                })
                .await;

            match result {
                Ok(()) => {
                    debug!(chapter, description = %description, "Playlist description updated");
                    playlist.description = Some(description);
                }
                Err(err) => {
                    warn!(
                        chapter,
                        playlist_id = %playlist.id,
                        error = %err,
                        "Failed to update playlist description; keeping playlist"
                    );
                }
            }
        }

        Ok(PlaylistOutcome {
            playlist,
            track_count: uris.len(),
        })
    }

    /// Replace track and artist names with IDs, dropping names that do not resolve
    async fn resolve_seeds(&self, chapter: u32, seeds: &SeedSet) -> SeedSet {
        let mut resolved = SeedSet::new();

        for (category, values) in seeds.iter() {
            if category == SeedCategory::Genres {
                resolved.insert(category, values.to_vec());
                continue;
            }

            let mut ids = Vec::with_capacity(values.len());
            for name in values {
                let result = match category {
                    SeedCategory::Tracks => {
                        self.invoker
                            .invoke("search track", || self.service.search_track(name))
                            .await
                    }
                    _ => {
                        self.invoker
                            .invoke("search artist", || self.service.search_artist(name))
                            .await
                    }
                };

                match result {
                    Ok(Some(id)) => {
                        debug!(chapter, category = category.key(), name = %name, id = %id, "Resolved seed");
                        ids.push(id);
                    }
                    Ok(None) => {
                        warn!(chapter, category = category.key(), name = %name, "No match for seed, dropping it");
                    }
                    Err(err) => {
                        warn!(
                            chapter,
                            category = category.key(),
                            name = %name,
                            error = %err,
                            "Seed lookup failed, dropping it"
                        );
                    }
                }
            }
            resolved.insert(category, ids);
        }

        resolved
    }
}

/// Instrumentalness floor sent with the query
///
/// A valid override wins. Otherwise `i` → 0.5, `v` → 0.0, and `b` keeps
/// whatever the synthesized parameters carry.
pub fn effective_min_instrumentalness(
    preference: VocalPreference,
    override_value: Option<f64>,
    synthesized: Option<f64>,
) -> Option<f64> {
    if let Some(value) = override_value {
        if (0.0..=1.0).contains(&value) {
            return Some(value);
        }
        warn!(value, "Ignoring min_instrumentalness override outside [0, 1]");
    }

    match preference {
        VocalPreference::Both => synthesized,
        other => other.min_instrumentalness(),
    }
}

/// `key: value; ` rendering of the final parameters, cut to the description limit
pub fn render_description(parameters: &RecommendationParameters, preference: VocalPreference) -> String {
    let mut pairs = parameters.rendered_pairs();
    pairs.push(("vocal_preference".to_string(), preference.code().to_string()));

    let rendered: String = pairs
        .iter()
        .map(|(key, value)| format!("{}: {}; ", key, value))
        .collect();

    rendered.trim_end().chars().take(MAX_DESCRIPTION_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AudioTargets;

    fn parameters() -> RecommendationParameters {
        RecommendationParameters {
            seeds: SeedSet::new().with(SeedCategory::Genres, &["ambient", "piano"]),
            targets: AudioTargets {
                valence: 0.4,
                energy: 0.3,
                tempo: 90.0,
                acousticness: Some(0.8),
                danceability: None,
                instrumentalness: None,
                speechiness: None,
            },
            min_instrumentalness: None,
            limit: 20,
        }
    }

    #[test]
    fn test_override_takes_precedence() {
        assert_eq!(
            effective_min_instrumentalness(VocalPreference::Vocal, Some(0.7), None),
            Some(0.7)
        );
        assert_eq!(
            effective_min_instrumentalness(VocalPreference::Instrumental, None, Some(0.1)),
            Some(0.5)
        );
        assert_eq!(
            effective_min_instrumentalness(VocalPreference::Vocal, None, None),
            Some(0.0)
        );
        assert_eq!(effective_min_instrumentalness(VocalPreference::Both, None, None), None);
        assert_eq!(
            effective_min_instrumentalness(VocalPreference::Both, None, Some(0.3)),
            Some(0.3)
        );
    }

    #[test]
    fn test_out_of_range_override_is_ignored() {
        assert_eq!(
            effective_min_instrumentalness(VocalPreference::Instrumental, Some(1.5), None),
            Some(0.5)
        );
    }

    #[test]
    fn test_description_rendering() {
        let description = render_description(&parameters(), VocalPreference::Both);
        assert_eq!(
            description,
            "seed_genres: ambient, piano; target_valence: 0.4; target_energy: 0.3; \
             target_tempo: 90; target_acousticness: 0.8; limit: 20; vocal_preference: b;"
        );
    }

    #[test]
    fn test_description_truncated_on_char_boundary() {
        let mut params = parameters();
        let long: Vec<String> = (0..60).map(|i| format!("ümlaut-{}", i)).collect();
        params.seeds.insert(SeedCategory::Genres, long);

        let description = render_description(&params, VocalPreference::Instrumental);
        assert_eq!(description.chars().count(), MAX_DESCRIPTION_CHARS);
        assert!(description.starts_with("seed_genres: ümlaut-0, "));
    }
}
