use crate::models::{ArtistInfo, AudioFeatures, PlaylistPage, TrackRecord};
use anyhow::Result;
use std::collections::{HashMap, HashSet};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Upstream limit on track IDs per audio-features request
pub const MAX_AUDIO_FEATURE_BATCH: usize = 100;
/// Upstream limit on artist IDs per artists request
pub const MAX_ARTIST_BATCH: usize = 50;
/// Upstream limit on items per playlist page
pub const MAX_PLAYLIST_PAGE: usize = 100;

const PLAYLIST_URL_MARKER: &str = "open.spotify.com/playlist";

/// Failures reported by a catalog client
#[derive(Error, Debug)]
pub enum CatalogError {
    /// The provider refused the capability outright (restricted or deprecated endpoint)
    #[error("catalog capability unavailable (HTTP {status})")]
    Unavailable { status: u16 },

    #[error("catalog request failed with HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("catalog transport error: {0}")]
    Transport(String),

    #[error("failed to decode catalog response: {0}")]
    Decode(String),
}

/// Read access to a music catalog. Implementations perform blocking calls.
#[cfg_attr(test, mockall::automock)]
pub trait CatalogClient {
    /// Fetch one page of playlist items starting at `offset`
    fn list_playlist_tracks(
        &self,
        playlist_id: &str,
        page_size: usize,
        offset: usize,
    ) -> Result<PlaylistPage, CatalogError>;

    /// Fetch audio features for at most 100 tracks; entries are null for unknown tracks
    fn get_audio_features(
        &self,
        track_ids: &[String],
    ) -> Result<Vec<Option<AudioFeatures>>, CatalogError>;

    /// Fetch artist info for at most 50 artists; entries are null for unknown artists
    fn get_artists(&self, artist_ids: &[String]) -> Result<Vec<Option<ArtistInfo>>, CatalogError>;
}

/// Outcome of the audio-feature fetch. `Unavailable` is the tolerated degraded mode.
#[derive(Debug, Clone, PartialEq)]
pub enum AudioFeatureFetch {
    Available(HashMap<String, AudioFeatures>),
    Unavailable,
}

impl AudioFeatureFetch {
    /// Features keyed by track ID; empty when the capability was unavailable
    pub fn into_features(self) -> HashMap<String, AudioFeatures> {
        match self {
            AudioFeatureFetch::Available(features) => features,
            AudioFeatureFetch::Unavailable => HashMap::new(),
        }
    }
}

/// Reduce a playlist URL to its bare identifier. Anything that is not a
/// playlist URL is returned unchanged; validation is left to the catalog.
pub fn extract_playlist_id(playlist_ref: &str) -> String {
    if playlist_ref.contains(PLAYLIST_URL_MARKER) {
        if let Some((_, rest)) = playlist_ref.split_once("playlist/") {
            let id: String = rest
                .chars()
                .take_while(|c| c.is_ascii_alphanumeric())
                .collect();
            if !id.is_empty() {
                return id;
            }
        }
    }
    playlist_ref.to_string()
}

/// Load every track of a playlist in playlist order, keeping the first listed artist
pub fn load_playlist_tracks(
    client: &dyn CatalogClient,
    playlist_id: &str,
    page_size: usize,
) -> Result<Vec<TrackRecord>> {
    let page_size = page_size.clamp(1, MAX_PLAYLIST_PAGE);
    let mut tracks = Vec::new();
    let mut offset = 0;

    loop {
        let page = client.list_playlist_tracks(playlist_id, page_size, offset)?;
        if page.items.is_empty() {
            break;
        }
        debug!(offset, items = page.items.len(), "Fetched playlist page");

        for item in page.items {
            let Some(track) = item.track else {
                continue;
            };
            // Skip podcast episodes and anything else that is not a track
            if track.item_type != "track" {
                continue;
            }
            let Some(main_artist) = track.artists.into_iter().next() else {
                continue;
            };

            let (album_release_date, album_image_url) = match track.album {
                Some(album) => (
                    album.release_date,
                    album.images.into_iter().next().map(|image| image.url),
                ),
                None => (None, None),
            };

            tracks.push(TrackRecord {
                track_id: track.id,
                track_name: track.name,
                artist_id: main_artist.id,
                artist_name: main_artist.name,
                album_release_date,
                album_image_url,
            });
        }

        if !page.has_next {
            break;
        }
        offset += page_size;
    }

    info!("Loaded {} playlist tracks", tracks.len());
    Ok(tracks)
}

/// Batch-fetch audio features. A provider refusal of the capability yields
/// `AudioFeatureFetch::Unavailable`; every other failure is returned as an error.
pub fn fetch_audio_features(
    client: &dyn CatalogClient,
    track_ids: &[String],
    batch_size: usize,
) -> Result<AudioFeatureFetch> {
    let batch_size = batch_size.clamp(1, MAX_AUDIO_FEATURE_BATCH);
    let track_ids = unique_ids(track_ids);
    let mut features = HashMap::new();

    for batch in track_ids.chunks(batch_size) {
        match client.get_audio_features(batch) {
            Ok(entries) => {
                for entry in entries.into_iter().flatten() {
                    features.insert(entry.id.clone(), entry);
                }
            }
            Err(CatalogError::Unavailable { status }) => {
                warn!(
                    status,
                    "Could not fetch audio features, continuing without them"
                );
                return Ok(AudioFeatureFetch::Unavailable);
            }
            Err(e) => return Err(e.into()),
        }
    }

    debug!("Fetched audio features for {} tracks", features.len());
    Ok(AudioFeatureFetch::Available(features))
}

/// Batch-fetch artist info for the de-duplicated artist IDs, in first-seen order
pub fn fetch_artist_info(
    client: &dyn CatalogClient,
    artist_ids: &[String],
    batch_size: usize,
) -> Result<Vec<ArtistInfo>> {
    let batch_size = batch_size.clamp(1, MAX_ARTIST_BATCH);
    let artist_ids = unique_ids(artist_ids);
    let mut artists = Vec::with_capacity(artist_ids.len());

    for batch in artist_ids.chunks(batch_size) {
        let entries = client.get_artists(batch)?;
        artists.extend(entries.into_iter().flatten());
    }

    debug!("Fetched info for {} artists", artists.len());
    Ok(artists)
}

fn unique_ids(ids: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    ids.iter()
        .filter(|id| seen.insert(id.as_str()))
        .cloned()
        .collect()
}
