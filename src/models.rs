use serde::{Deserialize, Serialize};

/// One entry of a playlist listing. `track` is null for removed or unavailable items.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaylistItem {
    pub track: Option<TrackObject>,
}

/// Track (or episode) object as returned inside a playlist listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackObject {
    pub id: Option<String>, // null for local files
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub item_type: String, // "track" or "episode"
    #[serde(default)]
    pub artists: Vec<ArtistRef>,
    pub album: Option<Album>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtistRef {
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Album {
    pub release_date: Option<String>,
    #[serde(default)]
    pub images: Vec<Image>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Image {
    pub url: String,
}

/// Response structure for the playlist items endpoint
#[derive(Debug, Deserialize)]
pub struct PlaylistItemsResponse {
    #[serde(default)]
    pub items: Vec<PlaylistItem>,
    pub next: Option<String>,
}

/// A single page of playlist items, independent of the wire format
#[derive(Debug, Clone, Default)]
pub struct PlaylistPage {
    pub items: Vec<PlaylistItem>,
    pub has_next: bool,
}

impl From<PlaylistItemsResponse> for PlaylistPage {
    fn from(response: PlaylistItemsResponse) -> Self {
        PlaylistPage {
            items: response.items,
            has_next: response.next.is_some(),
        }
    }
}

/// Raw audio-feature vector for a track. Every numeric field is optional so a
/// partially populated record still deserializes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AudioFeatures {
    pub id: String,
    pub energy: Option<f64>,
    pub valence: Option<f64>,
    pub danceability: Option<f64>,
    pub loudness: Option<f64>,
    pub speechiness: Option<f64>,
    pub acousticness: Option<f64>,
    pub instrumentalness: Option<f64>,
    pub tempo: Option<f64>,
    pub duration_ms: Option<f64>,
    pub liveness: Option<f64>,
    pub key: Option<f64>,
    pub mode: Option<f64>,
    pub time_signature: Option<f64>,
}

/// Response structure for the batched audio-features endpoint
#[derive(Debug, Deserialize)]
pub struct AudioFeaturesResponse {
    #[serde(default)]
    pub audio_features: Vec<Option<AudioFeatures>>,
}

/// Full artist object as returned by the batched artists endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artist {
    pub id: String,
    pub popularity: Option<u32>,
    pub followers: Option<Followers>,
    #[serde(default)]
    pub genres: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Followers {
    pub total: Option<u64>,
}

/// Response structure for the batched artists endpoint
#[derive(Debug, Deserialize)]
pub struct ArtistsResponse {
    #[serde(default)]
    pub artists: Vec<Option<Artist>>,
}

/// Track-level metadata for one playlist entry, main artist only
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackRecord {
    pub track_id: Option<String>,
    pub track_name: String,
    pub artist_id: Option<String>,
    pub artist_name: String,
    pub album_release_date: Option<String>,
    pub album_image_url: Option<String>,
}

/// Popularity, follower count and genres for one artist, missing sub-fields defaulted
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArtistInfo {
    pub artist_id: String,
    pub popularity: u32,
    pub followers: u64,
    pub genres: Vec<String>,
}

impl From<Artist> for ArtistInfo {
    fn from(artist: Artist) -> Self {
        ArtistInfo {
            artist_id: artist.id,
            popularity: artist.popularity.unwrap_or(0),
            followers: artist.followers.and_then(|f| f.total).unwrap_or(0),
            genres: artist.genres,
        }
    }
}
