use super::RatingSettings;
use super::features::{
    FollowerBucket, GenreFlags, decade, extract_year, follower_bucket, genres_to_flags,
    log1p_clipped, tempo_bucket_code,
};
use crate::catalog::{CatalogClient, fetch_artist_info, fetch_audio_features};
use crate::models::{ArtistInfo, AudioFeatures, TrackRecord};
use anyhow::Result;
use serde::Serialize;
use std::collections::HashMap;
use tracing::debug;

/// Raw audio-feature columns, present on every enriched row even when the
/// catalog could not supply them
pub const AUDIO_FEATURE_COLUMNS: [&str; 9] = [
    "energy",
    "valence",
    "danceability",
    "loudness",
    "speechiness",
    "acousticness",
    "instrumentalness",
    "tempo",
    "duration_ms",
];

/// Further audio-feature columns passed through unchanged for models trained on them
pub const EXTRA_AUDIO_COLUMNS: [&str; 4] = ["liveness", "key", "mode", "time_signature"];

/// One playlist track with fetched metadata and every derived model column.
/// `None` marks a value that is missing, which is distinct from zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedTrack {
    #[serde(flatten)]
    pub record: TrackRecord,

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

    pub artist_genres: Vec<String>,
    pub year: Option<i32>,
    pub decade: Option<i32>,
    pub artist_popularity: f64,
    pub artist_followers: f64,
    pub artist_followers_log: f64,
    pub followers_bucket: FollowerBucket,
    #[serde(flatten)]
    pub genre_flags: GenreFlags,
    pub is_cover: u8, // no cover detection exists, always 0

    pub energy_valence: Option<f64>,
    pub dance_energy: Option<f64>,
    pub loudness_energy: Option<f64>,
    pub speech_energy: Option<f64>,
    pub energy_minus_valence: Option<f64>,
    pub dance_minus_acoustic: Option<f64>,
    pub instrumental_minus_speech: Option<f64>,
    pub log_tempo: Option<f64>,
    pub log_duration: Option<f64>,
    pub tempo_bucket_code: u8,
}

impl EnrichedTrack {
    /// Every numeric column addressable through [`EnrichedTrack::value`]
    pub const COLUMNS: [&'static str; 50] = [
        "energy",
        "valence",
        "danceability",
        "loudness",
        "speechiness",
        "acousticness",
        "instrumentalness",
        "tempo",
        "duration_ms",
        "liveness",
        "key",
        "mode",
        "time_signature",
        "year",
        "decade",
        "artist_popularity",
        "artist_followers",
        "artist_followers_log",
        "followers_tiny",
        "followers_small",
        "followers_medium",
        "followers_big",
        "followers_star",
        "genre_pop",
        "genre_rock",
        "genre_hip_hop",
        "genre_rap",
        "genre_r&b",
        "genre_soul",
        "genre_electronic",
        "genre_edm",
        "genre_dance",
        "genre_latin",
        "genre_country",
        "genre_jazz",
        "genre_blues",
        "genre_folk",
        "genre_metal",
        "num_genres",
        "is_cover",
        "energy_valence",
        "dance_energy",
        "loudness_energy",
        "speech_energy",
        "energy_minus_valence",
        "dance_minus_acoustic",
        "instrumental_minus_speech",
        "log_tempo",
        "log_duration",
        "tempo_bucket_code",
    ];

    pub fn has_column(column: &str) -> bool {
        Self::COLUMNS.contains(&column)
    }

    /// Numeric value of a column. `None` for missing values and unknown columns.
    pub fn value(&self, column: &str) -> Option<f64> {
        match column {
            "energy" => self.energy,
            "valence" => self.valence,
            "danceability" => self.danceability,
            "loudness" => self.loudness,
            "speechiness" => self.speechiness,
            "acousticness" => self.acousticness,
            "instrumentalness" => self.instrumentalness,
            "tempo" => self.tempo,
            "duration_ms" => self.duration_ms,
            "liveness" => self.liveness,
            "key" => self.key,
            "mode" => self.mode,
            "time_signature" => self.time_signature,
            "year" => self.year.map(f64::from),
            "decade" => self.decade.map(f64::from),
            "artist_popularity" => Some(self.artist_popularity),
            "artist_followers" => Some(self.artist_followers),
            "artist_followers_log" => Some(self.artist_followers_log),
            "is_cover" => Some(f64::from(self.is_cover)),
            "energy_valence" => self.energy_valence,
            "dance_energy" => self.dance_energy,
            "loudness_energy" => self.loudness_energy,
            "speech_energy" => self.speech_energy,
            "energy_minus_valence" => self.energy_minus_valence,
            "dance_minus_acoustic" => self.dance_minus_acoustic,
            "instrumental_minus_speech" => self.instrumental_minus_speech,
            "log_tempo" => self.log_tempo,
            "log_duration" => self.log_duration,
            "tempo_bucket_code" => Some(f64::from(self.tempo_bucket_code)),
            other => {
                if let Some(bucket) = other.strip_prefix("followers_") {
                    return FollowerBucket::ALL
                        .iter()
                        .find(|b| b.as_str() == bucket)
                        .map(|b| f64::from(u8::from(*b == self.followers_bucket)));
                }
                self.genre_flags.get(other)
            }
        }
    }
}

/// Combine one track with its (possibly absent) audio features and artist info
/// and compute every derived column
pub fn derive_features(
    record: TrackRecord,
    audio: Option<&AudioFeatures>,
    artist: Option<&ArtistInfo>,
) -> EnrichedTrack {
    let audio_value = |pick: fn(&AudioFeatures) -> Option<f64>| audio.and_then(pick);
    let energy = audio_value(|a| a.energy);
    let valence = audio_value(|a| a.valence);
    let danceability = audio_value(|a| a.danceability);
    let loudness = audio_value(|a| a.loudness);
    let speechiness = audio_value(|a| a.speechiness);
    let acousticness = audio_value(|a| a.acousticness);
    let instrumentalness = audio_value(|a| a.instrumentalness);
    let tempo = audio_value(|a| a.tempo);
    let duration_ms = audio_value(|a| a.duration_ms);
    let liveness = audio_value(|a| a.liveness);
    let key = audio_value(|a| a.key);
    let mode = audio_value(|a| a.mode);
    let time_signature = audio_value(|a| a.time_signature);

    let product = |a: Option<f64>, b: Option<f64>| a.zip(b).map(|(a, b)| a * b);
    let difference = |a: Option<f64>, b: Option<f64>| a.zip(b).map(|(a, b)| a - b);

    let artist_popularity = artist.map_or(0.0, |a| f64::from(a.popularity));
    let artist_followers = artist.map_or(0.0, |a| a.followers as f64);
    let artist_genres = artist.map(|a| a.genres.clone()).unwrap_or_default();
    let genre_flags = genres_to_flags(Some(artist_genres.as_slice()));

    let year = extract_year(record.album_release_date.as_deref());

    EnrichedTrack {
        record,
        energy,
        valence,
        danceability,
        loudness,
        speechiness,
        acousticness,
        instrumentalness,
        tempo,
        duration_ms,
        liveness,
        key,
        mode,
        time_signature,
        artist_genres,
        year,
        decade: decade(year),
        artist_popularity,
        artist_followers,
        artist_followers_log: log1p_clipped(artist_followers),
        followers_bucket: follower_bucket(artist_followers),
        genre_flags,
        is_cover: 0,
        energy_valence: product(energy, valence),
        dance_energy: product(danceability, energy),
        loudness_energy: product(loudness, energy),
        speech_energy: product(speechiness, energy),
        energy_minus_valence: difference(energy, valence),
        dance_minus_acoustic: difference(danceability, acousticness),
        instrumental_minus_speech: difference(instrumentalness, speechiness),
        log_tempo: tempo.map(log1p_clipped),
        log_duration: duration_ms.map(log1p_clipped),
        tempo_bucket_code: tempo_bucket_code(tempo),
    }
}

/// Fetch audio features and artist info for the playlist's tracks, left-join
/// them onto the track list and derive the model columns. Row order and
/// duplicates are preserved.
pub fn enrich_playlist_for_model(
    client: &dyn CatalogClient,
    tracks: Vec<TrackRecord>,
    settings: &RatingSettings,
) -> Result<Vec<EnrichedTrack>> {
    let track_ids: Vec<String> = tracks.iter().filter_map(|t| t.track_id.clone()).collect();
    let audio_features =
        fetch_audio_features(client, &track_ids, settings.audio_feature_batch_size)?
            .into_features();

    let artist_ids: Vec<String> = tracks.iter().filter_map(|t| t.artist_id.clone()).collect();
    let artists: HashMap<String, ArtistInfo> =
        fetch_artist_info(client, &artist_ids, settings.artist_batch_size)?
            .into_iter()
            .map(|artist| (artist.artist_id.clone(), artist))
            .collect();

    let enriched: Vec<EnrichedTrack> = tracks
        .into_iter()
        .map(|record| {
            let audio = record
                .track_id
                .as_deref()
                .and_then(|id| audio_features.get(id));
            let artist = record.artist_id.as_deref().and_then(|id| artists.get(id));
            derive_features(record, audio, artist)
        })
        .collect();

    debug!(
        tracks = enriched.len(),
        with_audio = enriched
            .iter()
            .filter(|t| {
                AUDIO_FEATURE_COLUMNS
                    .iter()
                    .chain(&EXTRA_AUDIO_COLUMNS)
                    .any(|c| t.value(c).is_some())
            })
            .count(),
        "Enriched playlist"
    );
    Ok(enriched)
}
