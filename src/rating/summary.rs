use super::config::Calibration;
use super::scorer::ScoredTrack;
use anyhow::{Result, ensure};
use serde::{Serialize, Serializer};
use std::collections::HashSet;
use std::fmt;

/// Five-tier description of a calibrated playlist rating
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RatingLabel {
    UniquelyNiche,
    PrettyUnique,
    SolidMix,
    VeryMainstream,
    AlgorithmsFavorite,
}

impl RatingLabel {
    pub fn from_rating(rating: f64) -> RatingLabel {
        if rating < 20.0 {
            RatingLabel::UniquelyNiche
        } else if rating < 50.0 {
            RatingLabel::PrettyUnique
        } else if rating < 70.0 {
            RatingLabel::SolidMix
        } else if rating < 85.0 {
            RatingLabel::VeryMainstream
        } else {
            RatingLabel::AlgorithmsFavorite
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RatingLabel::UniquelyNiche => "⚗️ Uniquely Niche — deep cuts only",
            RatingLabel::PrettyUnique => "🌱 Pretty unique — not bad",
            RatingLabel::SolidMix => "😎 Solid mix — balanced taste",
            RatingLabel::VeryMainstream => "🔥 Very mainstream — a bit basic",
            RatingLabel::AlgorithmsFavorite => {
                "🚨 Algorithm’s Favorite Child — playlist built by Spotify itself 🚨"
            }
        }
    }
}

impl fmt::Display for RatingLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for RatingLabel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Playlist-level statistics derived from the per-track hit scores
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaylistSummary {
    pub track_count: usize,
    pub mean_score: f64,
    pub top_k_mean: f64,
    pub playlist_index: f64,
    pub final_score_pct: f64, // calibrated 0-100 rating
    pub label: RatingLabel,
    pub soft_threshold: f64,
    pub soft_hit_rate: f64,
}

/// Display projection of one track for the top and bottom tables
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackHighlight {
    pub track_name: String,
    pub artist_name: String,
    pub year: Option<i32>,
    pub hit_score: f64,
    pub album_image_url: Option<String>,
}

impl From<&ScoredTrack> for TrackHighlight {
    fn from(scored: &ScoredTrack) -> Self {
        TrackHighlight {
            track_name: scored.track.record.track_name.clone(),
            artist_name: scored.track.record.artist_name.clone(),
            year: scored.track.year,
            hit_score: scored.hit_score,
            album_image_url: scored.track.record.album_image_url.clone(),
        }
    }
}

/// Map a playlist index onto the 0-100 scale via a z-score against the
/// reference population, rounded to one decimal with ties to even
pub fn calibrated_rating(playlist_index: f64, calibration: &Calibration) -> f64 {
    let z = (playlist_index - calibration.background_mean) / calibration.background_std;
    let rating = (calibration.base_rating + calibration.rating_scale * z).clamp(0.0, 100.0);
    (rating * 10.0).round_ties_even() / 10.0
}

/// Reduce per-track hit scores to the playlist summary. `top_k` is clamped to
/// the playlist length.
pub fn summarize_playlist(
    tracks: &[ScoredTrack],
    top_k: usize,
    soft_threshold: f64,
    calibration: &Calibration,
) -> Result<PlaylistSummary> {
    ensure!(!tracks.is_empty(), "playlist contains no scorable tracks");
    ensure!(
        calibration.background_std > 0.0,
        "calibration background_std must be positive"
    );

    let mut scores: Vec<f64> = tracks.iter().map(|t| t.hit_score).collect();
    let count = scores.len() as f64;
    let mean_score = scores.iter().sum::<f64>() / count;

    scores.sort_by(|a, b| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));
    let k_eff = top_k.clamp(1, scores.len());
    let top_k_mean = scores[..k_eff].iter().sum::<f64>() / k_eff as f64;

    let playlist_index =
        calibration.mean_weight * mean_score + calibration.top_k_weight * top_k_mean;

    let soft_hits = scores.iter().filter(|s| **s >= soft_threshold).count();
    let soft_hit_rate = soft_hits as f64 / count;

    let final_score_pct = calibrated_rating(playlist_index, calibration);

    Ok(PlaylistSummary {
        track_count: tracks.len(),
        mean_score,
        top_k_mean,
        playlist_index,
        final_score_pct,
        label: RatingLabel::from_rating(final_score_pct),
        soft_threshold,
        soft_hit_rate,
    })
}

/// Pick the `n` most and least hit-like tracks after removing repeated
/// (track name, artist name) pairs. Equal scores keep playlist order. When the
/// playlist has at least `2n` distinct tracks the two tables never overlap.
pub fn select_highlights(
    tracks: &[ScoredTrack],
    n: usize,
) -> (Vec<TrackHighlight>, Vec<TrackHighlight>) {
    let mut seen = HashSet::new();
    let deduped: Vec<&ScoredTrack> = tracks
        .iter()
        .filter(|t| {
            seen.insert((
                t.track.record.track_name.as_str(),
                t.track.record.artist_name.as_str(),
            ))
        })
        .collect();

    let mut descending: Vec<(usize, &ScoredTrack)> =
        deduped.iter().copied().enumerate().collect();
    descending.sort_by(|(_, a), (_, b)| {
        b.hit_score
            .partial_cmp(&a.hit_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    let top: Vec<(usize, &ScoredTrack)> = descending.into_iter().take(n).collect();

    let top_positions: HashSet<usize> = top.iter().map(|(position, _)| *position).collect();
    let mut ascending: Vec<&ScoredTrack> = if deduped.len() >= 2 * n {
        deduped
            .iter()
            .enumerate()
            .filter(|(position, _)| !top_positions.contains(position))
            .map(|(_, track)| *track)
            .collect()
    } else {
        deduped.clone()
    };
    ascending.sort_by(|a, b| {
        a.hit_score
            .partial_cmp(&b.hit_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let top: Vec<TrackHighlight> = top.into_iter().map(|(_, t)| TrackHighlight::from(t)).collect();
    let bottom: Vec<TrackHighlight> = ascending
        .into_iter()
        .take(n)
        .map(TrackHighlight::from)
        .collect();
    (top, bottom)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TrackRecord;
    use crate::rating::enrich::derive_features;
    use approx::assert_relative_eq;

    fn scored(name: &str, artist: &str, hit_score: f64) -> ScoredTrack {
        let track = derive_features(
            TrackRecord {
                track_id: Some(format!("{name}-{artist}")),
                track_name: name.to_string(),
                artist_id: None,
                artist_name: artist.to_string(),
                album_release_date: Some("2019-09-09".to_string()),
                album_image_url: Some(format!("https://img/{name}")),
            },
            None,
            None,
        );
        ScoredTrack {
            track,
            hit_score,
            predicted_hit: hit_score >= 0.871,
            predicted_hit_soft: hit_score >= 0.7,
        }
    }

    fn playlist(scores: &[f64]) -> Vec<ScoredTrack> {
        scores
            .iter()
            .enumerate()
            .map(|(i, s)| scored(&format!("Song {i}"), "Artist", *s))
            .collect()
    }

    fn names(highlights: &[TrackHighlight]) -> Vec<&str> {
        highlights.iter().map(|h| h.track_name.as_str()).collect()
    }

    #[test]
    fn test_summary_statistics() {
        let tracks = playlist(&[0.9, 0.1, 0.5, 0.7]);

        let summary = summarize_playlist(&tracks, 2, 0.7, &Calibration::default()).unwrap();

        assert_eq!(summary.track_count, 4);
        assert_relative_eq!(summary.mean_score, 0.55, epsilon = 1e-12);
        assert_relative_eq!(summary.top_k_mean, 0.8, epsilon = 1e-12);
        assert_relative_eq!(summary.playlist_index, 0.2 * 0.55 + 0.8 * 0.8, epsilon = 1e-12);
        assert_relative_eq!(summary.soft_hit_rate, 0.5, epsilon = 1e-12);
        assert_relative_eq!(summary.soft_threshold, 0.7);
        // z = (0.75 - 0.29) / 0.1 = 4.6, rating = 40 + 92 -> clipped
        assert_relative_eq!(summary.final_score_pct, 100.0);
        assert_eq!(summary.label, RatingLabel::AlgorithmsFavorite);
    }

    #[test]
    fn test_top_k_is_clamped_to_playlist_length() {
        let tracks = playlist(&[0.2, 0.4]);

        let summary = summarize_playlist(&tracks, 20, 0.7, &Calibration::default()).unwrap();

        assert_relative_eq!(summary.top_k_mean, summary.mean_score, epsilon = 1e-12);
        assert_relative_eq!(summary.playlist_index, 0.3, epsilon = 1e-12);
        // z = 0.1, rating = 42.0
        assert_relative_eq!(summary.final_score_pct, 42.0, epsilon = 1e-9);
        assert_eq!(summary.label, RatingLabel::PrettyUnique);
        assert_relative_eq!(summary.soft_hit_rate, 0.0);
    }

    #[test]
    fn test_extreme_scores_clip_to_bounds() {
        let all_hits = playlist(&[1.0; 30]);
        let no_hits = playlist(&[0.0; 30]);

        let high = summarize_playlist(&all_hits, 20, 0.7, &Calibration::default()).unwrap();
        let low = summarize_playlist(&no_hits, 20, 0.7, &Calibration::default()).unwrap();

        assert_relative_eq!(high.playlist_index, 1.0, epsilon = 1e-12);
        assert_relative_eq!(high.final_score_pct, 100.0);
        assert_relative_eq!(high.soft_hit_rate, 1.0);
        assert_relative_eq!(low.playlist_index, 0.0);
        assert_relative_eq!(low.final_score_pct, 0.0);
        assert_eq!(low.label, RatingLabel::UniquelyNiche);
    }

    #[test]
    fn test_playlist_index_stays_within_unit_interval() {
        for seed in 0..50u32 {
            let scores: Vec<f64> = (0..(seed % 25 + 1))
                .map(|i| ((seed * 31 + i * 17) % 101) as f64 / 100.0)
                .collect();
            let summary =
                summarize_playlist(&playlist(&scores), 20, 0.7, &Calibration::default()).unwrap();
            assert!((0.0..=1.0).contains(&summary.playlist_index));
            assert!((0.0..=100.0).contains(&summary.final_score_pct));
        }
    }

    #[test]
    fn test_summarize_is_repeatable() {
        let tracks = playlist(&[0.31, 0.62, 0.05, 0.88, 0.47]);

        let first = summarize_playlist(&tracks, 3, 0.6, &Calibration::default()).unwrap();
        let second = summarize_playlist(&tracks, 3, 0.6, &Calibration::default()).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn test_summarize_rejects_empty_playlist() {
        assert!(summarize_playlist(&[], 20, 0.7, &Calibration::default()).is_err());
    }

    #[test]
    fn test_calibrated_rating_rounds_and_uses_custom_constants() {
        let calibration = Calibration {
            background_mean: 0.5,
            background_std: 0.2,
            ..Calibration::default()
        };

        assert_relative_eq!(calibrated_rating(0.5, &calibration), 40.0);
        assert_relative_eq!(calibrated_rating(0.6, &calibration), 50.0, epsilon = 1e-9);
        assert_relative_eq!(
            calibrated_rating(0.3123, &Calibration::default()),
            44.5,
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_calibrated_rating_rounds_ties_to_even() {
        let fixed = |base_rating: f64| Calibration {
            base_rating,
            rating_scale: 0.0,
            ..Calibration::default()
        };

        assert_eq!(calibrated_rating(0.5, &fixed(0.25)), 0.2);
        assert_eq!(calibrated_rating(0.5, &fixed(0.75)), 0.8);
        assert_eq!(calibrated_rating(0.5, &fixed(42.5)), 42.5);
    }

    #[test]
    fn test_label_breakpoints() {
        assert_eq!(RatingLabel::from_rating(0.0), RatingLabel::UniquelyNiche);
        assert_eq!(RatingLabel::from_rating(19.9), RatingLabel::UniquelyNiche);
        assert_eq!(RatingLabel::from_rating(20.0), RatingLabel::PrettyUnique);
        assert_eq!(RatingLabel::from_rating(50.0), RatingLabel::SolidMix);
        assert_eq!(RatingLabel::from_rating(70.0), RatingLabel::VeryMainstream);
        assert_eq!(RatingLabel::from_rating(85.0), RatingLabel::AlgorithmsFavorite);
        assert_eq!(
            serde_json::to_string(&RatingLabel::SolidMix).unwrap(),
            "\"😎 Solid mix — balanced taste\""
        );
        assert_eq!(
            RatingLabel::AlgorithmsFavorite.to_string(),
            "🚨 Algorithm’s Favorite Child — playlist built by Spotify itself 🚨"
        );
        assert_eq!(
            RatingLabel::UniquelyNiche.as_str(),
            "⚗️ Uniquely Niche — deep cuts only"
        );
    }

    #[test]
    fn test_highlights_order_and_projection() {
        let tracks = playlist(&[0.3, 0.9, 0.1, 0.7, 0.5, 0.2]);

        let (top, bottom) = select_highlights(&tracks, 2);

        assert_eq!(names(&top), vec!["Song 1", "Song 3"]);
        assert_eq!(names(&bottom), vec!["Song 2", "Song 5"]);
        assert_eq!(top[0].year, Some(2019));
        assert_eq!(top[0].artist_name, "Artist");
        assert_eq!(top[0].album_image_url.as_deref(), Some("https://img/Song 1"));
    }

    #[test]
    fn test_highlights_skip_duplicate_name_artist_pairs() {
        let tracks = vec![
            scored("Anthem", "Band", 0.9),
            scored("Anthem", "Band", 0.95),
            scored("Anthem", "Other Band", 0.8),
            scored("Ballad", "Band", 0.1),
        ];

        let (top, bottom) = select_highlights(&tracks, 5);

        assert_eq!(top.len(), 3);
        assert_relative_eq!(top[0].hit_score, 0.9);
        assert_eq!(top[1].artist_name, "Other Band");
        assert_eq!(names(&bottom), vec!["Ballad", "Anthem", "Anthem"]);
    }

    #[test]
    fn test_highlights_are_disjoint_and_keep_order_among_ties() {
        let tracks = playlist(&[0.5, 0.5, 0.5, 0.5, 0.5]);

        let (top, bottom) = select_highlights(&tracks, 2);

        assert_eq!(names(&top), vec!["Song 0", "Song 1"]);
        assert_eq!(names(&bottom), vec!["Song 2", "Song 3"]);
    }

    #[test]
    fn test_highlights_cover_deduplicated_rows_without_overlap() {
        let tracks = playlist(&[0.61, 0.12, 0.95, 0.33, 0.74, 0.08, 0.5, 0.27]);

        let (top, bottom) = select_highlights(&tracks, 3);

        let top_names: HashSet<&str> = names(&top).into_iter().collect();
        let bottom_names: HashSet<&str> = names(&bottom).into_iter().collect();
        assert!(top_names.is_disjoint(&bottom_names));
        let rest = tracks
            .iter()
            .filter(|t| {
                let name = t.track.record.track_name.as_str();
                !top_names.contains(name) && !bottom_names.contains(name)
            })
            .count();
        assert_eq!(top.len() + bottom.len() + rest, tracks.len());
        assert_eq!(names(&top), vec!["Song 2", "Song 4", "Song 0"]);
        assert_eq!(names(&bottom), vec!["Song 5", "Song 1", "Song 7"]);
    }
}
