use super::enrich::EnrichedTrack;
use crate::classifier::Classifier;
use anyhow::{Result, ensure};
use serde::Serialize;
use tracing::debug;

/// An enriched track with the classifier's verdict attached
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredTrack {
    #[serde(flatten)]
    pub track: EnrichedTrack,
    pub hit_score: f64,
    pub predicted_hit: bool,
    pub predicted_hit_soft: bool,
}

/// Build the model input row for a track in the classifier's feature order.
/// Columns the track does not know and missing or non-finite values become 0.
pub fn feature_vector(track: &EnrichedTrack, feature_names: &[String]) -> Vec<f64> {
    feature_names
        .iter()
        .map(|name| {
            track
                .value(name)
                .filter(|value| value.is_finite())
                .unwrap_or(0.0)
        })
        .collect()
}

/// Score every track and flag it against the decision and soft thresholds
pub fn score_tracks(
    tracks: Vec<EnrichedTrack>,
    classifier: &dyn Classifier,
    decision_threshold: f64,
    soft_threshold: f64,
) -> Result<Vec<ScoredTrack>> {
    let feature_names = classifier.feature_names();
    let unknown: Vec<&str> = feature_names
        .iter()
        .map(String::as_str)
        .filter(|name| !EnrichedTrack::has_column(name))
        .collect();
    if !unknown.is_empty() {
        debug!("Model features filled with 0: {}", unknown.join(", "));
    }

    let rows: Vec<Vec<f64>> = tracks
        .iter()
        .map(|track| feature_vector(track, feature_names))
        .collect();
    let probabilities = classifier.predict_proba(&rows)?;
    ensure!(
        probabilities.len() == tracks.len(),
        "classifier returned {} probabilities for {} tracks",
        probabilities.len(),
        tracks.len()
    );

    Ok(tracks
        .into_iter()
        .zip(probabilities)
        .map(|(track, hit_score)| ScoredTrack {
            track,
            hit_score,
            predicted_hit: hit_score >= decision_threshold,
            predicted_hit_soft: hit_score >= soft_threshold,
        })
        .collect())
}
