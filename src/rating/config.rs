use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Parameters for one playlist rating request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RatingSettings {
    pub decision_threshold: f64, // hit_score at or above this marks a predicted hit
    pub soft_threshold: f64,     // lower cutoff used only for soft_hit_rate
    pub aggregate_top_k: usize,  // how many best tracks feed top_k_mean
    pub display_top_n: usize,    // rows in the top and bottom tables
    pub page_size: usize,
    pub audio_feature_batch_size: usize,
    pub artist_batch_size: usize,
    pub calibration: Calibration,
}

/// Empirically fit constants that turn the playlist index into a 0-100 rating
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Calibration {
    pub mean_weight: f64,     // weight of the mean score in the playlist index
    pub top_k_weight: f64,    // weight of the top-k mean in the playlist index
    pub background_mean: f64, // playlist index of an average reference playlist
    pub background_std: f64,
    pub base_rating: f64, // rating at z = 0
    pub rating_scale: f64, // rating points per standard deviation
}

impl Default for RatingSettings {
    fn default() -> Self {
        Self {
            decision_threshold: 0.871,
            soft_threshold: 0.70,
            aggregate_top_k: 20,
            display_top_n: 5,
            page_size: 100,
            audio_feature_batch_size: 100,
            artist_batch_size: 50,
            calibration: Calibration::default(),
        }
    }
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            mean_weight: 0.2,
            top_k_weight: 0.8,
            background_mean: 0.29,
            background_std: 0.1,
            base_rating: 40.0,
            rating_scale: 20.0,
        }
    }
}

impl RatingSettings {
    /// Load settings from a JSON file; keys left out keep their defaults
    pub fn load_from_file(path: &str) -> Result<RatingSettings> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read rating settings from '{path}'"))?;
        let settings: RatingSettings = serde_json::from_str(&content)
            .with_context(|| format!("Invalid rating settings in '{path}'"))?;
        Ok(settings)
    }
}
