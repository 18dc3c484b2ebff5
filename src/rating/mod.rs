pub mod config;
pub mod enrich;
pub mod features;
pub mod scorer;
pub mod summary;

pub use config::*;
pub use enrich::enrich_playlist_for_model;
pub use scorer::{ScoredTrack, score_tracks};
pub use summary::{PlaylistSummary, TrackHighlight, select_highlights, summarize_playlist};

use crate::catalog::{CatalogClient, extract_playlist_id, load_playlist_tracks};
use crate::classifier::Classifier;
use anyhow::{Result, bail};
use serde::Serialize;
use tracing::info;

/// Everything produced for one playlist rating request
#[derive(Debug, Clone, Serialize)]
pub struct PlaylistRating {
    pub playlist_id: String,
    pub summary: PlaylistSummary,
    pub top: Vec<TrackHighlight>,
    pub bottom: Vec<TrackHighlight>,
    pub tracks: Vec<ScoredTrack>,
}

/// Load, enrich, score and summarize a playlist given its URL or bare ID
pub fn rate_playlist(
    playlist_ref: &str,
    catalog: &dyn CatalogClient,
    classifier: &dyn Classifier,
    settings: &RatingSettings,
) -> Result<PlaylistRating> {
    let playlist_id = extract_playlist_id(playlist_ref);

    let tracks = load_playlist_tracks(catalog, &playlist_id, settings.page_size)?;
    if tracks.is_empty() {
        bail!("playlist '{playlist_id}' contains no scorable tracks");
    }

    let enriched = enrich_playlist_for_model(catalog, tracks, settings)?;
    let scored = score_tracks(
        enriched,
        classifier,
        settings.decision_threshold,
        settings.soft_threshold,
    )?;

    let summary = summarize_playlist(
        &scored,
        settings.aggregate_top_k,
        settings.soft_threshold,
        &settings.calibration,
    )?;
    let (top, bottom) = select_highlights(&scored, settings.display_top_n);

    info!(
        playlist_id = %playlist_id,
        tracks = summary.track_count,
        rating = summary.final_score_pct,
        "Rated playlist"
    );

    Ok(PlaylistRating {
        playlist_id,
        summary,
        top,
        bottom,
        tracks: scored,
    })
}
