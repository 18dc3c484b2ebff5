use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::Parser;
use serde::Serialize;
use tracing::info;

mod catalog;
mod classifier;
mod client;
mod config;
mod models;
mod rating;


use crate::classifier::{BoostedTreeModel, Classifier};
use crate::client::SpotifyClient;
use crate::config::load_config;
use crate::rating::{PlaylistRating, RatingSettings, TrackHighlight, rate_playlist};

#[derive(Parser)]
#[command(name = "playlist-rater")]
#[command(about = "Rate how hit-like a Spotify playlist is")]
#[command(version)]
struct Args {
    /// Spotify playlist URL or bare playlist ID
    playlist: String,

    /// Path to a JSON file with rating settings (thresholds, top-k, calibration)
    #[arg(short = 's', long = "settings")]
    settings_file: Option<String>,

    /// Path to the XGBoost JSON model (overrides MODEL_PATH)
    #[arg(short = 'm', long = "model")]
    model_file: Option<String>,

    /// Decision threshold for marking a track as a predicted hit
    #[arg(long = "threshold")]
    threshold: Option<f64>,

    /// Soft threshold used for the soft hit rate
    #[arg(long = "soft-threshold")]
    soft_threshold: Option<f64>,

    /// Number of best tracks that feed the playlist index
    #[arg(short = 'k', long = "top-k")]
    top_k: Option<usize>,

    /// Number of tracks listed in the top and bottom tables
    #[arg(short = 'n', long = "display")]
    display: Option<usize>,

    /// Print the full rating report as JSON
    #[arg(long = "json")]
    json: bool,

    /// Quiet mode - only log warnings and errors
    #[arg(short = 'q', long = "quiet")]
    quiet: bool,
}

/// Rating result with the moment it was produced
#[derive(Serialize)]
struct RatingReport<'a> {
    rated_at: DateTime<Utc>,
    #[serde(flatten)]
    rating: &'a PlaylistRating,
}

fn main() {
    let args = Args::parse();

    let default_filter = if args.quiet {
        "playlist_rater=warn"
    } else {
        "playlist_rater=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(&args) {
        eprintln!("Something went wrong: {e:#}");
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<()> {
    let config = load_config()?;

    let mut settings = match &args.settings_file {
        Some(path) => RatingSettings::load_from_file(path)?,
        None => RatingSettings::default(),
    };
    if let Some(threshold) = args.threshold {
        settings.decision_threshold = threshold;
    }
    if let Some(soft_threshold) = args.soft_threshold {
        settings.soft_threshold = soft_threshold;
    }
    if let Some(top_k) = args.top_k {
        settings.aggregate_top_k = top_k;
    }
    if let Some(display) = args.display {
        settings.display_top_n = display;
    }

    let model_path = args.model_file.as_deref().unwrap_or(&config.model_path);
    let model = BoostedTreeModel::load_from_file(model_path)?;
    info!(
        "Loaded model from {} ({} trees, {} features)",
        model_path,
        model.tree_count(),
        model.feature_names().len()
    );

    let client = SpotifyClient::new(&config);
    let rating = rate_playlist(&args.playlist, &client, &model, &settings)?;

    if args.json {
        let report = RatingReport {
            rated_at: Utc::now(),
            rating: &rating,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_rating(&rating);
    }

    Ok(())
}

fn print_rating(rating: &PlaylistRating) {
    let summary = &rating.summary;

    println!("\n=== PLAYLIST RATING ===");
    println!("Playlist: {}", rating.playlist_id);
    println!("Rating: {:.1}%", summary.final_score_pct);
    println!("{}", summary.label);
    println!("Based on {} tracks", summary.track_count);
    println!(
        "   Mean score: {:.3} | Top-k mean: {:.3} | Index: {:.3}",
        summary.mean_score, summary.top_k_mean, summary.playlist_index
    );
    println!(
        "   Soft hit rate (>= {:.2}): {:.1}%",
        summary.soft_threshold,
        summary.soft_hit_rate * 100.0
    );

    print_table("Most hit-like tracks", &rating.top);
    print_table("Least hit-like tracks", &rating.bottom);
}

fn print_table(title: &str, rows: &[TrackHighlight]) {
    println!("\n{title}");
    println!("{}", "=".repeat(title.len()));
    for (i, row) in rows.iter().enumerate() {
        let year_display = row.year.map(|y| format!(" [{y}]")).unwrap_or_default();
        println!(
            "   {}. \"{}\" by {}{} | hit score {:.3}",
            i + 1,
            row.track_name,
            row.artist_name,
            year_display,
            row.hit_score
        );
    }
}
