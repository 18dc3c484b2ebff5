use anyhow::{Context, Result};

const DEFAULT_API_BASE_URL: &str = "https://api.spotify.com/v1";
const DEFAULT_MODEL_PATH: &str = "model.json";

/// Configuration loaded from environment variables
#[derive(Debug)]
pub struct Config {
    pub api_base_url: String,
    pub access_token: String,
    pub model_path: String,
}

/// Load configuration from `.env` and environment
pub fn load_config() -> Result<Config> {
    // Load `.env` file if present
    dotenv::dotenv().ok();
    let access_token = std::env::var("SPOTIFY_ACCESS_TOKEN")
        .context("SPOTIFY_ACCESS_TOKEN must be set")?;
    let api_base_url =
        std::env::var("SPOTIFY_API_BASE_URL").unwrap_or_else(|_| DEFAULT_API_BASE_URL.to_string());
    let model_path = std::env::var("MODEL_PATH").unwrap_or_else(|_| DEFAULT_MODEL_PATH.to_string());
    Ok(Config {
        api_base_url,
        access_token,
        model_path,
    })
}
