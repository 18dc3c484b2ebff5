use crate::catalog::{CatalogClient, CatalogError};
use crate::config::Config;
use crate::models::{
    ArtistInfo, ArtistsResponse, AudioFeatures, AudioFeaturesResponse, PlaylistItemsResponse,
    PlaylistPage,
};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;
use ureq::Agent;
use urlencoding::encode;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// A blocking Spotify Web API client authenticated with a bearer token
pub struct SpotifyClient {
    agent: Agent,
    base_url: String,
    access_token: String,
}

impl SpotifyClient {
    /// Create a new client with configuration from environment
    pub fn new(config: &Config) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(REQUEST_TIMEOUT).build();

        SpotifyClient {
            agent,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            access_token: config.access_token.clone(),
        }
    }

    /// Issue a GET request and decode the JSON body
    fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, CatalogError> {
        debug!("GET {url}");

        let response = self
            .agent
            .get(url)
            .set("Authorization", &format!("Bearer {}", self.access_token))
            .call()
            .map_err(map_call_error)?;

        let response_text = response
            .into_string()
            .map_err(|e| CatalogError::Transport(e.to_string()))?;

        serde_json::from_str(&response_text).map_err(|e| CatalogError::Decode(e.to_string()))
    }

    fn join_ids(ids: &[String]) -> String {
        ids.iter()
            .map(|id| encode(id).into_owned())
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Translate a failed call into a catalog error
fn map_call_error(e: ureq::Error) -> CatalogError {
    match e {
        // 403 is how the provider answers for endpoints an app may no longer use
        ureq::Error::Status(403, _) => CatalogError::Unavailable { status: 403 },
        ureq::Error::Status(status, response) => CatalogError::Http {
            status,
            body: response.into_string().unwrap_or_default(),
        },
        ureq::Error::Transport(transport) => CatalogError::Transport(transport.to_string()),
    }
}

impl CatalogClient for SpotifyClient {
    fn list_playlist_tracks(
        &self,
        playlist_id: &str,
        page_size: usize,
        offset: usize,
    ) -> Result<PlaylistPage, CatalogError> {
        let url = format!(
            "{}/playlists/{}/tracks?limit={}&offset={}&additional_types=track",
            self.base_url,
            encode(playlist_id),
            page_size,
            offset
        );
        let response: PlaylistItemsResponse = self.get_json(&url)?;
        Ok(response.into())
    }

    fn get_audio_features(
        &self,
        track_ids: &[String],
    ) -> Result<Vec<Option<AudioFeatures>>, CatalogError> {
        let url = format!(
            "{}/audio-features?ids={}",
            self.base_url,
            Self::join_ids(track_ids)
        );
        let response: AudioFeaturesResponse = self.get_json(&url)?;
        Ok(response.audio_features)
    }

    fn get_artists(&self, artist_ids: &[String]) -> Result<Vec<Option<ArtistInfo>>, CatalogError> {
        let url = format!("{}/artists?ids={}", self.base_url, Self::join_ids(artist_ids));
        let response: ArtistsResponse = self.get_json(&url)?;
        Ok(response
            .artists
            .into_iter()
            .map(|artist| artist.map(ArtistInfo::from))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_error(status: u16, text: &str, body: &str) -> ureq::Error {
        ureq::Error::Status(status, ureq::Response::new(status, text, body).unwrap())
    }

    #[test]
    fn test_forbidden_maps_to_unavailable() {
        let error = map_call_error(status_error(403, "Forbidden", ""));
        assert!(matches!(error, CatalogError::Unavailable { status: 403 }));
    }

    #[test]
    fn test_other_statuses_map_to_http_with_body() {
        let error = map_call_error(status_error(500, "Internal Server Error", "boom"));
        match error {
            CatalogError::Http { status, body } => {
                assert_eq!(status, 500);
                assert_eq!(body, "boom");
            }
            other => panic!("expected Http error, got {other:?}"),
        }

        let error = map_call_error(status_error(401, "Unauthorized", ""));
        assert!(matches!(error, CatalogError::Http { status: 401, .. }));
    }

    #[test]
    fn test_join_ids_encodes_each_id() {
        let ids = vec!["abc".to_string(), "a b".to_string()];
        assert_eq!(SpotifyClient::join_ids(&ids), "abc,a%20b");
    }
}
