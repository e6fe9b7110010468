use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;

use crate::{
    config,
    management::TokenManager,
    spotify::error::{ApiError, classify_status},
    tracker::NowPlayingSource,
    types::{CurrentlyPlayingResponse, Device, DevicesResponse, PlaybackSnapshot},
};

/// Client for the player endpoints, implementing the tracker's
/// [`NowPlayingSource`] seam.
pub struct PlayerClient {
    client: Client,
    tokens: Arc<TokenManager>,
}

impl PlayerClient {
    pub fn new(tokens: Arc<TokenManager>) -> Self {
        Self {
            client: Client::new(),
            tokens,
        }
    }

    async fn get_json(&self, url: &str) -> Result<Value, ApiError> {
        let token = self
            .tokens
            .access_token()
            .await
            .map_err(|e| ApiError::AuthRejected(e.to_string()))?;

        let response = self.client.get(url).bearer_auth(token).send().await?;
        let status = response.status();
        if status == StatusCode::NO_CONTENT {
            return Err(ApiError::Empty);
        }

        let body: Value = response.json().await.unwrap_or(Value::Null);
        classify_status(status, &body)?;
        Ok(body)
    }
}

#[async_trait]
impl NowPlayingSource for PlayerClient {
    async fn fetch_current(&self) -> Result<Option<PlaybackSnapshot>, ApiError> {
        let url = format!(
            "{uri}/me/player/currently-playing",
            uri = &config::spotify_apiurl()
        );
        let body = match self.get_json(&url).await {
            Ok(body) => body,
            Err(ApiError::Empty) => return Ok(None),
            Err(e) => return Err(e),
        };

        let playing: CurrentlyPlayingResponse = serde_json::from_value(body)
            .map_err(|e| ApiError::Unexpected(200, format!("undecodable body: {}", e)))?;

        // Episodes and local files come back without a track id; nothing we
        // can track there.
        let Some(item) = playing.item else {
            return Ok(None);
        };
        let Some(track_id) = item.id else {
            return Ok(None);
        };

        Ok(Some(PlaybackSnapshot {
            track_id,
            track_name: item.name,
            artists: item.artists,
            duration_ms: item.duration_ms,
            progress_ms: playing.progress_ms.unwrap_or(0),
            is_playing: playing.is_playing,
        }))
    }

    async fn fetch_active_device(&self) -> Result<Option<Device>, ApiError> {
        let url = format!("{uri}/me/player/devices", uri = &config::spotify_apiurl());
        let body = match self.get_json(&url).await {
            Ok(body) => body,
            Err(ApiError::Empty) => return Ok(None),
            Err(e) => return Err(e),
        };

        let devices: DevicesResponse = serde_json::from_value(body)
            .map_err(|e| ApiError::Unexpected(200, format!("undecodable body: {}", e)))?;

        Ok(devices.devices.into_iter().find(|d| d.is_active))
    }
}
