use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, StatusCode};
use serde_json::Value;

use crate::{
    config,
    management::TokenManager,
    spotify::error::{ApiError, classify_status},
    types::{Artist, BatchArtistsResponse},
    updater::BatchRefreshSource,
};

/// The batch artists endpoint accepts at most this many ids per call.
pub const MAX_ARTIST_BATCH_SIZE: usize = 50;

/// Client for the batch artists endpoint, implementing the updater's
/// [`BatchRefreshSource`] seam.
pub struct ArtistClient {
    client: Client,
    tokens: Arc<TokenManager>,
}

impl ArtistClient {
    pub fn new(tokens: Arc<TokenManager>) -> Self {
        Self {
            client: Client::new(),
            tokens,
        }
    }
}

#[async_trait]
impl BatchRefreshSource for ArtistClient {
    /// Fetches full records for the first [`MAX_ARTIST_BATCH_SIZE`] ids.
    ///
    /// Ids beyond the cap are silently not fetched; callers keep them
    /// eligible for the next cycle. Returned records are stamped with the
    /// fetch time as their new `updated_at`.
    async fn fetch_many(&self, ids: &[String]) -> Result<Vec<Artist>, ApiError> {
        let batch = &ids[..ids.len().min(MAX_ARTIST_BATCH_SIZE)];
        if batch.is_empty() {
            return Ok(Vec::new());
        }

        let token = self
            .tokens
            .access_token()
            .await
            .map_err(|e| ApiError::AuthRejected(e.to_string()))?;

        let url = format!(
            "{uri}/artists?ids={ids}",
            uri = &config::spotify_apiurl(),
            ids = batch.join(",")
        );
        let response = self.client.get(&url).bearer_auth(token).send().await?;
        let status = response.status();
        if status == StatusCode::NO_CONTENT {
            return Err(ApiError::Empty);
        }

        let body: Value = response.json().await.unwrap_or(Value::Null);
        classify_status(status, &body)?;

        let parsed: BatchArtistsResponse = serde_json::from_value(body)
            .map_err(|e| ApiError::Unexpected(200, format!("undecodable body: {}", e)))?;

        let now = Utc::now();
        Ok(parsed
            .artists
            .into_iter()
            .map(|a| a.into_artist(now))
            .collect())
    }
}
