//! OAuth 2.0 PKCE grant handling.
//!
//! The daemon authenticates with Spotify using the PKCE flow: no client
//! secret is stored, a per-process code verifier proves that the client
//! completing the flow is the one that started it. This module provides the
//! verifier/challenge helpers, the authorization URL, and the
//! [`SpotifyExchanger`] that performs the actual token endpoint calls.

use std::fmt;

use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::Utc;
use rand::{Rng, distr::Alphanumeric};
use reqwest::Client;
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::{config, management::TokenExchanger, types::Token};

/// Failures of the token and authorization-code exchanges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// The provider rejected the grant itself; only a full re-authorization
    /// can recover.
    InvalidGrant(String),
    /// The provider returned an error envelope for another reason.
    Provider(String),
    /// The response could not be understood.
    Malformed(String),
    Network(String),
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::InvalidGrant(msg) => write!(f, "invalid grant: {}", msg),
            AuthError::Provider(msg) => write!(f, "provider error: {}", msg),
            AuthError::Malformed(msg) => write!(f, "malformed token response: {}", msg),
            AuthError::Network(msg) => write!(f, "network failure: {}", msg),
        }
    }
}

impl std::error::Error for AuthError {}

pub fn generate_code_verifier() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(128)
        .map(char::from)
        .collect()
}

pub fn generate_code_challenge(verifier: &str) -> String {
    let hash = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hash)
}

/// Builds the authorization URL for a given PKCE challenge.
pub fn authorization_url(code_challenge: &str) -> String {
    format!(
        "{auth_url}?client_id={client_id}&response_type=code&redirect_uri={redirect_uri}&code_challenge={code_challenge}&code_challenge_method=S256&scope={scope}",
        auth_url = &config::spotify_apiauth_url(),
        client_id = &config::spotify_client_id(),
        redirect_uri = &config::spotify_redirect_uri(),
        code_challenge = code_challenge,
        scope = &config::spotify_scope()
    )
}

/// Token endpoint client holding the process-wide PKCE verifier.
pub struct SpotifyExchanger {
    client: Client,
    code_verifier: String,
}

impl SpotifyExchanger {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            code_verifier: generate_code_verifier(),
        }
    }
}

impl Default for SpotifyExchanger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TokenExchanger for SpotifyExchanger {
    async fn exchange_code(&self, code: &str) -> Result<Token, AuthError> {
        let res = self
            .client
            .post(config::spotify_apitoken_url())
            .form(&[
                ("grant_type", "authorization_code"),
                ("client_id", &config::spotify_client_id()),
                ("code", code),
                ("code_verifier", &self.code_verifier),
                ("redirect_uri", &config::spotify_redirect_uri()),
            ])
            .send()
            .await
            .map_err(|e| AuthError::Network(e.to_string()))?;

        let json: Value = res
            .json()
            .await
            .map_err(|e| AuthError::Malformed(e.to_string()))?;
        parse_token_response(json)
    }

    async fn refresh(&self, refresh_token: &str) -> Result<Token, AuthError> {
        let res = self
            .client
            .post(config::spotify_apitoken_url())
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
                ("client_id", &config::spotify_client_id()),
            ])
            .send()
            .await
            .map_err(|e| AuthError::Network(e.to_string()))?;

        let json: Value = res
            .json()
            .await
            .map_err(|e| AuthError::Malformed(e.to_string()))?;
        parse_token_response(json)
    }

    fn authorization_url(&self) -> String {
        authorization_url(&generate_code_challenge(&self.code_verifier))
    }
}

/// Three-way branch over a token endpoint response: success, provider error
/// envelope, or malformed body.
fn parse_token_response(json: Value) -> Result<Token, AuthError> {
    if let Some(error) = json["error"].as_str() {
        let description = json["error_description"]
            .as_str()
            .unwrap_or(error)
            .to_string();
        return if error == "invalid_grant" {
            Err(AuthError::InvalidGrant(description))
        } else {
            Err(AuthError::Provider(description))
        };
    }

    let access_token = json["access_token"]
        .as_str()
        .ok_or_else(|| AuthError::Malformed("missing access_token".to_string()))?
        .to_string();
    let expires_in = json["expires_in"]
        .as_i64()
        .ok_or_else(|| AuthError::Malformed("missing expires_in".to_string()))?;

    Ok(Token {
        access_token,
        refresh_token: json["refresh_token"]
            .as_str()
            .unwrap_or_default()
            .to_string(),
        scope: json["scope"].as_str().unwrap_or_default().to_string(),
        expires_in: expires_in.max(0) as u64,
        obtained_at: Utc::now().timestamp() as u64,
    })
}
