use std::fmt;

use reqwest::StatusCode;
use serde_json::Value;

/// Closed classification of Spotify Web API failures.
///
/// Call sites branch over this enum with `match` instead of inspecting raw
/// status codes. `Empty` is not really an error: it signals a 204 "nothing
/// playing" response and is mapped back to an empty success by the player
/// client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    Empty,
    AuthRejected(String),
    RateLimited(String),
    Unexpected(u16, String),
    Network(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Empty => write!(f, "empty response"),
            ApiError::AuthRejected(msg) => write!(f, "authentication rejected: {}", msg),
            ApiError::RateLimited(msg) => write!(f, "rate limited: {}", msg),
            ApiError::Unexpected(status, msg) => {
                write!(f, "unexpected status {}: {}", status, msg)
            }
            ApiError::Network(msg) => write!(f, "network failure: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        ApiError::Network(err.to_string())
    }
}

/// Maps a status code plus parsed body to the failure taxonomy.
///
/// Returns `Ok(())` only for 200; everything else becomes a classified
/// error carrying the provider's message where one exists.
pub fn classify_status(status: StatusCode, body: &Value) -> Result<(), ApiError> {
    match status.as_u16() {
        200 => Ok(()),
        204 => Err(ApiError::Empty),
        401 | 403 => Err(ApiError::AuthRejected(error_message(body))),
        429 => Err(ApiError::RateLimited(error_message(body))),
        other => Err(ApiError::Unexpected(other, error_message(body))),
    }
}

fn error_message(body: &Value) -> String {
    body["error"]["message"]
        .as_str()
        .unwrap_or("unknown error")
        .to_string()
}
