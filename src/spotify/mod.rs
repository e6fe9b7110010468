//! # Spotify Integration Module
//!
//! Integration layer between the daemon and the Spotify Web API. It handles
//! all HTTP communication, the OAuth 2.0 PKCE grant exchanges, and the
//! classification of API failures into the closed [`error::ApiError`] enum
//! that the polling and updating cycles branch over.
//!
//! ## Core Modules
//!
//! - [`auth`] - PKCE helpers, the authorization URL, and the
//!   [`auth::SpotifyExchanger`] that performs code and refresh-token grants
//!   against the accounts service.
//! - [`player`] - Currently-playing and device queries backing the playback
//!   tracker.
//! - [`artists`] - Batched artist lookups backing the staleness updater.
//! - [`error`] - Failure taxonomy and the status/body classification
//!   function.
//!
//! ## Authentication Strategy
//!
//! All requests carry a bearer token obtained from the shared
//! [`crate::management::TokenManager`]; clients never refresh tokens
//! themselves. The PKCE flow avoids storing a client secret: a
//! cryptographically random verifier is generated per exchanger, its SHA256
//! challenge is embedded in the authorization URL, and the verifier proves
//! possession during the code exchange.
//!
//! ## API Coverage
//!
//! - `GET /me/player/currently-playing` - playback snapshot
//! - `GET /me/player/devices` - active output device
//! - `GET /artists` - batch artist refresh (up to 50 ids per call)
//! - `POST /api/token` - code exchange and token refresh

pub mod artists;
pub mod auth;
pub mod error;
pub mod player;
