//! # API Module
//!
//! HTTP endpoints served by the local callback server during the one-time
//! authorization flow.
//!
//! ## Endpoints
//!
//! - [`callback`] - Receives the OAuth redirect from Spotify's authorization
//!   server and drops the one-time code into the byte cache, where the
//!   credential manager's bootstrap loop picks it up. The code exchange
//!   itself is the credential manager's job, not the handler's.
//! - [`health`] - Health check returning application status and version.

mod callback;
mod health;

pub use callback::{CallbackContext, callback};
pub use health::health;
