use std::sync::Arc;

use crate::{
    error,
    management::{ByteCache, FileCache, TokenManager},
    server::CallbackServer,
    spotify::auth::SpotifyExchanger,
    success,
};

/// Runs the interactive authorization flow standalone and persists the
/// resulting refresh token.
pub async fn auth() {
    let cache: Arc<dyn ByteCache> = Arc::new(FileCache::new());
    let listener = Arc::new(CallbackServer::new(Arc::clone(&cache)));
    let manager = TokenManager::new(cache, Arc::new(SpotifyExchanger::new()), listener);

    match manager.authorize_interactive().await {
        Ok(()) => success!("Authentication successful!"),
        Err(e) => error!("Authentication failed: {}", e),
    }
}
