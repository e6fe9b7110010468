use std::sync::Arc;

use crate::{
    error, info,
    management::{ByteCache, CatalogManager, FileCache, HistoryManager, TokenManager},
    scheduler::Scheduler,
    server::CallbackServer,
    spotify::{artists::ArtistClient, auth::SpotifyExchanger, player::PlayerClient},
    success,
    tracker::TrackingPoller,
    updater::ArtistUpdater,
    warning,
};

/// Composition root: wires every collaborator, starts the scheduler and
/// parks until Ctrl-C.
///
/// One [`TokenManager`] instance is built here and shared by reference with
/// both API clients; its bootstrap may block on the interactive
/// authorization flow on first run.
pub async fn run() {
    let cache: Arc<dyn ByteCache> = Arc::new(FileCache::new());
    let listener = Arc::new(CallbackServer::new(Arc::clone(&cache)));
    let tokens = TokenManager::new(cache, Arc::new(SpotifyExchanger::new()), listener);

    if let Err(e) = tokens.bootstrap().await {
        error!("Authorization bootstrap failed: {}", e);
    }

    let catalog = Arc::new(CatalogManager::new());
    let history = Arc::new(HistoryManager::new(Arc::clone(&catalog)));
    let player = Arc::new(PlayerClient::new(Arc::clone(&tokens)));
    let artists = Arc::new(ArtistClient::new(Arc::clone(&tokens)));

    let poller = TrackingPoller::new(player, history);
    let updater = ArtistUpdater::new(catalog, artists);

    let mut scheduler = Scheduler::new();
    scheduler.submit(poller.spec());
    scheduler.submit(updater.spec());
    scheduler.start();
    info!("spotistat is running. Press Ctrl-C to stop.");

    if let Err(e) = tokio::signal::ctrl_c().await {
        warning!("Failed to listen for shutdown signal: {}", e);
    }

    scheduler.stop();
    success!("Stopped.");
}
