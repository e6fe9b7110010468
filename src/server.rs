use std::{net::SocketAddr, str::FromStr, sync::Arc};

use async_trait::async_trait;
use axum::{Extension, Router, routing::get};
use tokio::sync::Notify;

use crate::{
    Res, api,
    api::CallbackContext,
    config,
    management::{ByteCache, CallbackListener},
    warning,
};

/// Local HTTP server receiving the one-time authorization code.
///
/// One `start` serves exactly one authorization: after the callback handler
/// has written a code into the cache the server shuts itself down.
pub struct CallbackServer {
    cache: Arc<dyn ByteCache>,
}

impl CallbackServer {
    pub fn new(cache: Arc<dyn ByteCache>) -> Self {
        Self { cache }
    }
}

#[async_trait]
impl CallbackListener for CallbackServer {
    async fn start(&self) -> Res<()> {
        let done = Arc::new(Notify::new());
        let ctx = Arc::new(CallbackContext {
            cache: Arc::clone(&self.cache),
            done: Arc::clone(&done),
        });

        let app = Router::new()
            .route("/health", get(api::health))
            .route("/callback", get(api::callback).layer(Extension(ctx)));

        let addr = SocketAddr::from_str(&config::server_addr())?;
        let listener = tokio::net::TcpListener::bind(&addr).await?;

        tokio::spawn(async move {
            let shutdown = async move { done.notified().await };
            if let Err(e) = axum::serve(listener, app)
                .with_graceful_shutdown(shutdown)
                .await
            {
                warning!("Callback server error: {}", e);
            }
        });

        Ok(())
    }
}
