use std::{collections::HashMap, sync::Arc};

use axum::{Extension, extract::Query, response::Html};
use tokio::sync::Notify;

use crate::{
    management::{ByteCache, OAUTH_CODE_KEY},
    warning,
};

/// Shared state of one callback-server run.
pub struct CallbackContext {
    pub cache: Arc<dyn ByteCache>,
    pub done: Arc<Notify>,
}

/// Handles the OAuth redirect.
///
/// The one-time code is written into the byte cache and the server is told
/// to shut down; exchanging the code for tokens happens in the credential
/// manager, which is polling the cache.
pub async fn callback(
    Query(params): Query<HashMap<String, String>>,
    Extension(ctx): Extension<Arc<CallbackContext>>,
) -> Html<&'static str> {
    if let Some(error) = params.get("error") {
        warning!("Authorization denied: {}", error);
        return Html("<h4>Authorization denied.</h4>");
    }

    let Some(code) = params.get("code") else {
        return Html("<h4>Missing authorization code.</h4>");
    };

    match ctx.cache.write(OAUTH_CODE_KEY, code.as_bytes()).await {
        Ok(()) => {
            ctx.done.notify_one();
            Html("<h2>Authentication successful.</h2><p>Close browser window.</p>")
        }
        Err(e) => {
            warning!("Failed to store authorization code: {}", e);
            Html("<h4>Login failed.</h4>")
        }
    }
}
