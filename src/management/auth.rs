//! Credential lifecycle management.
//!
//! A single [`TokenManager`] instance is constructed at the composition root
//! and shared by reference with every consumer of the Spotify API. All token
//! state lives behind one lock, acquired for the full duration of
//! check-then-refresh-then-persist, so N concurrent callers observing an
//! expired token still trigger exactly one underlying refresh call.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use tokio::sync::Mutex;

use crate::{
    BoxFuture, Res, info, management::ByteCache, spotify::auth::AuthError, types::Token, warning,
};

/// Cache key under which the refresh token is durably mirrored.
pub const REFRESH_TOKEN_KEY: &str = "refresh_token.txt";
/// Cache key the callback listener drops the one-time code into.
pub const OAUTH_CODE_KEY: &str = "oauth_code.txt";

/// How long to wait between cache polls for the one-time code.
const CODE_POLL_WAIT_SECS: u64 = 10;

/// Refresh this long before the provider-reported expiry so a token handed
/// out is never on the verge of dying mid-request.
const REFRESH_MARGIN_SECS: i64 = 60;

/// Exchanges grants for tokens against the authorization provider.
#[async_trait]
pub trait TokenExchanger: Send + Sync {
    /// Exchanges a one-time authorization code for a token pair.
    async fn exchange_code(&self, code: &str) -> Result<Token, AuthError>;
    /// Exchanges a refresh token for a fresh access token.
    async fn refresh(&self, refresh_token: &str) -> Result<Token, AuthError>;
    /// The URL a user must visit to authorize this application.
    fn authorization_url(&self) -> String;
}

/// Local listener that receives the one-time authorization code and writes
/// it into the byte cache, then stops itself.
#[async_trait]
pub trait CallbackListener: Send + Sync {
    /// Begins listening; resolves once the listener accepts requests.
    async fn start(&self) -> Res<()>;
}

/// Injected wait primitive, substitutable in tests.
pub type WaitFn = Box<dyn Fn(Duration) -> BoxFuture<()> + Send + Sync>;

struct CredentialState {
    access_token: Option<String>,
    expires_at: DateTime<Utc>,
    refresh_token: String,
}

/// Owns access/refresh token state and keeps it valid with minimal
/// redundant network traffic.
pub struct TokenManager {
    creds: Mutex<CredentialState>,
    cache: Arc<dyn ByteCache>,
    exchanger: Arc<dyn TokenExchanger>,
    listener: Arc<dyn CallbackListener>,
    wait: WaitFn,
}

impl TokenManager {
    pub fn new(
        cache: Arc<dyn ByteCache>,
        exchanger: Arc<dyn TokenExchanger>,
        listener: Arc<dyn CallbackListener>,
    ) -> Arc<Self> {
        Self::with_wait(
            cache,
            exchanger,
            listener,
            Box::new(|d| Box::pin(tokio::time::sleep(d))),
        )
    }

    /// Like [`TokenManager::new`] but with a custom wait primitive for the
    /// authorization code poll loop.
    pub fn with_wait(
        cache: Arc<dyn ByteCache>,
        exchanger: Arc<dyn TokenExchanger>,
        listener: Arc<dyn CallbackListener>,
        wait: WaitFn,
    ) -> Arc<Self> {
        Arc::new(Self {
            creds: Mutex::new(CredentialState {
                access_token: None,
                expires_at: Utc::now(),
                refresh_token: String::new(),
            }),
            cache,
            exchanger,
            listener,
            wait,
        })
    }

    /// Loads the persisted refresh token, or runs the interactive
    /// authorization workflow if none exists yet.
    pub async fn bootstrap(&self) -> Res<()> {
        let mut creds = self.creds.lock().await;
        match self.read_cache_string(REFRESH_TOKEN_KEY).await {
            Some(stored) if !stored.is_empty() => {
                creds.refresh_token = stored;
                Ok(())
            }
            _ => self.authorize(&mut creds).await,
        }
    }

    /// Runs the interactive authorization workflow unconditionally,
    /// replacing whatever credentials are currently held.
    pub async fn authorize_interactive(&self) -> Res<()> {
        let mut creds = self.creds.lock().await;
        self.authorize(&mut creds).await
    }

    /// Returns a valid access token, refreshing it first if needed.
    ///
    /// The lock spans the whole check-refresh-persist sequence; concurrent
    /// callers block for the duration of a single refresh rather than each
    /// firing their own.
    pub async fn access_token(&self) -> Res<String> {
        let mut creds = self.creds.lock().await;

        let stale = creds.access_token.is_none()
            || Utc::now() >= creds.expires_at - TimeDelta::seconds(REFRESH_MARGIN_SECS);
        if stale {
            match self.exchanger.refresh(&creds.refresh_token).await {
                Ok(token) => self.adopt(&mut creds, token).await?,
                Err(AuthError::InvalidGrant(msg)) => {
                    // The refresh token itself is dead; only a full
                    // re-authorization can recover.
                    warning!("Refresh token invalid ({}), re-authorizing", msg);
                    self.authorize(&mut creds).await?;
                }
                Err(e) => return Err(e.into()),
            }
        }

        match creds.access_token.clone() {
            Some(token) => Ok(token),
            None => Err("no access token issued".into()),
        }
    }

    /// Runs the interactive authorization workflow.
    ///
    /// Starts the callback listener, announces the authorization URL, then
    /// polls the byte cache for the one-time code. The poll loop has no
    /// timeout: it blocks the calling context, holding the credential lock,
    /// until a code appears.
    async fn authorize(&self, creds: &mut CredentialState) -> Res<()> {
        self.listener.start().await?;
        let url = self.exchanger.authorization_url();
        info!("Authorize this application by visiting:\n{}", url);
        if webbrowser::open(&url).is_err() {
            warning!("Failed to open browser. Please navigate to the URL manually.");
        }

        let code = loop {
            if let Some(code) = self.read_cache_string(OAUTH_CODE_KEY).await {
                if !code.is_empty() {
                    break code;
                }
            }
            (self.wait)(Duration::from_secs(CODE_POLL_WAIT_SECS)).await;
        };

        let token = self.exchanger.exchange_code(code.trim()).await?;
        self.adopt(creds, token).await?;

        // The code is single-use; leaving it around would poison the next
        // authorization run.
        self.cache.write(OAUTH_CODE_KEY, b"").await?;
        Ok(())
    }

    /// Adopts a freshly issued token pair.
    ///
    /// A newly issued refresh token is persisted before it replaces the
    /// in-memory one: it must never exist only in memory.
    async fn adopt(&self, creds: &mut CredentialState, token: Token) -> Res<()> {
        if !token.refresh_token.is_empty() && token.refresh_token != creds.refresh_token {
            self.cache
                .write(REFRESH_TOKEN_KEY, token.refresh_token.as_bytes())
                .await?;
            creds.refresh_token = token.refresh_token;
        }
        creds.expires_at =
            Utc::now() + TimeDelta::seconds(token.expires_in.min(i64::MAX as u64) as i64);
        creds.access_token = Some(token.access_token);
        Ok(())
    }

    async fn read_cache_string(&self, key: &str) -> Option<String> {
        match self.cache.read(key).await {
            Ok(bytes) => Some(String::from_utf8_lossy(&bytes).trim().to_string()),
            Err(_) => None,
        }
    }
}
