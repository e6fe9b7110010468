use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use tokio::sync::Mutex;

use spotistat::management::{
    ByteCache, CallbackListener, OAUTH_CODE_KEY, REFRESH_TOKEN_KEY, TokenExchanger, TokenManager,
    WaitFn,
};
use spotistat::spotify::auth::AuthError;
use spotistat::types::Token;

fn token(access: &str, refresh: &str) -> Token {
    Token {
        access_token: access.to_string(),
        refresh_token: refresh.to_string(),
        scope: String::new(),
        expires_in: 3600,
        obtained_at: 0,
    }
}

/// In-memory byte cache counting reads and writes per key.
struct MemCache {
    entries: Mutex<HashMap<String, Vec<u8>>>,
    reads: Mutex<HashMap<String, usize>>,
    writes: Mutex<HashMap<String, usize>>,
    /// Number of reads of the code key that fail before a code appears.
    code_arrives_on_read: usize,
}

impl MemCache {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            entries: Mutex::new(HashMap::new()),
            reads: Mutex::new(HashMap::new()),
            writes: Mutex::new(HashMap::new()),
            code_arrives_on_read: 0,
        })
    }

    fn with_delayed_code(code_arrives_on_read: usize) -> Arc<Self> {
        Arc::new(Self {
            entries: Mutex::new(HashMap::new()),
            reads: Mutex::new(HashMap::new()),
            writes: Mutex::new(HashMap::new()),
            code_arrives_on_read,
        })
    }

    async fn seed(&self, key: &str, value: &str) {
        self.entries
            .lock()
            .await
            .insert(key.to_string(), value.as_bytes().to_vec());
    }

    async fn reads_of(&self, key: &str) -> usize {
        *self.reads.lock().await.get(key).unwrap_or(&0)
    }

    async fn writes_of(&self, key: &str) -> usize {
        *self.writes.lock().await.get(key).unwrap_or(&0)
    }
}

#[async_trait]
impl ByteCache for MemCache {
    async fn read(&self, key: &str) -> spotistat::Res<Vec<u8>> {
        let mut reads = self.reads.lock().await;
        let count = reads.entry(key.to_string()).or_insert(0);
        *count += 1;
        let count = *count;
        drop(reads);

        if key == OAUTH_CODE_KEY && count >= self.code_arrives_on_read {
            let mut entries = self.entries.lock().await;
            entries
                .entry(key.to_string())
                .or_insert_with(|| b"the-code".to_vec());
        }

        match self.entries.lock().await.get(key) {
            Some(value) => Ok(value.clone()),
            None => Err("not cached".into()),
        }
    }

    async fn write(&self, key: &str, data: &[u8]) -> spotistat::Res<()> {
        *self
            .writes
            .lock()
            .await
            .entry(key.to_string())
            .or_insert(0) += 1;
        self.entries
            .lock()
            .await
            .insert(key.to_string(), data.to_vec());
        Ok(())
    }
}

struct MockExchanger {
    refresh_calls: AtomicUsize,
    exchange_calls: AtomicUsize,
    refresh_result: fn() -> Result<Token, AuthError>,
}

impl MockExchanger {
    fn new(refresh_result: fn() -> Result<Token, AuthError>) -> Arc<Self> {
        Arc::new(Self {
            refresh_calls: AtomicUsize::new(0),
            exchange_calls: AtomicUsize::new(0),
            refresh_result,
        })
    }
}

#[async_trait]
impl TokenExchanger for MockExchanger {
    async fn exchange_code(&self, code: &str) -> Result<Token, AuthError> {
        assert_eq!(code, "the-code");
        self.exchange_calls.fetch_add(1, Ordering::SeqCst);
        Ok(token("bootstrapped-access", "bootstrapped-refresh"))
    }

    async fn refresh(&self, _refresh_token: &str) -> Result<Token, AuthError> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        // Hold the lock for a moment so concurrent callers pile up behind it.
        tokio::time::sleep(Duration::from_millis(20)).await;
        (self.refresh_result)()
    }

    fn authorization_url(&self) -> String {
        String::new()
    }
}

struct NoopListener {
    starts: AtomicUsize,
}

impl NoopListener {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            starts: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl CallbackListener for NoopListener {
    async fn start(&self) -> spotistat::Res<()> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn noop_wait() -> WaitFn {
    Box::new(|_| Box::pin(async {}))
}

#[tokio::test]
async fn test_concurrent_callers_trigger_exactly_one_refresh() {
    let cache = MemCache::new();
    cache.seed(REFRESH_TOKEN_KEY, "stored-refresh").await;

    let exchanger = MockExchanger::new(|| Ok(token("fresh-access", "rotated-refresh")));
    let manager = TokenManager::with_wait(
        cache.clone(),
        exchanger.clone(),
        NoopListener::new(),
        noop_wait(),
    );
    manager.bootstrap().await.unwrap();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let manager = Arc::clone(&manager);
        handles.push(tokio::spawn(async move {
            manager.access_token().await.unwrap()
        }));
    }
    for handle in handles {
        assert_eq!(handle.await.unwrap(), "fresh-access");
    }

    assert_eq!(exchanger.refresh_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_rotated_refresh_token_is_persisted_before_adoption() {
    let cache = MemCache::new();
    cache.seed(REFRESH_TOKEN_KEY, "stored-refresh").await;

    let exchanger = MockExchanger::new(|| Ok(token("fresh-access", "rotated-refresh")));
    let manager = TokenManager::with_wait(
        cache.clone(),
        exchanger.clone(),
        NoopListener::new(),
        noop_wait(),
    );
    manager.bootstrap().await.unwrap();
    manager.access_token().await.unwrap();

    assert_eq!(cache.writes_of(REFRESH_TOKEN_KEY).await, 1);
    let stored = cache.entries.lock().await.get(REFRESH_TOKEN_KEY).cloned();
    assert_eq!(stored.as_deref(), Some(b"rotated-refresh".as_slice()));
}

#[tokio::test]
async fn test_bootstrap_waits_for_code_then_exchanges_once() {
    // No stored refresh token; the code shows up on the third cache poll.
    let cache = MemCache::with_delayed_code(3);
    let exchanger = MockExchanger::new(|| Ok(token("unused", "unused")));
    let listener = NoopListener::new();
    let manager = TokenManager::with_wait(
        cache.clone(),
        exchanger.clone(),
        listener.clone(),
        noop_wait(),
    );

    manager.bootstrap().await.unwrap();

    assert_eq!(listener.starts.load(Ordering::SeqCst), 1);
    assert_eq!(cache.reads_of(OAUTH_CODE_KEY).await, 3);
    assert_eq!(exchanger.exchange_calls.load(Ordering::SeqCst), 1);
    assert_eq!(cache.writes_of(REFRESH_TOKEN_KEY).await, 1);

    // The single-use code is cleared after the exchange.
    let code = cache.entries.lock().await.get(OAUTH_CODE_KEY).cloned();
    assert_eq!(code.as_deref(), Some(b"".as_slice()));
}

#[tokio::test]
async fn test_invalid_refresh_token_falls_back_to_authorization() {
    let cache = MemCache::with_delayed_code(1);
    cache.seed(REFRESH_TOKEN_KEY, "revoked-refresh").await;

    let exchanger =
        MockExchanger::new(|| Err(AuthError::InvalidGrant("refresh token revoked".to_string())));
    let listener = NoopListener::new();
    let manager = TokenManager::with_wait(
        cache.clone(),
        exchanger.clone(),
        listener.clone(),
        noop_wait(),
    );
    manager.bootstrap().await.unwrap();

    let access = manager.access_token().await.unwrap();

    assert_eq!(access, "bootstrapped-access");
    assert_eq!(exchanger.refresh_calls.load(Ordering::SeqCst), 1);
    assert_eq!(exchanger.exchange_calls.load(Ordering::SeqCst), 1);
    assert_eq!(listener.starts.load(Ordering::SeqCst), 1);
}
