use std::path::PathBuf;

use async_trait::async_trait;

use crate::Res;

/// Small byte-oriented key-value cache.
///
/// The credential manager persists its refresh token and picks up the
/// one-time authorization code through this seam. No atomicity or locking
/// is assumed beyond what the manager's own lock provides.
#[async_trait]
pub trait ByteCache: Send + Sync {
    async fn read(&self, key: &str) -> Res<Vec<u8>>;
    async fn write(&self, key: &str, data: &[u8]) -> Res<()>;
}

/// File-per-key cache under the local data directory.
pub struct FileCache;

impl FileCache {
    pub fn new() -> Self {
        FileCache
    }

    fn path_for(key: &str) -> PathBuf {
        let mut path = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push(format!("spotistat/cache/{key}"));
        path
    }
}

impl Default for FileCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ByteCache for FileCache {
    async fn read(&self, key: &str) -> Res<Vec<u8>> {
        let path = Self::path_for(key);
        let data = async_fs::read(&path).await?;
        Ok(data)
    }

    async fn write(&self, key: &str, data: &[u8]) -> Res<()> {
        let path = Self::path_for(key);
        if let Some(parent) = path.parent() {
            async_fs::create_dir_all(parent).await?;
        }
        async_fs::write(&path, data).await?;
        Ok(())
    }
}
