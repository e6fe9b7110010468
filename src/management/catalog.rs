use std::{fmt, io, path::PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::{
    types::{Artist, SkeletonArtist},
    updater::CatalogStore,
};

#[derive(Debug)]
pub enum StoreError {
    Io(io::Error),
    Serde(serde_json::Error),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Io(e) => write!(f, "io error: {}", e),
            StoreError::Serde(e) => write!(f, "serialization error: {}", e),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<io::Error> for StoreError {
    fn from(err: io::Error) -> Self {
        StoreError::Io(err)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serde(err)
    }
}

/// File-backed artist catalog.
///
/// The whole catalog is one JSON document; every mutation rewrites it. That
/// is fine for the catalog sizes a single listener produces. Mutations are
/// load-modify-write spans serialized by an internal lock: the history sink
/// seeds entries while the updater writes batches, on independent scheduler
/// tasks, and an unguarded interleaving would let the last writer drop the
/// other's entries.
pub struct CatalogManager {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl CatalogManager {
    pub fn new() -> Self {
        let mut path = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push("spotistat/catalog/artists.json");
        Self::with_path(path)
    }

    pub fn with_path(path: PathBuf) -> Self {
        Self {
            path,
            write_lock: Mutex::new(()),
        }
    }

    pub async fn load(&self) -> Result<Vec<Artist>, StoreError> {
        let content = match async_fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let artists: Vec<Artist> = serde_json::from_str(&content)?;
        Ok(artists)
    }

    pub async fn persist(&self, artists: &[Artist]) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            async_fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string_pretty(artists)?;
        async_fs::write(&self.path, json).await?;
        Ok(())
    }

    /// Inserts a bare catalog entry for an artist seen in a finished play.
    ///
    /// Newly seen artists carry no `updated_at`, which makes them top
    /// priority for the next updater cycle. Known ids are left untouched.
    pub async fn add_if_absent(&self, id: &str, name: &str) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut artists = self.load().await?;
        if artists.iter().any(|a| a.id == id) {
            return Ok(());
        }
        artists.push(Artist {
            id: id.to_string(),
            name: name.to_string(),
            genres: Vec::new(),
            followers: None,
            popularity: None,
            image: None,
            updated_at: None,
        });
        self.persist(&artists).await
    }
}

impl Default for CatalogManager {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CatalogStore for CatalogManager {
    async fn list_skeletons(&self) -> crate::Res<Vec<SkeletonArtist>> {
        let artists = self.load().await?;
        Ok(artists
            .into_iter()
            .map(|a| SkeletonArtist {
                id: a.id,
                updated_at: a.updated_at,
            })
            .collect())
    }

    async fn batch_update(&self, updated: Vec<Artist>) -> crate::Res<()> {
        let _guard = self.write_lock.lock().await;
        let mut artists = self.load().await?;
        for fresh in updated {
            match artists.iter_mut().find(|a| a.id == fresh.id) {
                Some(existing) => *existing = fresh,
                None => artists.push(fresh),
            }
        }
        self.persist(&artists).await?;
        Ok(())
    }
}
