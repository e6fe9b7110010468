use std::{io, path::PathBuf, sync::Arc};

use async_trait::async_trait;

use crate::{
    Res,
    management::{CatalogManager, StoreError},
    tracker::PlayHistorySink,
    types::PlayedTrack,
};

/// File-backed play history.
///
/// Finished plays are appended to a JSON document; artists appearing in a
/// play are additionally seeded into the catalog so the updater starts
/// keeping their metadata fresh.
pub struct HistoryManager {
    path: PathBuf,
    catalog: Arc<CatalogManager>,
}

impl HistoryManager {
    pub fn new(catalog: Arc<CatalogManager>) -> Self {
        let mut path = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push("spotistat/history/plays.json");
        Self { path, catalog }
    }

    pub fn with_path(path: PathBuf, catalog: Arc<CatalogManager>) -> Self {
        Self { path, catalog }
    }

    pub async fn load(&self) -> Result<Vec<PlayedTrack>, StoreError> {
        let content = match async_fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let plays: Vec<PlayedTrack> = serde_json::from_str(&content)?;
        Ok(plays)
    }

    async fn append(&self, play: PlayedTrack) -> Result<(), StoreError> {
        let mut plays = self.load().await?;
        plays.push(play);
        if let Some(parent) = self.path.parent() {
            async_fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string_pretty(&plays)?;
        async_fs::write(&self.path, json).await?;
        Ok(())
    }
}

#[async_trait]
impl PlayHistorySink for HistoryManager {
    async fn record_finished_play(&self, play: PlayedTrack) -> Res<()> {
        for artist in &play.artists {
            if let Some(id) = &artist.id {
                self.catalog.add_if_absent(id, &artist.name).await?;
            }
        }
        self.append(play).await?;
        Ok(())
    }
}
