//! Staleness-driven artist refresh.
//!
//! Each cycle reads the sparse catalog projection, classifies every entry by
//! how overdue its cached data is, and hands the stalest ids to the batch
//! refresh source. The source may cap how many ids it accepts per call; the
//! excess is simply not refreshed this cycle and stays eligible, with equal
//! or higher priority, on the next one.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};

use crate::{
    Res, info,
    scheduler::{RatePolicy, TaskSpec},
    spotify::error::ApiError,
    types::{Artist, SkeletonArtist},
};

pub const UPDATE_PERIOD_SECS: u64 = 30;

const HIGH_STALE_HOURS: i64 = 72;
const MEDIUM_STALE_HOURS: i64 = 24;
const LOW_STALE_HOURS: i64 = 12;

/// Staleness priority, ordered so that an ascending sort puts the most
/// urgent entries first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Priority {
    Max,
    High,
    Medium,
    Low,
    DoNotUpdate,
}

/// Classifies a last-updated timestamp against `now`.
///
/// Thresholds are strict: an entry exactly 12/24/72 hours old is not yet
/// promoted to the higher tier. An entry never updated at all is always
/// `Max`.
pub fn classify(last_updated: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Priority {
    let Some(updated_at) = last_updated else {
        return Priority::Max;
    };
    if updated_at < now - TimeDelta::hours(HIGH_STALE_HOURS) {
        Priority::High
    } else if updated_at < now - TimeDelta::hours(MEDIUM_STALE_HOURS) {
        Priority::Medium
    } else if updated_at < now - TimeDelta::hours(LOW_STALE_HOURS) {
        Priority::Low
    } else {
        Priority::DoNotUpdate
    }
}

/// Read/write access to the locally kept artist catalog.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn list_skeletons(&self) -> Res<Vec<SkeletonArtist>>;
    async fn batch_update(&self, artists: Vec<Artist>) -> Res<()>;
}

/// Fetches full records for a batch of ids. Implementations may silently cap
/// the accepted id-list length.
#[async_trait]
pub trait BatchRefreshSource: Send + Sync {
    async fn fetch_many(&self, ids: &[String]) -> Result<Vec<Artist>, ApiError>;
}

/// Periodic task that batch-refreshes the stalest catalog entries.
pub struct ArtistUpdater {
    catalog: Arc<dyn CatalogStore>,
    source: Arc<dyn BatchRefreshSource>,
}

impl ArtistUpdater {
    pub fn new(catalog: Arc<dyn CatalogStore>, source: Arc<dyn BatchRefreshSource>) -> Arc<Self> {
        Arc::new(Self { catalog, source })
    }

    /// Builds the scheduler specification driving this updater.
    pub fn spec(self: &Arc<Self>) -> TaskSpec {
        let updater = Arc::clone(self);
        TaskSpec {
            name: "artist-updater".to_string(),
            action: Box::new(move || {
                let updater = Arc::clone(&updater);
                Box::pin(async move { updater.run_cycle().await })
            }),
            policy: RatePolicy::FixedDelay,
            initial_delay: Duration::ZERO,
            delay: Box::new(|| Duration::from_secs(UPDATE_PERIOD_SECS)),
        }
    }

    /// One refresh cycle: classify, select, fetch, write back.
    pub async fn run_cycle(&self) -> Res<()> {
        let skeletons = self.catalog.list_skeletons().await?;
        let candidates = select_candidates(&skeletons, Utc::now());
        if candidates.is_empty() {
            return Ok(());
        }

        let updated = self.source.fetch_many(&candidates).await?;
        info!(
            "Refreshed {got} of {want} stale artists",
            got = updated.len(),
            want = candidates.len()
        );
        self.catalog.batch_update(updated).await?;
        Ok(())
    }
}

/// Orders the skeletons worth refreshing, most urgent first.
///
/// The sort is stable: entries of equal priority keep their original
/// relative order. `DoNotUpdate` entries are dropped entirely.
pub fn select_candidates(skeletons: &[SkeletonArtist], now: DateTime<Utc>) -> Vec<String> {
    let mut ranked: Vec<(String, Priority)> = skeletons
        .iter()
        .map(|s| (s.id.clone(), classify(s.updated_at, now)))
        .filter(|(_, priority)| *priority != Priority::DoNotUpdate)
        .collect();
    ranked.sort_by_key(|(_, priority)| *priority);
    ranked.into_iter().map(|(id, _)| id).collect()
}
