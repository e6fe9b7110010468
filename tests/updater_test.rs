use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;
use chrono::{TimeDelta, Utc};
use tokio::sync::Mutex;

use spotistat::spotify::error::ApiError;
use spotistat::types::{Artist, SkeletonArtist};
use spotistat::updater::{
    ArtistUpdater, BatchRefreshSource, CatalogStore, Priority, classify, select_candidates,
};

fn skeleton(id: &str, age_hours: Option<i64>) -> SkeletonArtist {
    SkeletonArtist {
        id: id.to_string(),
        updated_at: age_hours.map(|h| Utc::now() - TimeDelta::hours(h)),
    }
}

fn full_artist(id: &str) -> Artist {
    Artist {
        id: id.to_string(),
        name: format!("artist {}", id),
        genres: vec![],
        followers: None,
        popularity: None,
        image: None,
        updated_at: Some(Utc::now()),
    }
}

#[test]
fn test_classify_never_updated_is_max() {
    let now = Utc::now();
    assert_eq!(classify(None, now), Priority::Max);
    assert_eq!(classify(None, now - TimeDelta::days(400)), Priority::Max);
}

#[test]
fn test_classify_thresholds() {
    let now = Utc::now();
    let age = |hours: i64| Some(now - TimeDelta::hours(hours));

    assert_eq!(classify(age(73), now), Priority::High);
    assert_eq!(classify(age(25), now), Priority::Medium);
    assert_eq!(classify(age(13), now), Priority::Low);
    assert_eq!(classify(age(11), now), Priority::DoNotUpdate);
    assert_eq!(classify(age(5), now), Priority::DoNotUpdate);
}

#[test]
fn test_classify_boundaries_are_strict() {
    let now = Utc::now();
    let age = |hours: i64| Some(now - TimeDelta::hours(hours));

    // An item exactly at a threshold is not yet promoted to the higher tier.
    assert_eq!(classify(age(12), now), Priority::DoNotUpdate);
    assert_eq!(classify(age(24), now), Priority::Low);
    assert_eq!(classify(age(72), now), Priority::Medium);
}

#[test]
fn test_priority_sort_order() {
    let mut priorities = vec![
        Priority::Low,
        Priority::Max,
        Priority::DoNotUpdate,
        Priority::Medium,
        Priority::High,
    ];
    priorities.sort();
    assert_eq!(
        priorities,
        vec![
            Priority::Max,
            Priority::High,
            Priority::Medium,
            Priority::Low,
            Priority::DoNotUpdate
        ]
    );
}

#[test]
fn test_select_candidates_ordering() {
    let now = Utc::now();
    let skeletons = vec![
        skeleton("five", Some(5)),
        skeleton("thirteen", Some(13)),
        skeleton("never", None),
        skeleton("twentyfive", Some(25)),
        skeleton("seventythree", Some(73)),
    ];

    let ids = select_candidates(&skeletons, now);
    assert_eq!(ids, vec!["never", "seventythree", "twentyfive", "thirteen"]);
}

#[test]
fn test_select_candidates_stable_for_equal_priority() {
    let now = Utc::now();
    let skeletons = vec![
        skeleton("a", Some(80)),
        skeleton("b", Some(75)),
        skeleton("c", Some(90)),
    ];

    // All HIGH; ties preserve original relative order, not age order.
    let ids = select_candidates(&skeletons, now);
    assert_eq!(ids, vec!["a", "b", "c"]);
}

#[test]
fn test_select_candidates_empty_when_all_fresh() {
    let now = Utc::now();
    let skeletons = vec![skeleton("a", Some(1)), skeleton("b", Some(11))];
    assert!(select_candidates(&skeletons, now).is_empty());
}

struct MockCatalog {
    skeletons: Vec<SkeletonArtist>,
    updates: Mutex<Vec<Vec<Artist>>>,
}

#[async_trait]
impl CatalogStore for MockCatalog {
    async fn list_skeletons(&self) -> spotistat::Res<Vec<SkeletonArtist>> {
        Ok(self.skeletons.clone())
    }

    async fn batch_update(&self, artists: Vec<Artist>) -> spotistat::Res<()> {
        self.updates.lock().await.push(artists);
        Ok(())
    }
}

struct MockSource {
    cap: usize,
    calls: AtomicUsize,
    requested: Mutex<Vec<Vec<String>>>,
}

#[async_trait]
impl BatchRefreshSource for MockSource {
    async fn fetch_many(&self, ids: &[String]) -> Result<Vec<Artist>, ApiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requested.lock().await.push(ids.to_vec());
        Ok(ids
            .iter()
            .take(self.cap)
            .map(|id| full_artist(id))
            .collect())
    }
}

#[tokio::test]
async fn test_update_cycle_fetches_in_priority_order_and_writes_back() {
    let catalog = Arc::new(MockCatalog {
        skeletons: vec![
            skeleton("low", Some(13)),
            skeleton("max", None),
            skeleton("high", Some(100)),
        ],
        updates: Mutex::new(vec![]),
    });
    let source = Arc::new(MockSource {
        cap: usize::MAX,
        calls: AtomicUsize::new(0),
        requested: Mutex::new(vec![]),
    });

    let updater = ArtistUpdater::new(catalog.clone(), source.clone());
    updater.run_cycle().await.unwrap();

    let requested = source.requested.lock().await;
    assert_eq!(requested.len(), 1);
    assert_eq!(requested[0], vec!["max", "high", "low"]);

    let updates = catalog.updates.lock().await;
    assert_eq!(updates.len(), 1);
    let ids: Vec<&str> = updates[0].iter().map(|a| a.id.as_str()).collect();
    assert_eq!(ids, vec!["max", "high", "low"]);
}

#[tokio::test]
async fn test_update_cycle_accepts_capped_batches() {
    let catalog = Arc::new(MockCatalog {
        skeletons: vec![
            skeleton("a", None),
            skeleton("b", None),
            skeleton("c", None),
        ],
        updates: Mutex::new(vec![]),
    });
    let source = Arc::new(MockSource {
        cap: 2,
        calls: AtomicUsize::new(0),
        requested: Mutex::new(vec![]),
    });

    let updater = ArtistUpdater::new(catalog.clone(), source.clone());
    updater.run_cycle().await.unwrap();

    // Only what the source returned is written back; the rest stays stale
    // and eligible for the next cycle.
    let updates = catalog.updates.lock().await;
    assert_eq!(updates[0].len(), 2);
}

#[tokio::test]
async fn test_update_cycle_no_candidates_makes_no_calls() {
    let catalog = Arc::new(MockCatalog {
        skeletons: vec![skeleton("fresh", Some(1))],
        updates: Mutex::new(vec![]),
    });
    let source = Arc::new(MockSource {
        cap: usize::MAX,
        calls: AtomicUsize::new(0),
        requested: Mutex::new(vec![]),
    });

    let updater = ArtistUpdater::new(catalog.clone(), source.clone());
    updater.run_cycle().await.unwrap();

    assert_eq!(source.calls.load(Ordering::SeqCst), 0);
    assert!(catalog.updates.lock().await.is_empty());
}
