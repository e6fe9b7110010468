//! Playback tracking: turns noisy position/duration snapshots into discrete
//! "track finished" events.
//!
//! The poller owns a small state machine. While nothing is playing it polls
//! at the slow interval; while a track is audibly playing it polls fast.
//! Interval switches are edge-triggered so the scheduler's delay provider is
//! only redirected on an actual mode change. A track counts as finished once
//! at least 70% of its duration has been listened to in the current session,
//! measured against a baseline that follows the lowest observed position so
//! a rewind extends the session instead of resetting it.

use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::{
    Res,
    scheduler::{RatePolicy, TaskSpec},
    spotify::error::ApiError,
    types::{Device, PlaybackSnapshot, PlayedTrack, TrackArtist},
    warning,
};

pub const POLL_INTERVAL_ACTIVE_SECS: u64 = 5;
pub const POLL_INTERVAL_IDLE_SECS: u64 = 15;

/// Fraction of a track's duration that must be listened to before the play
/// is recorded.
const FINISH_RATIO: f64 = 0.70;

/// Source of "now playing" observations.
///
/// `fetch_current` returns `Ok(None)` when nothing is playing; failures come
/// back classified rather than as ambiguous nulls.
#[async_trait]
pub trait NowPlayingSource: Send + Sync {
    async fn fetch_current(&self) -> Result<Option<PlaybackSnapshot>, ApiError>;
    async fn fetch_active_device(&self) -> Result<Option<Device>, ApiError>;
}

/// Destination for finished-play records.
#[async_trait]
pub trait PlayHistorySink: Send + Sync {
    async fn record_finished_play(&self, play: PlayedTrack) -> Res<()>;
}

/// The track currently being watched toward completion.
#[derive(Debug, Clone)]
pub struct TrackState {
    pub track_id: String,
    pub track_name: String,
    pub artists: Vec<TrackArtist>,
    pub duration_ms: u64,
    pub progress_ms: u64,
    baseline_ms: u64,
    pub played: bool,
    pub finished_at: Option<DateTime<Utc>>,
}

impl TrackState {
    /// Starts watching a freshly observed track. The baseline is the position
    /// at which we first saw it, not zero: joining mid-track must not count
    /// the unheard part.
    pub fn start(snapshot: &PlaybackSnapshot) -> Self {
        Self {
            track_id: snapshot.track_id.clone(),
            track_name: snapshot.track_name.clone(),
            artists: snapshot.artists.clone(),
            duration_ms: snapshot.duration_ms,
            progress_ms: snapshot.progress_ms,
            baseline_ms: snapshot.progress_ms,
            played: false,
            finished_at: None,
        }
    }

    /// Feeds one position sample into the state.
    ///
    /// A position below the current baseline lowers the baseline, so seeking
    /// back can only delay the finish determination. The `played` flag
    /// latches true at the first sample where the listened ratio reaches
    /// [`FINISH_RATIO`] and never reverts.
    pub fn update_progress(&mut self, progress_ms: u64) {
        if progress_ms < self.baseline_ms {
            self.baseline_ms = progress_ms;
        }
        if !self.played && self.duration_ms > 0 {
            let listened = (progress_ms - self.baseline_ms) as f64;
            if listened / self.duration_ms as f64 >= FINISH_RATIO {
                self.played = true;
                self.finished_at = Some(Utc::now());
            }
        }
        self.progress_ms = progress_ms;
    }
}

struct PollerState {
    current: Option<TrackState>,
    active_mode: bool,
}

/// Periodically polls the player and records finished plays.
pub struct TrackingPoller {
    playing: Arc<dyn NowPlayingSource>,
    history: Arc<dyn PlayHistorySink>,
    state: Mutex<PollerState>,
    interval_secs: AtomicU64,
}

impl TrackingPoller {
    pub fn new(playing: Arc<dyn NowPlayingSource>, history: Arc<dyn PlayHistorySink>) -> Arc<Self> {
        Arc::new(Self {
            playing,
            history,
            state: Mutex::new(PollerState {
                current: None,
                active_mode: false,
            }),
            interval_secs: AtomicU64::new(POLL_INTERVAL_IDLE_SECS),
        })
    }

    /// The current poll interval, read by the scheduler before every
    /// rescheduling decision.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.load(Ordering::Relaxed))
    }

    /// Builds the scheduler specification driving this poller.
    pub fn spec(self: &Arc<Self>) -> TaskSpec {
        let action_poller = Arc::clone(self);
        let delay_poller = Arc::clone(self);
        TaskSpec {
            name: "tracking-poller".to_string(),
            action: Box::new(move || {
                let poller = Arc::clone(&action_poller);
                Box::pin(async move { poller.run_cycle().await })
            }),
            policy: RatePolicy::FixedRate,
            initial_delay: Duration::ZERO,
            delay: Box::new(move || delay_poller.poll_interval()),
        }
    }

    /// One poll cycle.
    ///
    /// Remote failures other than "nothing playing" are logged and end the
    /// cycle without touching tracking state; the next scheduled poll simply
    /// tries again. Only a persistence failure propagates, into the
    /// scheduler's catch-all.
    pub async fn run_cycle(&self) -> Res<()> {
        let snapshot = match self.playing.fetch_current().await {
            Ok(snapshot) => snapshot,
            Err(ApiError::Empty) => None,
            Err(ApiError::AuthRejected(msg)) => {
                warning!("Poll skipped, authentication rejected: {}", msg);
                return Ok(());
            }
            Err(ApiError::RateLimited(msg)) => {
                // No explicit backoff; the next scheduled poll carries on.
                warning!("Poll skipped, rate limited: {}", msg);
                return Ok(());
            }
            Err(e) => {
                warning!("Poll skipped: {}", e);
                return Ok(());
            }
        };

        let mut state = self.state.lock().await;

        let Some(snapshot) = snapshot.filter(|s| s.is_playing) else {
            self.enter_idle_mode(&mut state);
            return Ok(());
        };

        self.enter_active_mode(&mut state);

        let same_track = state
            .current
            .as_ref()
            .is_some_and(|t| t.track_id == snapshot.track_id);
        if !same_track {
            // Any unfinished previous track is discarded silently.
            state.current = Some(TrackState::start(&snapshot));
            return Ok(());
        }

        let Some(track) = state.current.as_mut() else {
            return Ok(());
        };
        track.update_progress(snapshot.progress_ms);

        if track.played {
            // Clear only after the record is durably handed off; a failed
            // persist leaves the state intact so the next cycle retries.
            let finished = track.clone();
            self.record_finished(&mut state, finished).await?;
        }

        Ok(())
    }

    async fn record_finished(
        &self,
        state: &mut PollerState,
        finished: TrackState,
    ) -> Res<()> {
        // The active output device is only fetched on this transition; a
        // failure here degrades to an unknown device rather than losing the
        // play.
        let device = match self.playing.fetch_active_device().await {
            Ok(device) => device,
            Err(e) => {
                warning!("Could not determine active device: {}", e);
                None
            }
        };

        let play = PlayedTrack {
            track_id: finished.track_id,
            track_name: finished.track_name,
            artists: finished.artists,
            duration_ms: finished.duration_ms,
            device_name: device.map(|d| d.name),
            finished_at: finished.finished_at.unwrap_or_else(Utc::now),
        };

        self.history.record_finished_play(play).await?;

        // Persisted; nothing tracked until the next track starts.
        state.current = None;
        Ok(())
    }

    fn enter_active_mode(&self, state: &mut PollerState) {
        if state.active_mode {
            return;
        }
        state.active_mode = true;
        self.interval_secs
            .store(POLL_INTERVAL_ACTIVE_SECS, Ordering::Relaxed);
    }

    fn enter_idle_mode(&self, state: &mut PollerState) {
        if !state.active_mode {
            return;
        }
        state.active_mode = false;
        self.interval_secs
            .store(POLL_INTERVAL_IDLE_SECS, Ordering::Relaxed);
    }
}
