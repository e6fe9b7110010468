//! Generic periodic-task scheduler.
//!
//! A task is plain data: a name, an async action, a rate policy, an initial
//! delay and a delay provider. The scheduler runs each submitted task on its
//! own tokio task, so iterations of a single task never overlap with
//! themselves while independent tasks run concurrently.
//!
//! The delay provider is re-read after every iteration, before the next
//! scheduling decision, so a task that changes its own interval (the playback
//! tracker switching between active and idle polling) sees the new interval
//! take effect on the next run rather than retroactively.

use std::time::Duration;

use tokio::{
    task::JoinHandle,
    time::{self, Instant},
};

use crate::{BoxFuture, Res, warning};

/// How the next iteration of a task is scheduled.
///
/// `FixedRate` schedules iteration k at `initial_delay + k * period`,
/// measured from the previous run's start; `FixedDelay` schedules it `period`
/// after the previous run's completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RatePolicy {
    FixedRate,
    FixedDelay,
}

/// The effect a task performs each iteration.
pub type TaskAction = Box<dyn Fn() -> BoxFuture<Res<()>> + Send + Sync>;

/// Supplies the current inter-iteration interval.
pub type DelayProvider = Box<dyn Fn() -> Duration + Send + Sync>;

/// A self-contained description of a periodic task.
pub struct TaskSpec {
    pub name: String,
    pub action: TaskAction,
    pub policy: RatePolicy,
    pub initial_delay: Duration,
    pub delay: DelayProvider,
}

/// Opaque handle to one submitted task, usable with [`Scheduler::cancel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskId(usize);

/// Runs a set of independent [`TaskSpec`]s on timed, concurrent cadences.
///
/// Tasks are submitted before `start`; `stop` cancels all pending and
/// in-flight schedules on a best-effort basis (an iteration already past its
/// last await point may complete before observing cancellation). Individual
/// tasks can be cancelled by the handle `submit` returned.
pub struct Scheduler {
    pending: Vec<Option<TaskSpec>>,
    running: Vec<Option<JoinHandle<()>>>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            pending: Vec::new(),
            running: Vec::new(),
        }
    }

    /// Registers a task to be driven once the scheduler starts and returns
    /// the handle it can later be cancelled by.
    pub fn submit(&mut self, spec: TaskSpec) -> TaskId {
        self.pending.push(Some(spec));
        TaskId(self.running.len() + self.pending.len() - 1)
    }

    /// Spawns one driver loop per submitted task.
    pub fn start(&mut self) {
        for spec in self.pending.drain(..) {
            self.running.push(spec.map(|spec| tokio::spawn(drive(spec))));
        }
    }

    /// Cancels a single task, whether or not its loop has started yet.
    /// Cancelling twice is a no-op.
    pub fn cancel(&mut self, id: TaskId) {
        match self.running.get_mut(id.0) {
            Some(slot) => {
                if let Some(handle) = slot.take() {
                    handle.abort();
                }
            }
            None => {
                let pending_index = id.0 - self.running.len();
                if let Some(slot) = self.pending.get_mut(pending_index) {
                    *slot = None;
                }
            }
        }
    }

    /// Cancels all task loops.
    pub fn stop(&mut self) {
        for handle in self.running.drain(..).flatten() {
            handle.abort();
        }
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn drive(spec: TaskSpec) {
    time::sleep(spec.initial_delay).await;

    match spec.policy {
        RatePolicy::FixedRate => {
            let mut target = Instant::now();
            loop {
                run_once(&spec).await;
                target += (spec.delay)();
                let now = Instant::now();
                if target < now {
                    // Overran the period: fire as soon as possible, but do
                    // not queue a burst of catch-up iterations.
                    target = now;
                }
                time::sleep_until(target).await;
            }
        }
        RatePolicy::FixedDelay => loop {
            run_once(&spec).await;
            time::sleep((spec.delay)()).await;
        },
    }
}

/// A failing iteration is logged and swallowed; it never cancels future
/// iterations of this task or any other task.
async fn run_once(spec: &TaskSpec) {
    if let Err(e) = (spec.action)().await {
        warning!("Task {name} failed: {e}", name = spec.name);
    }
}
