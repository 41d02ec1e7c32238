//! Timer abstraction driving site pollers.
//!
//! [`TokioScheduler`] runs real tokio timers; [`ManualScheduler`] lets tests
//! fire ticks deterministically without waiting for wall-clock time.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::AbortHandle;
use tokio::time::{Instant, MissedTickBehavior};

/// A boxed unit of background work.
pub type TaskFuture = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Produces the work for one timer tick.
pub type TickFn = Arc<dyn Fn() -> TaskFuture + Send + Sync>;

/// Capability to run background work and repeating timers.
pub trait Scheduler: Send + Sync {
    /// Runs `task` in the background.
    fn spawn(&self, task: TaskFuture);

    /// Calls `tick` every `interval`, first one interval from now.
    ///
    /// Each tick's work is started without waiting for the previous one to
    /// finish. The timer runs until the returned handle is cancelled or
    /// dropped.
    fn schedule_repeating(&self, interval: Duration, tick: TickFn) -> TimerHandle;
}

/// Cancellation handle for a repeating timer.
///
/// Dropping the handle cancels the timer.
#[derive(Debug)]
pub struct TimerHandle {
    cancelled: Arc<AtomicBool>,
    task: Option<AbortHandle>,
}

impl TimerHandle {
    /// Creates a handle that flips `cancelled` when cancelled.
    #[must_use]
    pub const fn new(cancelled: Arc<AtomicBool>) -> Self {
        Self {
            cancelled,
            task: None,
        }
    }

    /// Also aborts `task` on cancellation.
    #[must_use]
    pub fn with_task(mut self, task: AbortHandle) -> Self {
        self.task = Some(task);
        self
    }

    /// Stops the timer. Ticks already started keep running.
    pub fn cancel(&mut self) {
        self.cancelled.store(true, Ordering::SeqCst);
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    /// Returns true once cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Scheduler backed by the tokio runtime.
#[derive(Debug, Clone)]
pub struct TokioScheduler {
    handle: Handle,
}

impl TokioScheduler {
    /// Creates a scheduler spawning onto `handle`.
    #[must_use]
    pub const fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Creates a scheduler for the runtime the caller is running on.
    ///
    /// Returns `None` outside a tokio runtime.
    #[must_use]
    pub fn current() -> Option<Self> {
        Handle::try_current().ok().map(Self::new)
    }
}

impl Scheduler for TokioScheduler {
    fn spawn(&self, task: TaskFuture) {
        self.handle.spawn(task);
    }

    fn schedule_repeating(&self, interval: Duration, tick: TickFn) -> TimerHandle {
        let cancelled = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&cancelled);
        let spawner = self.handle.clone();

        let task = self.handle.spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if flag.load(Ordering::SeqCst) {
                    break;
                }
                spawner.spawn(tick());
            }
        });

        TimerHandle::new(cancelled).with_task(task.abort_handle())
    }
}

struct ManualTimer {
    interval: Duration,
    tick: TickFn,
    cancelled: Arc<AtomicBool>,
}

/// Scheduler whose work only runs when the caller asks.
///
/// `spawn` queues tasks until [`ManualScheduler::run_spawned`];
/// [`ManualScheduler::fire`] runs one tick of every live timer to completion.
#[derive(Default)]
pub struct ManualScheduler {
    spawned: Mutex<Vec<TaskFuture>>,
    timers: Mutex<Vec<ManualTimer>>,
}

impl std::fmt::Debug for ManualScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManualScheduler")
            .field("pending_tasks", &self.pending_tasks())
            .field("active_timers", &self.active_timers())
            .finish()
    }
}

impl ManualScheduler {
    /// Creates a scheduler with no work queued.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_spawned(&self) -> MutexGuard<'_, Vec<TaskFuture>> {
        self.spawned.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_timers(&self) -> MutexGuard<'_, Vec<ManualTimer>> {
        self.timers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs every queued task to completion, in spawn order.
    ///
    /// Returns the number of tasks run.
    pub async fn run_spawned(&self) -> usize {
        let tasks = std::mem::take(&mut *self.lock_spawned());
        let count = tasks.len();
        for task in tasks {
            task.await;
        }
        count
    }

    /// Fires one tick of every live timer and waits for each tick's work.
    ///
    /// Returns the number of timers fired.
    pub async fn fire(&self) -> usize {
        let ticks: Vec<TickFn> = self
            .lock_timers()
            .iter()
            .filter(|t| !t.cancelled.load(Ordering::SeqCst))
            .map(|t| Arc::clone(&t.tick))
            .collect();
        let count = ticks.len();
        for tick in ticks {
            tick().await;
        }
        count
    }

    /// Number of tasks waiting in the spawn queue.
    #[must_use]
    pub fn pending_tasks(&self) -> usize {
        self.lock_spawned().len()
    }

    /// Number of timers not yet cancelled.
    #[must_use]
    pub fn active_timers(&self) -> usize {
        self.lock_timers()
            .iter()
            .filter(|t| !t.cancelled.load(Ordering::SeqCst))
            .count()
    }

    /// Number of timers ever scheduled.
    #[must_use]
    pub fn scheduled_timers(&self) -> usize {
        self.lock_timers().len()
    }

    /// Intervals of the live timers.
    #[must_use]
    pub fn active_intervals(&self) -> Vec<Duration> {
        self.lock_timers()
            .iter()
            .filter(|t| !t.cancelled.load(Ordering::SeqCst))
            .map(|t| t.interval)
            .collect()
    }
}

impl Scheduler for ManualScheduler {
    fn spawn(&self, task: TaskFuture) {
        self.lock_spawned().push(task);
    }

    fn schedule_repeating(&self, interval: Duration, tick: TickFn) -> TimerHandle {
        let cancelled = Arc::new(AtomicBool::new(false));
        self.lock_timers().push(ManualTimer {
            interval,
            tick,
            cancelled: Arc::clone(&cancelled),
        });
        TimerHandle::new(cancelled)
    }
}

impl<T: Scheduler + ?Sized> Scheduler for Arc<T> {
    fn spawn(&self, task: TaskFuture) {
        (**self).spawn(task);
    }

    fn schedule_repeating(&self, interval: Duration, tick: TickFn) -> TimerHandle {
        (**self).schedule_repeating(interval, tick)
    }
}
