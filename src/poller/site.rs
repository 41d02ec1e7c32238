//! Per-site poller: one timer, one in-flight fetch, fan-out to observers.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use tracing::{debug, error, info, warn};

use super::{Scheduler, TimerHandle};
use crate::nebula::{ClientFetcher, FetchSnapshot, ObserverId, SiteId};
use crate::presence::Observer;
use crate::time::Clock;

/// What one call to [`SitePoller::tick`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// No observers are registered, so nothing was fetched.
    Idle,
    /// A previous fetch is still in flight; this tick was skipped.
    Busy,
    /// The fetch failed; observers and the cached roster are untouched.
    Failed,
    /// The poller was torn down while the fetch was in flight.
    Discarded,
    /// The roster was cached and applied to this many observers.
    Applied(usize),
}

#[derive(Default)]
struct PollerState {
    observers: HashMap<ObserverId, Arc<dyn Observer>>,
    last_fetch: Option<Arc<FetchSnapshot>>,
}

/// Clears the busy flag when a fetch ends, whatever the outcome.
struct BusyGuard<'a>(&'a AtomicBool);

impl<'a> BusyGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Polls the client roster of one site and fans each result out to the
/// site's observers.
///
/// At most one fetch is in flight at a time. The most recent successful
/// roster is cached so observers that join later are brought up to date
/// without waiting for the next tick.
pub struct SitePoller<F> {
    site: SiteId,
    fetcher: Arc<F>,
    scheduler: Arc<dyn Scheduler>,
    clock: Arc<dyn Clock>,
    interval: Duration,
    state: Mutex<PollerState>,
    timer: Mutex<Option<TimerHandle>>,
    busy: AtomicBool,
    retired: AtomicBool,
}

impl<F> std::fmt::Debug for SitePoller<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SitePoller")
            .field("site", &self.site)
            .field("interval", &self.interval)
            .field("observers", &self.observer_count())
            .field("polling", &self.is_polling())
            .finish_non_exhaustive()
    }
}

impl<F> SitePoller<F> {
    /// Creates a stopped poller for `site`.
    #[must_use]
    pub fn new(
        site: SiteId,
        fetcher: Arc<F>,
        scheduler: Arc<dyn Scheduler>,
        clock: Arc<dyn Clock>,
        interval: Duration,
    ) -> Self {
        Self {
            site,
            fetcher,
            scheduler,
            clock,
            interval,
            state: Mutex::new(PollerState::default()),
            timer: Mutex::new(None),
            busy: AtomicBool::new(false),
            retired: AtomicBool::new(false),
        }
    }

    /// Returns the site this poller fetches.
    #[must_use]
    pub const fn site(&self) -> &SiteId {
        &self.site
    }

    /// Returns the tick interval.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    fn lock_state(&self) -> MutexGuard<'_, PollerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_timer(&self) -> MutexGuard<'_, Option<TimerHandle>> {
        self.timer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Adds or replaces the observer under `key`.
    ///
    /// If a roster is already cached it is applied to the observer before
    /// this returns. Returns the number of observers afterwards.
    pub fn add_observer(&self, key: ObserverId, observer: Arc<dyn Observer>) -> usize {
        let mut state = self.lock_state();
        if let Some(snapshot) = &state.last_fetch {
            debug!(site = %self.site, client = %key, "applying cached roster to new observer");
            observer.apply_fetch_result(snapshot);
        }
        state.observers.insert(key, observer);
        state.observers.len()
    }

    /// Removes the observer under `key`, if present.
    ///
    /// Returns the number of observers afterwards.
    pub fn remove_observer(&self, key: &ObserverId) -> usize {
        let mut state = self.lock_state();
        if state.observers.remove(key).is_none() {
            debug!(site = %self.site, client = %key, "observer not registered");
        }
        state.observers.len()
    }

    /// Number of registered observers.
    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.lock_state().observers.len()
    }

    /// Returns true if an observer is registered under `key`.
    #[must_use]
    pub fn has_observer(&self, key: &ObserverId) -> bool {
        self.lock_state().observers.contains_key(key)
    }

    /// Returns the cached roster from the last successful fetch.
    #[must_use]
    pub fn last_fetch(&self) -> Option<Arc<FetchSnapshot>> {
        self.lock_state().last_fetch.clone()
    }

    /// Returns true while the repeating timer is armed.
    #[must_use]
    pub fn is_polling(&self) -> bool {
        self.lock_timer().is_some()
    }

    /// Returns true once the poller has been torn down.
    #[must_use]
    pub fn is_retired(&self) -> bool {
        self.retired.load(Ordering::Acquire)
    }

    /// Stops the poller for good.
    ///
    /// A fetch still in flight completes, but its result is discarded.
    pub fn retire(&self) {
        {
            let _state = self.lock_state();
            self.retired.store(true, Ordering::Release);
        }
        self.stop();
    }

    /// Cancels the timer. A fetch already in flight is not interrupted.
    pub fn stop(&self) {
        if let Some(mut timer) = self.lock_timer().take() {
            timer.cancel();
            info!(site = %self.site, "Stopped site poller");
        }
    }
}

impl<F: ClientFetcher> SitePoller<F> {
    /// Starts polling: one immediate fetch, then one per interval.
    ///
    /// No-op if already started or retired.
    pub fn start(self: &Arc<Self>) {
        let mut timer = self.lock_timer();
        if timer.is_some() || self.is_retired() {
            return;
        }

        info!(site = %self.site, interval = ?self.interval, "Starting site poller");

        let poller = Arc::clone(self);
        self.scheduler.spawn(Box::pin(async move {
            poller.tick().await;
        }));

        let weak: Weak<Self> = Arc::downgrade(self);
        *timer = Some(self.scheduler.schedule_repeating(
            self.interval,
            Arc::new(move || {
                let weak = weak.clone();
                Box::pin(async move {
                    if let Some(poller) = weak.upgrade() {
                        poller.tick().await;
                    }
                })
            }),
        ));
    }

    /// Runs one poll cycle.
    ///
    /// Skipped when no observers are registered or a fetch is already in
    /// flight. A failed fetch leaves observers and the cached roster as
    /// they were.
    pub async fn tick(&self) -> TickOutcome {
        if self.is_retired() || self.observer_count() == 0 {
            return TickOutcome::Idle;
        }

        let Some(_busy) = BusyGuard::acquire(&self.busy) else {
            debug!(site = %self.site, "Previous fetch still in flight, skipping tick");
            return TickOutcome::Busy;
        };

        let records = match self.fetcher.fetch_clients(&self.site).await {
            Ok(records) => records,
            Err(e) if e.is_auth() => {
                error!(site = %self.site, error = %e, "Client fetch not authorized");
                return TickOutcome::Failed;
            }
            Err(e) => {
                warn!(site = %self.site, error = %e, "Client fetch failed");
                return TickOutcome::Failed;
            }
        };

        let mut state = self.lock_state();
        // retire() flips the flag under this lock
        if self.is_retired() {
            debug!(site = %self.site, "Poller stopped during fetch, discarding result");
            return TickOutcome::Discarded;
        }

        let snapshot = Arc::new(FetchSnapshot::new(records, self.clock.now()));
        state.last_fetch = Some(Arc::clone(&snapshot));
        for (key, observer) in &state.observers {
            if snapshot.find(key).is_none() {
                debug!(site = %self.site, client = %key, "Client not found in roster");
            }
            observer.apply_fetch_result(&snapshot);
        }
        let applied = state.observers.len();
        drop(state);

        debug!(site = %self.site, clients = snapshot.len(), observers = applied, "Applied roster");
        TickOutcome::Applied(applied)
    }
}
