//! Site-keyed registry of pollers.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info};

use super::{DEFAULT_POLL_INTERVAL, Scheduler, SitePoller};
use crate::nebula::{ClientFetcher, ObserverId, SiteId};
use crate::presence::Observer;
use crate::time::{Clock, SystemClock};

/// Invalid registration request.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistrationError {
    /// The site identifier is empty.
    #[error("Site id must not be empty")]
    MissingSiteId,

    /// The observer key is empty.
    #[error("Client id must not be empty (site {site})")]
    MissingObserverId {
        /// Site the registration was for.
        site: SiteId,
    },
}

/// Registry of site pollers.
///
/// Holds exactly one [`SitePoller`] per site with at least one registered
/// observer. The first registration for a site creates and starts its
/// poller; removing the last observer stops and drops it.
pub struct PollRegistry<F> {
    fetcher: Arc<F>,
    scheduler: Arc<dyn Scheduler>,
    clock: Arc<dyn Clock>,
    interval: Duration,
    pollers: Mutex<HashMap<SiteId, Arc<SitePoller<F>>>>,
}

impl<F> std::fmt::Debug for PollRegistry<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PollRegistry")
            .field("interval", &self.interval)
            .finish_non_exhaustive()
    }
}

impl<F: ClientFetcher> PollRegistry<F> {
    /// Creates an empty registry polling every [`DEFAULT_POLL_INTERVAL`].
    #[must_use]
    pub fn new(fetcher: F, scheduler: Arc<dyn Scheduler>) -> Self {
        Self {
            fetcher: Arc::new(fetcher),
            scheduler,
            clock: Arc::new(SystemClock),
            interval: DEFAULT_POLL_INTERVAL,
            pollers: Mutex::new(HashMap::new()),
        }
    }

    /// Sets the poll interval for pollers created from now on.
    #[must_use]
    pub const fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Sets the clock used to timestamp fetched rosters.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Returns the poll interval.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    fn lock_pollers(&self) -> MutexGuard<'_, HashMap<SiteId, Arc<SitePoller<F>>>> {
        self.pollers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers `observer` under `key` for `site`.
    ///
    /// Starts polling the site if this is its first observer. If the site
    /// already has a cached roster, the observer is updated from it before
    /// this returns. Re-registering an existing key replaces the observer.
    ///
    /// # Errors
    ///
    /// Returns [`RegistrationError`] if `site` or `key` is blank. Nothing is
    /// registered in that case.
    pub fn register(
        &self,
        site: SiteId,
        key: ObserverId,
        observer: Arc<dyn Observer>,
    ) -> Result<(), RegistrationError> {
        if site.is_blank() {
            return Err(RegistrationError::MissingSiteId);
        }
        if key.is_blank() {
            return Err(RegistrationError::MissingObserverId { site });
        }

        let mut pollers = self.lock_pollers();
        let poller = pollers.entry(site.clone()).or_insert_with(|| {
            info!(site = %site, "Creating site poller");
            Arc::new(SitePoller::new(
                site.clone(),
                Arc::clone(&self.fetcher),
                Arc::clone(&self.scheduler),
                Arc::clone(&self.clock),
                self.interval,
            ))
        });

        let observers = poller.add_observer(key.clone(), observer);
        poller.start();
        let sites = pollers.len();
        drop(pollers);

        debug!(site = %site, client = %key, observers, sites, "Registered observer");
        Ok(())
    }

    /// Removes the observer under `key` from `site`.
    ///
    /// Unknown sites and keys are ignored. Removing the last observer of a
    /// site stops its poller; a fetch still in flight for it is discarded.
    pub fn unregister(&self, site: &SiteId, key: &ObserverId) {
        let mut pollers = self.lock_pollers();
        let Some(poller) = pollers.get(site) else {
            debug!(site = %site, client = %key, "Unregister for unknown site ignored");
            return;
        };

        let remaining = poller.remove_observer(key);
        if remaining == 0 {
            if let Some(poller) = pollers.remove(site) {
                poller.retire();
            }
            info!(site = %site, "Last observer removed, site poller dropped");
        }
        let sites = pollers.len();
        drop(pollers);

        debug!(site = %site, client = %key, remaining, sites, "Unregistered observer");
    }

    /// Stops and drops every poller.
    ///
    /// Returns the number of sites that were being polled.
    pub fn shutdown(&self) -> usize {
        let pollers: Vec<_> = self.lock_pollers().drain().map(|(_, p)| p).collect();
        for poller in &pollers {
            poller.retire();
        }
        info!(sites = pollers.len(), "Poll registry shut down");
        pollers.len()
    }

    /// Returns true if `site` has a poller.
    #[must_use]
    pub fn contains_site(&self, site: &SiteId) -> bool {
        self.lock_pollers().contains_key(site)
    }

    /// Number of sites being polled.
    #[must_use]
    pub fn site_count(&self) -> usize {
        self.lock_pollers().len()
    }

    /// Number of observers registered for `site`. Zero for unknown sites.
    #[must_use]
    pub fn observer_count(&self, site: &SiteId) -> usize {
        self.lock_pollers()
            .get(site)
            .map_or(0, |poller| poller.observer_count())
    }

    /// Returns the poller for `site`, if any.
    #[must_use]
    pub fn poller(&self, site: &SiteId) -> Option<Arc<SitePoller<F>>> {
        self.lock_pollers().get(site).cloned()
    }
}
