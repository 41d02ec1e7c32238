//! Shared test fixtures for poller tests.

use crate::nebula::{ClientFetcher, ClientRecord, FetchError, FetchSnapshot, ObserverId, SiteId};
use crate::presence::Observer;
use crate::time::Clock;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};
use tokio::sync::Semaphore;

/// Mock clock returning a settable time.
pub struct MockClock {
    secs: AtomicU64,
}

impl MockClock {
    pub fn new(initial_secs: u64) -> Self {
        Self {
            secs: AtomicU64::new(initial_secs),
        }
    }

    pub fn advance(&self, secs: u64) {
        self.secs.fetch_add(secs, Ordering::SeqCst);
    }
}

impl Clock for MockClock {
    fn now(&self) -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(self.secs.load(Ordering::SeqCst))
    }
}

/// Fetcher returning queued results, then empty rosters.
///
/// With a gate, every call waits for one [`MockFetcher::release`] before
/// returning.
pub struct MockFetcher {
    results: Mutex<VecDeque<Result<Vec<ClientRecord>, FetchError>>>,
    sites: Mutex<Vec<SiteId>>,
    calls: AtomicUsize,
    gate: Option<Semaphore>,
}

impl MockFetcher {
    pub fn new(results: Vec<Result<Vec<ClientRecord>, FetchError>>) -> Self {
        Self {
            results: Mutex::new(results.into()),
            sites: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
            gate: None,
        }
    }

    pub fn returning(rosters: Vec<Vec<ClientRecord>>) -> Self {
        Self::new(rosters.into_iter().map(Ok).collect())
    }

    pub fn gated(results: Vec<Result<Vec<ClientRecord>, FetchError>>) -> Self {
        Self {
            gate: Some(Semaphore::new(0)),
            ..Self::new(results)
        }
    }

    pub fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.add_permits(1);
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn sites(&self) -> Vec<SiteId> {
        self.sites.lock().unwrap().clone()
    }

    /// Yields until `n` fetches have started.
    pub async fn wait_for_calls(&self, n: usize) {
        while self.calls() < n {
            tokio::task::yield_now().await;
        }
    }
}

impl ClientFetcher for MockFetcher {
    async fn fetch_clients(&self, site: &SiteId) -> Result<Vec<ClientRecord>, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.sites.lock().unwrap().push(site.clone());
        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }
        self.results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(vec![]))
    }
}

/// Observer recording every roster it is given.
pub struct RecordingObserver {
    key: ObserverId,
    seen: Mutex<Vec<Arc<FetchSnapshot>>>,
}

impl RecordingObserver {
    pub fn new(key: &str) -> Arc<Self> {
        Arc::new(Self {
            key: ObserverId::from(key),
            seen: Mutex::new(Vec::new()),
        })
    }

    pub fn seen(&self) -> Vec<Arc<FetchSnapshot>> {
        self.seen.lock().unwrap().clone()
    }

    pub fn apply_count(&self) -> usize {
        self.seen.lock().unwrap().len()
    }

    /// Online flag of this observer's record in every roster seen.
    pub fn online_history(&self) -> Vec<bool> {
        self.seen()
            .iter()
            .map(|s| s.find(&self.key).is_some_and(ClientRecord::is_online))
            .collect()
    }
}

impl Observer for RecordingObserver {
    fn key(&self) -> &ObserverId {
        &self.key
    }

    fn apply_fetch_result(&self, snapshot: &FetchSnapshot) {
        self.seen.lock().unwrap().push(Arc::new(snapshot.clone()));
    }
}
