//! In-process status store.

use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::nebula::{ObserverId, SiteId};

use super::StatusStore;

/// Status store kept in memory for the lifetime of the process.
///
/// Also counts writes, which lets callers check that polling is alive.
#[derive(Debug, Default)]
pub struct MemoryStatusStore {
    flags: RwLock<HashMap<(SiteId, ObserverId), bool>>,
    writes: AtomicU64,
}

impl MemoryStatusStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of writes since creation.
    #[must_use]
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    /// Returns a copy of all recorded flags.
    #[must_use]
    pub fn snapshot(&self) -> HashMap<(SiteId, ObserverId), bool> {
        self.flags
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

impl StatusStore for MemoryStatusStore {
    fn set_disconnected(&self, site: &SiteId, observer: &ObserverId, disconnected: bool) {
        self.flags
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert((site.clone(), observer.clone()), disconnected);
        self.writes.fetch_add(1, Ordering::SeqCst);
    }

    fn is_disconnected(&self, site: &SiteId, observer: &ObserverId) -> Option<bool> {
        self.flags
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(&(site.clone(), observer.clone()))
            .copied()
    }
}
