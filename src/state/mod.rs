//! Externally visible connectivity state of observed clients.
//!
//! Every poll cycle writes each observer's `disconnected` flag here, even
//! when it did not change, so readers can use the write as a heartbeat.
//! Flags are keyed by site and client, so one MAC watched at two sites
//! keeps two flags.

mod memory;

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;

pub use memory::MemoryStatusStore;

use crate::nebula::{ObserverId, SiteId};

/// Destination for per-client connectivity flags.
///
/// Implementations must be cheap to call from the dispatcher task; anything
/// slow should be buffered internally.
pub trait StatusStore: Send + Sync {
    /// Records the latest flag for `observer` at `site`.
    fn set_disconnected(&self, site: &SiteId, observer: &ObserverId, disconnected: bool);

    /// Returns the last recorded flag, or `None` if never written.
    fn is_disconnected(&self, site: &SiteId, observer: &ObserverId) -> Option<bool>;

    /// Returns whether `observer` is connected, or `None` if never written.
    fn is_connected(&self, site: &SiteId, observer: &ObserverId) -> Option<bool> {
        self.is_disconnected(site, observer)
            .map(|disconnected| !disconnected)
    }
}

impl<T: StatusStore> StatusStore for std::sync::Arc<T> {
    fn set_disconnected(&self, site: &SiteId, observer: &ObserverId, disconnected: bool) {
        (**self).set_disconnected(site, observer, disconnected);
    }

    fn is_disconnected(&self, site: &SiteId, observer: &ObserverId) -> Option<bool> {
        (**self).is_disconnected(site, observer)
    }
}
