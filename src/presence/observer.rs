//! Observer abstraction and the client observer.

use std::sync::Mutex;

use tracing::debug;

use super::{ClientState, ConnectionState, resolve_disconnected};
use crate::events::{Outbound, OutboundSender, PresenceEvent};
use crate::nebula::{FetchSnapshot, ObserverId, SiteId};

/// One polled entity registered with a site poller.
///
/// `apply_fetch_result` decides synchronously and must not block; any slow
/// work has to be handed off (see [`ClientObserver`]). It runs while the
/// poller holds its observer set, so it must not call back into the poller
/// or the registry.
pub trait Observer: Send + Sync {
    /// Key used to find this observer's record in a roster.
    fn key(&self) -> &ObserverId;

    /// Updates the observer from a freshly fetched or cached roster.
    fn apply_fetch_result(&self, snapshot: &FetchSnapshot);
}

/// Observer tracking the connectivity of one network client.
///
/// Every applied snapshot queues a status write; a transition also queues a
/// [`PresenceEvent`]. Both go to the outbound channel, so the poll cycle never
/// waits on downstream consumers.
#[derive(Debug)]
pub struct ClientObserver {
    site: SiteId,
    key: ObserverId,
    state: Mutex<ClientState>,
    outbound: OutboundSender,
}

impl ClientObserver {
    /// Creates an observer for `key` at `site`.
    #[must_use]
    pub fn new(site: SiteId, key: ObserverId, outbound: OutboundSender) -> Self {
        Self {
            site,
            key,
            state: Mutex::new(ClientState::new()),
            outbound,
        }
    }

    /// Returns the site this observer belongs to.
    #[must_use]
    pub const fn site(&self) -> &SiteId {
        &self.site
    }

    /// Returns the stored connectivity state.
    #[must_use]
    pub fn connection_state(&self) -> ConnectionState {
        self.lock_state().previous()
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, ClientState> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn send(&self, message: Outbound) {
        // Closed channel means the dispatcher is gone (shutdown).
        if self.outbound.send(message).is_err() {
            debug!(client = %self.key, "outbound channel closed, dropping message");
        }
    }
}

impl Observer for ClientObserver {
    fn key(&self) -> &ObserverId {
        &self.key
    }

    fn apply_fetch_result(&self, snapshot: &FetchSnapshot) {
        let disconnected = resolve_disconnected(snapshot, &self.key);
        if snapshot.find(&self.key).is_none() {
            debug!(site = %self.site, client = %self.key, "client not found in roster");
        }

        let transition = self.lock_state().observe(disconnected);

        self.send(Outbound::Status {
            site: self.site.clone(),
            observer: self.key.clone(),
            disconnected,
        });

        if let Some(kind) = transition {
            debug!(site = %self.site, client = %self.key, %kind, "connectivity changed");
            self.send(Outbound::Event(PresenceEvent::new(
                self.site.clone(),
                self.key.clone(),
                kind,
                snapshot.fetched_at(),
            )));
        }
    }
}
