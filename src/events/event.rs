//! Presence event types.

use std::fmt;
use std::time::SystemTime;

use tokio::sync::mpsc;

use crate::nebula::{ObserverId, SiteId};

/// Direction of a connectivity transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PresenceEventKind {
    /// The client went from connected to disconnected.
    Disconnected,
    /// The client went from disconnected to connected.
    Reconnected,
}

impl PresenceEventKind {
    /// Returns the kind for a transition into `disconnected`.
    #[must_use]
    pub const fn entering(disconnected: bool) -> Self {
        if disconnected {
            Self::Disconnected
        } else {
            Self::Reconnected
        }
    }

    /// Stable lowercase name used in logs and webhook bodies.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Reconnected => "reconnected",
        }
    }
}

impl fmt::Display for PresenceEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single edge-triggered connectivity event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresenceEvent {
    /// Site the client belongs to.
    pub site: SiteId,
    /// Client that changed state.
    pub observer: ObserverId,
    /// Direction of the change.
    pub kind: PresenceEventKind,
    /// Time of the fetch that revealed the change.
    pub timestamp: SystemTime,
}

impl PresenceEvent {
    /// Creates a presence event.
    #[must_use]
    pub const fn new(
        site: SiteId,
        observer: ObserverId,
        kind: PresenceEventKind,
        timestamp: SystemTime,
    ) -> Self {
        Self {
            site,
            observer,
            kind,
            timestamp,
        }
    }
}

/// Side effect requested by an observer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// Persist the current flag (sent every cycle).
    Status {
        /// Site the client belongs to.
        site: SiteId,
        /// Client the flag belongs to.
        observer: ObserverId,
        /// Whether the client is disconnected.
        disconnected: bool,
    },
    /// Deliver a transition event.
    Event(PresenceEvent),
}

/// Sending half of the outbound channel.
pub type OutboundSender = mpsc::UnboundedSender<Outbound>;

/// Receiving half of the outbound channel.
pub type OutboundReceiver = mpsc::UnboundedReceiver<Outbound>;
