//! Consumer of the outbound channel.

use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::{EventSink, Outbound, OutboundReceiver, OutboundSender, PresenceEvent};
use crate::nebula::{ObserverId, SiteId};
use crate::state::StatusStore;

/// Creates the channel observers push side effects into.
#[must_use]
pub fn outbound_channel() -> (OutboundSender, OutboundReceiver) {
    mpsc::unbounded_channel()
}

/// Applies observer side effects off the poll path.
///
/// Status writes go to the store in arrival order and are never held up by
/// event delivery. Events are forwarded to the sink one at a time on a
/// separate queue; a failed delivery is logged and dropped.
#[derive(Debug)]
pub struct Dispatcher<S, E> {
    store: S,
    sink: E,
}

impl<S, E> Dispatcher<S, E>
where
    S: StatusStore,
    E: EventSink,
{
    /// Creates a dispatcher writing to `store` and emitting to `sink`.
    #[must_use]
    pub const fn new(store: S, sink: E) -> Self {
        Self { store, sink }
    }

    /// Returns the status store.
    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    fn record(&self, site: &SiteId, observer: &ObserverId, disconnected: bool) {
        self.store.set_disconnected(site, observer, disconnected);
    }

    async fn deliver(&self, event: &PresenceEvent) {
        debug!(client = %event.observer, kind = %event.kind, "dispatching presence event");
        if let Err(e) = self.sink.emit(event).await {
            warn!(
                site = %event.site,
                client = %event.observer,
                "Failed to deliver {} event: {e}",
                event.kind
            );
        }
    }

    /// Handles one outbound message, waiting for delivery if it is an event.
    pub async fn handle(&self, message: Outbound) {
        match message {
            Outbound::Status {
                site,
                observer,
                disconnected,
            } => self.record(&site, &observer, disconnected),
            Outbound::Event(event) => self.deliver(&event).await,
        }
    }

    /// Drains `rx` until every sender has been dropped and every queued
    /// event has been delivered.
    ///
    /// Status writes are applied as they arrive while events wait on the
    /// sink. Returns the number of messages received.
    pub async fn run(self, mut rx: OutboundReceiver) -> u64 {
        let this = &self;
        let (events_tx, mut events_rx) = mpsc::unbounded_channel::<PresenceEvent>();

        let intake = async move {
            let mut handled = 0;
            while let Some(message) = rx.recv().await {
                match message {
                    Outbound::Status {
                        site,
                        observer,
                        disconnected,
                    } => this.record(&site, &observer, disconnected),
                    Outbound::Event(event) => {
                        // receiver outlives this sender
                        let _ = events_tx.send(event);
                    }
                }
                handled += 1;
            }
            handled
        };

        let delivery = async move {
            while let Some(event) = events_rx.recv().await {
                this.deliver(&event).await;
            }
        };

        let (handled, ()) = tokio::join!(intake, delivery);
        debug!(handled, "outbound channel closed");
        handled
    }
}
