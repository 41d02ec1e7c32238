//! Event sink trait and the logging sink.

use std::convert::Infallible;
use std::future::Future;

use super::PresenceEvent;

/// Target for presence events (webhook, trigger bus, log).
///
/// Delivery is at most once per transition; the dispatcher does not retry
/// on its own. Implementations that want retries do them internally.
pub trait EventSink: Send + Sync {
    /// Error returned when delivery fails.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Delivers one event.
    ///
    /// # Errors
    ///
    /// Returns [`Self::Error`] if the event could not be delivered.
    fn emit(&self, event: &PresenceEvent) -> impl Future<Output = Result<(), Self::Error>> + Send;
}

/// Sink that only logs events.
///
/// Used in dry-run mode and when no webhook is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl EventSink for LogSink {
    type Error = Infallible;

    async fn emit(&self, event: &PresenceEvent) -> Result<(), Infallible> {
        tracing::info!(
            site = %event.site,
            client = %event.observer,
            "client {}",
            event.kind
        );
        Ok(())
    }
}
