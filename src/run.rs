//! Application execution logic.
//!
//! Wires the Nebula fetcher, the poll registry and the event dispatcher
//! together and runs them until a shutdown signal arrives.

use std::sync::Arc;

use thiserror::Error;
use tokio::signal;
use tokio::task::JoinError;

use nebula_presence::config::{ClientTarget, ValidatedConfig, WebhookConfig, defaults};
use nebula_presence::events::{Dispatcher, EventSink, LogSink, OutboundSender, outbound_channel};
use nebula_presence::nebula::{ClientFetcher, NebulaFetcher};
use nebula_presence::poller::{PollRegistry, RegistrationError, TokioScheduler};
use nebula_presence::presence::{ClientObserver, Observer};
use nebula_presence::state::{MemoryStatusStore, StatusStore};
use nebula_presence::transport::ReqwestClient;
use nebula_presence::webhook::{HttpWebhook, RetryPolicy};

#[cfg(test)]
#[path = "run_tests.rs"]
mod tests;

/// Error type for runtime execution failures.
#[derive(Debug, Error)]
pub enum RunError {
    /// Called outside a tokio runtime.
    #[error("No async runtime available")]
    NoRuntime,

    /// A configured client could not be registered.
    #[error("Failed to register client: {0}")]
    Registration(#[from] RegistrationError),

    /// The dispatcher task panicked or was cancelled.
    #[error("Event dispatcher stopped abnormally: {0}")]
    Dispatcher(#[source] JoinError),
}

/// Runs the monitor until Ctrl+C or SIGTERM.
///
/// # Errors
///
/// Returns an error if a client cannot be registered or the dispatcher
/// task fails. Poll failures never end the run.
#[cfg(not(tarpaulin_include))]
pub async fn execute(config: ValidatedConfig) -> Result<(), RunError> {
    match (&config.webhook, config.dry_run) {
        (Some(webhook), false) => {
            let sink = create_webhook(webhook, &config.retry_policy);
            tracing::info!("Delivering events to {} {}", webhook.method, webhook.url);
            monitor(&config, sink).await
        }
        (Some(_), true) => {
            tracing::info!("Dry-run mode enabled - events will be logged but not sent");
            monitor(&config, LogSink).await
        }
        (None, _) => {
            tracing::info!("No webhook configured - events will only be logged");
            monitor(&config, LogSink).await
        }
    }
}

#[cfg(not(tarpaulin_include))]
async fn monitor<E>(config: &ValidatedConfig, sink: E) -> Result<(), RunError>
where
    E: EventSink + 'static,
{
    if config.api_key.is_none() {
        tracing::warn!("No API key configured - every poll will fail until one is set");
    }

    let scheduler = TokioScheduler::current().ok_or(RunError::NoRuntime)?;
    let registry = PollRegistry::new(create_fetcher(config), Arc::new(scheduler))
        .with_interval(config.poll_interval);

    let store = Arc::new(MemoryStatusStore::new());
    let (tx, rx) = outbound_channel();
    let dispatcher = tokio::spawn(Dispatcher::new(Arc::clone(&store), sink).run(rx));

    let observers = register_clients(&registry, &config.clients, &tx)?;
    drop(tx);

    tracing::info!(
        "Monitoring {} client(s) on {} site(s), polling every {}s",
        observers.len(),
        registry.site_count(),
        config.poll_interval.as_secs()
    );

    shutdown_signal().await;
    tracing::info!("Shutdown signal received, stopping...");

    unregister_clients(&registry, &config.clients);
    registry.shutdown();
    // Observers hold the last senders; dropping them lets the dispatcher drain.
    drop(observers);

    let handled = dispatcher.await.map_err(RunError::Dispatcher)?;
    tracing::debug!(handled, "Dispatcher drained");
    log_final_state(store.as_ref(), &config.clients);

    Ok(())
}

/// Builds an HTTP client bounded by [`defaults::request_timeout`].
fn http_client() -> ReqwestClient {
    match ReqwestClient::with_timeout(defaults::request_timeout()) {
        Ok(client) => client,
        Err(e) => {
            tracing::warn!("Failed to build HTTP client with timeout, using defaults: {e}");
            ReqwestClient::new()
        }
    }
}

/// Builds the Nebula roster fetcher from configuration.
fn create_fetcher(config: &ValidatedConfig) -> NebulaFetcher<ReqwestClient> {
    NebulaFetcher::new(
        http_client(),
        config.api_url.clone(),
        config.api_key.clone(),
    )
    .with_period(config.period.clone())
}

/// Builds the HTTP webhook sink from configuration.
fn create_webhook(config: &WebhookConfig, retry: &RetryPolicy) -> HttpWebhook<ReqwestClient> {
    let mut webhook = HttpWebhook::new(http_client(), config.url.clone())
        .with_method(config.method.clone())
        .with_headers(config.headers.clone())
        .with_retry_policy(retry.clone());

    if let Some(template) = &config.body_template {
        webhook = webhook.with_body_template(template);
    }

    webhook
}

/// Registers one [`ClientObserver`] per target.
///
/// # Errors
///
/// Returns the first registration error. Targets registered before it stay
/// registered.
fn register_clients<F: ClientFetcher>(
    registry: &PollRegistry<F>,
    clients: &[ClientTarget],
    outbound: &OutboundSender,
) -> Result<Vec<Arc<ClientObserver>>, RunError> {
    let mut observers = Vec::with_capacity(clients.len());
    for target in clients {
        let observer = Arc::new(ClientObserver::new(
            target.site.clone(),
            target.client.clone(),
            outbound.clone(),
        ));
        registry.register(
            target.site.clone(),
            target.client.clone(),
            Arc::clone(&observer) as Arc<dyn Observer>,
        )?;
        observers.push(observer);
    }
    Ok(observers)
}

/// Unregisters every target. Unknown targets are ignored.
fn unregister_clients<F: ClientFetcher>(registry: &PollRegistry<F>, clients: &[ClientTarget]) {
    for target in clients {
        registry.unregister(&target.site, &target.client);
    }
}

/// Logs the last known connectivity of each target.
fn log_final_state(store: &impl StatusStore, clients: &[ClientTarget]) {
    for target in clients {
        let state = match store.is_connected(&target.site, &target.client) {
            Some(true) => "connected",
            Some(false) => "disconnected",
            None => "unknown",
        };
        tracing::info!("{target}: {state}");
    }
}

/// Returns a future that completes when a shutdown signal is received.
///
/// Excluded from coverage - requires OS signal handling.
#[cfg(not(tarpaulin_include))]
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
