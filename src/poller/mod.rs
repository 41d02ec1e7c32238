//! Shared-fetch polling.
//!
//! This module provides:
//! - [`PollRegistry`]: one poller per site, created and dropped with its observers
//! - [`SitePoller`]: periodic roster fetch fanned out to a site's observers
//! - [`Scheduler`]: timer capability, with [`TokioScheduler`] and [`ManualScheduler`]

mod registry;
mod scheduler;
mod site;

#[cfg(test)]
mod site_tests;
#[cfg(test)]
mod test_fixtures;

use std::time::Duration;

pub use registry::{PollRegistry, RegistrationError};
pub use scheduler::{ManualScheduler, Scheduler, TaskFuture, TickFn, TimerHandle, TokioScheduler};
pub use site::{SitePoller, TickOutcome};

/// Interval between roster fetches unless configured otherwise.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);
