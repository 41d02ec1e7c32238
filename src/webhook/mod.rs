//! Webhook delivery of presence events.
//!
//! This module provides:
//! - [`HttpWebhook`]: an [`EventSink`](crate::events::EventSink) posting each event over HTTP
//! - [`RetryPolicy`]: exponential backoff between delivery attempts
//! - [`WebhookError`] and [`RetryableError`]: delivery failures

mod error;
mod retry;
mod sender;


pub use error::{RetryableError, WebhookError};
pub use retry::RetryPolicy;
pub use sender::{HttpWebhook, IsRetryable};
