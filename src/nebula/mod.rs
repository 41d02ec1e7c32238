//! Remote client-roster source.
//!
//! This module provides:
//! - Identifiers and roster types ([`SiteId`], [`ObserverId`], [`ClientRecord`], [`FetchSnapshot`])
//! - The fetch abstraction ([`ClientFetcher`]) and its errors ([`FetchError`], [`AuthError`])
//! - The Nebula cloud API implementation ([`NebulaFetcher`])

mod api;
mod fetcher;
mod roster;

#[cfg(test)]
mod api_tests;

pub use api::{API_KEY_HEADER, DEFAULT_API_URL, DEFAULT_PERIOD, NebulaFetcher, REQUESTED_FEATURES};
pub use fetcher::{AuthError, ClientFetcher, FetchError};
pub use roster::{ClientRecord, FetchSnapshot, ONLINE_STATUS, ObserverId, SiteId};
