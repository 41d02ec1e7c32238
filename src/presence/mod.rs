//! Per-client connectivity tracking.
//!
//! This module provides:
//! - Transition logic ([`ClientState`], [`ConnectionState`])
//! - Roster lookup ([`resolve_disconnected`])
//! - The observer abstraction ([`Observer`]) and its client implementation ([`ClientObserver`])

mod observer;
mod state;


pub use observer::{ClientObserver, Observer};
pub use state::{ClientState, ConnectionState, resolve_disconnected};
