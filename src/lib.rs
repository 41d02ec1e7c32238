//! nebula-presence: client presence monitoring for Zyxel Nebula sites
//!
//! Polls the client roster of each monitored site on a fixed interval,
//! shares one fetch among every client watched at that site, and emits an
//! event whenever a client goes from connected to disconnected or back.

pub mod config;
pub mod events;
pub mod nebula;
pub mod poller;
pub mod presence;
pub mod state;
pub mod time;
pub mod transport;
pub mod webhook;
