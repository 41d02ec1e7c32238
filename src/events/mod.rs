//! Presence events and their delivery.
//!
//! Observers never perform side effects inline. They push [`Outbound`]
//! messages onto a channel; the [`Dispatcher`] drains it on its own task,
//! writing status flags to a [`crate::state::StatusStore`] and forwarding
//! transition events to an [`EventSink`].

mod dispatcher;
mod event;
mod sink;


pub use dispatcher::{Dispatcher, outbound_channel};
pub use event::{Outbound, OutboundReceiver, OutboundSender, PresenceEvent, PresenceEventKind};
pub use sink::{EventSink, LogSink};
