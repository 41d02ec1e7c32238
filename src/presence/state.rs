//! Edge-triggered connectivity state.

use crate::events::PresenceEventKind;
use crate::nebula::{FetchSnapshot, ObserverId};

/// Last known connectivity of a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// Not observed yet.
    #[default]
    Unknown,
    /// Last seen online.
    Connected,
    /// Last seen offline or absent from the roster.
    Disconnected,
}

impl ConnectionState {
    /// Converts a `disconnected` flag into a known state.
    #[must_use]
    pub const fn from_disconnected(disconnected: bool) -> Self {
        if disconnected {
            Self::Disconnected
        } else {
            Self::Connected
        }
    }

    /// Returns the `disconnected` flag, or `None` when unknown.
    #[must_use]
    pub const fn disconnected(self) -> Option<bool> {
        match self {
            Self::Unknown => None,
            Self::Connected => Some(false),
            Self::Disconnected => Some(true),
        }
    }
}

/// Tracks one client's previous state and detects transitions.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClientState {
    previous: ConnectionState,
}

impl ClientState {
    /// Creates a state with no prior observation.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            previous: ConnectionState::Unknown,
        }
    }

    /// Returns the stored state.
    #[must_use]
    pub const fn previous(&self) -> ConnectionState {
        self.previous
    }

    /// Records a new observation and returns the transition it caused.
    ///
    /// The first observation only initializes the state. Afterwards an
    /// event is returned exactly when the flag flips.
    pub fn observe(&mut self, disconnected: bool) -> Option<PresenceEventKind> {
        let current = ConnectionState::from_disconnected(disconnected);
        let transition = match self.previous {
            ConnectionState::Unknown => None,
            previous if previous == current => None,
            _ => Some(PresenceEventKind::entering(disconnected)),
        };
        self.previous = current;
        transition
    }
}

/// Resolves whether `key` is disconnected according to `snapshot`.
///
/// A key absent from the roster is disconnected. Otherwise the first
/// matching record decides: anything but the online status is disconnected.
#[must_use]
pub fn resolve_disconnected(snapshot: &FetchSnapshot, key: &ObserverId) -> bool {
    snapshot.find(key).is_none_or(|record| !record.is_online())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nebula::ClientRecord;
    use std::time::SystemTime;

    fn snapshot(records: Vec<ClientRecord>) -> FetchSnapshot {
        FetchSnapshot::new(records, SystemTime::UNIX_EPOCH)
    }

    mod observe {
        use super::*;

        #[test]
        fn first_observation_never_emits() {
            let mut connected = ClientState::new();
            let mut disconnected = ClientState::new();

            assert_eq!(connected.observe(false), None);
            assert_eq!(disconnected.observe(true), None);
            assert_eq!(connected.previous(), ConnectionState::Connected);
            assert_eq!(disconnected.previous(), ConnectionState::Disconnected);
        }

        #[test]
        fn steady_state_emits_nothing() {
            let mut state = ClientState::new();
            state.observe(false);

            assert_eq!(state.observe(false), None);
            assert_eq!(state.observe(false), None);
        }

        #[test]
        fn flip_sequence_emits_once_per_edge() {
            let mut state = ClientState::new();
            let emitted: Vec<_> = [false, true, true, false]
                .into_iter()
                .filter_map(|d| state.observe(d))
                .collect();

            assert_eq!(
                emitted,
                vec![
                    PresenceEventKind::Disconnected,
                    PresenceEventKind::Reconnected
                ]
            );
        }
    }

    mod resolve {
        use super::*;

        #[test]
        fn absent_key_is_disconnected() {
            let roster = snapshot(vec![ClientRecord::online("bb")]);

            assert!(resolve_disconnected(&roster, &ObserverId::from("aa")));
        }

        #[test]
        fn empty_roster_is_disconnected() {
            assert!(resolve_disconnected(
                &snapshot(vec![]),
                &ObserverId::from("aa")
            ));
        }

        #[test]
        fn online_record_is_connected() {
            let roster = snapshot(vec![ClientRecord::online("aa")]);

            assert!(!resolve_disconnected(&roster, &ObserverId::from("aa")));
        }

        #[test]
        fn non_online_status_is_disconnected() {
            let roster = snapshot(vec![ClientRecord::new("aa", "OFFLINE")]);

            assert!(resolve_disconnected(&roster, &ObserverId::from("aa")));
        }

        #[test]
        fn first_duplicate_decides() {
            let roster = snapshot(vec![
                ClientRecord::online("aa"),
                ClientRecord::new("aa", "OFFLINE"),
            ]);

            assert!(!resolve_disconnected(&roster, &ObserverId::from("aa")));
        }
    }
}
