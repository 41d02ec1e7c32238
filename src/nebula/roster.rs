//! Identifiers and roster types produced by one client-list fetch.

use std::fmt;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

/// Status value that marks a client as online in the site roster.
pub const ONLINE_STATUS: &str = "ONLINE";

/// Opaque identifier of a polled site.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SiteId(String);

impl SiteId {
    /// Creates a site identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if the identifier is empty or whitespace only.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for SiteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SiteId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Opaque identifier of one polled client within a site (its MAC address).
///
/// Matching against roster records is exact; no case folding or separator
/// normalization is applied.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObserverId(String);

impl ObserverId {
    /// Creates an observer identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if the identifier is empty or whitespace only.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for ObserverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ObserverId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// One entry of a site's client roster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientRecord {
    /// Key of the client this record describes.
    pub key: ObserverId,
    /// Raw status value reported by the remote API.
    pub status: String,
}

impl ClientRecord {
    /// Creates a roster record.
    #[must_use]
    pub fn new(key: impl Into<String>, status: impl Into<String>) -> Self {
        Self {
            key: ObserverId::new(key),
            status: status.into(),
        }
    }

    /// Creates a record with the online status.
    #[must_use]
    pub fn online(key: impl Into<String>) -> Self {
        Self::new(key, ONLINE_STATUS)
    }

    /// Returns true if the status equals [`ONLINE_STATUS`].
    #[must_use]
    pub fn is_online(&self) -> bool {
        self.status == ONLINE_STATUS
    }
}

/// Full roster returned by one successful fetch.
///
/// Immutable once produced. Record order is the order the remote API
/// returned them in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchSnapshot {
    records: Vec<ClientRecord>,
    fetched_at: SystemTime,
}

impl FetchSnapshot {
    /// Creates a snapshot from roster records.
    #[must_use]
    pub const fn new(records: Vec<ClientRecord>, fetched_at: SystemTime) -> Self {
        Self {
            records,
            fetched_at,
        }
    }

    /// Returns the roster records in fetch order.
    #[must_use]
    pub fn records(&self) -> &[ClientRecord] {
        &self.records
    }

    /// Returns when the fetch completed.
    #[must_use]
    pub const fn fetched_at(&self) -> SystemTime {
        self.fetched_at
    }

    /// Finds the record for `key`.
    ///
    /// When several records share a key, the first one wins.
    #[must_use]
    pub fn find(&self, key: &ObserverId) -> Option<&ClientRecord> {
        self.records.iter().find(|record| &record.key == key)
    }

    /// Number of records in the roster.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if the roster is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
