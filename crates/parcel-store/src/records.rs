use chrono::{DateTime, Utc};
use parcel_types::{ContentHash, Object, ObjectHeader, RootHashKey};
use serde::{Deserialize, Serialize};

/// A stored header together with the root key that currently owns it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderRecord {
    pub owner: RootHashKey,
    /// Timestamp of the root hash the header was fetched for.
    pub timestamp: DateTime<Utc>,
    pub header: ObjectHeader,
}

/// A stored object and the header it was fetched through.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectRecord {
    pub owner_header: ContentHash,
    pub object: Object,
}

/// A local application that wants parcel notifications.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppRegistration {
    pub id: u64,
    pub address: String,
    pub name: String,
}

/// What a garbage-collection pass deleted.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GcReport {
    pub headers_removed: usize,
    pub objects_removed: usize,
    pub root_removed: bool,
}
