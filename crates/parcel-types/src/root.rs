use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::hash::ContentHash;
use crate::publisher::{ParcelSignature, PublisherId};

/// Separator between the publisher and sequence segments of a key.
pub const KEY_SEPARATOR: char = '_';

/// Signed announcement of one parcel version.
///
/// Only this small record travels through the tracker's notification path.
/// Subscribers resolve the tree behind `object_header_hash` themselves.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RootHash {
    pub publisher: PublisherId,
    pub signature: ParcelSignature,
    pub sequence: u64,
    pub timestamp: DateTime<Utc>,
    pub object_header_hash: ContentHash,
}

impl RootHash {
    /// Storage key identifying this version.
    pub fn key(&self) -> RootHashKey {
        RootHashKey::new(&self.publisher, self.sequence)
    }
}

/// Key of a root hash: `"{publisher_hex}_{sequence}"`.
///
/// Header ownership is recorded against this key, and garbage collection
/// scopes itself to one publisher by scanning for [`publisher_prefix`]. The
/// separator is part of the prefix, so two publishers never share one.
///
/// [`publisher_prefix`]: RootHashKey::publisher_prefix
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RootHashKey(String);

impl RootHashKey {
    pub fn new(publisher: &PublisherId, sequence: u64) -> Self {
        Self(format!("{}{}{}", publisher.to_hex(), KEY_SEPARATOR, sequence))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Scan prefix shared by every key of the same publisher.
    pub fn publisher_prefix(&self) -> &str {
        match self.0.find(KEY_SEPARATOR) {
            Some(idx) => &self.0[..=idx],
            None => &self.0,
        }
    }

    /// Whether this key belongs to the publisher owning `prefix`.
    pub fn has_prefix(&self, prefix: &str) -> bool {
        self.0.starts_with(prefix)
    }

    /// Recover `(publisher, sequence)`.
    pub fn parse(&self) -> Result<(PublisherId, u64), TypeError> {
        let (publisher, sequence) = self
            .0
            .split_once(KEY_SEPARATOR)
            .ok_or_else(|| TypeError::InvalidKey(self.0.clone()))?;
        let publisher = PublisherId::from_hex(publisher)?;
        let sequence = sequence
            .parse::<u64>()
            .map_err(|_| TypeError::InvalidKey(self.0.clone()))?;
        Ok((publisher, sequence))
    }
}

impl fmt::Display for RootHashKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for RootHashKey {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = Self(s.to_string());
        key.parse()?;
        Ok(key)
    }
}

impl AsRef<str> for RootHashKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
