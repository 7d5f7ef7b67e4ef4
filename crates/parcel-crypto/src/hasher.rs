use parcel_types::{ContentHash, Object, ObjectHeader, Parcel};
use serde::Serialize;
use sha2::{Digest, Sha256};

/// Canonical content hasher.
///
/// The canonical form of a value is its compact JSON encoding with fields in
/// declaration order. Headers, objects and parcels are all addressed by the
/// SHA-256 of that form, so a node can recompute any hash it receives and
/// reject content that does not match.
pub struct CanonicalHasher;

impl CanonicalHasher {
    /// Canonical bytes of a serializable value.
    pub fn canonical_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>, HasherError> {
        serde_json::to_vec(value).map_err(|e| HasherError::Serialization(e.to_string()))
    }

    /// Hash raw bytes.
    pub fn hash_bytes(data: &[u8]) -> ContentHash {
        ContentHash::from_digest(Sha256::digest(data).into())
    }

    /// Hash a serializable value through its canonical bytes.
    pub fn hash<T: Serialize>(value: &T) -> Result<ContentHash, HasherError> {
        Ok(Self::hash_bytes(&Self::canonical_bytes(value)?))
    }

    pub fn header_hash(header: &ObjectHeader) -> Result<ContentHash, HasherError> {
        Self::hash(header)
    }

    pub fn object_hash(object: &Object) -> Result<ContentHash, HasherError> {
        Self::hash(object)
    }

    /// Bytes covered by a parcel signature.
    pub fn parcel_bytes(parcel: &Parcel) -> Result<Vec<u8>, HasherError> {
        Self::canonical_bytes(parcel)
    }

    /// Check that `value` hashes to `expected`.
    pub fn verify<T: Serialize>(value: &T, expected: &ContentHash) -> Result<bool, HasherError> {
        Ok(Self::hash(value)? == *expected)
    }
}

/// Errors from hashing operations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum HasherError {
    #[error("serialization error: {0}")]
    Serialization(String),
}
