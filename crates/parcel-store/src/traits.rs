use std::collections::HashSet;

use chrono::{DateTime, Utc};
use parcel_types::{ContentHash, Object, ObjectHeader, RootHash, RootHashKey};

use crate::error::StoreResult;
use crate::records::{AppRegistration, GcReport};

/// Persistence contract of a subscriber node.
///
/// All implementations must satisfy these invariants:
/// - Lookups of missing records return `Ok(None)`, never an error.
/// - Every stored header has exactly one owner key. Re-owning moves the
///   header to a newer version of the same tree.
/// - Objects are keyed by content hash and never mutated.
/// - Garbage collection never deletes an object that a surviving header
///   still references.
/// - All I/O errors are propagated, never silently ignored.
pub trait NodeStore: Send + Sync {
    // -- root hashes ---------------------------------------------------------

    fn save_root_hash(&self, root: &RootHash) -> StoreResult<()>;

    fn get_root_hash(&self, key: &RootHashKey) -> StoreResult<Option<RootHash>>;

    /// Delete a root entry. Returns `true` if it existed.
    fn delete_root_hash(&self, key: &RootHashKey) -> StoreResult<bool>;

    // -- headers -------------------------------------------------------------

    /// Store `header` under `hash`, owned by `owner` and stamped with the
    /// owning root's timestamp. Overwrites any previous record.
    fn save_object_header(
        &self,
        hash: &ContentHash,
        owner: &RootHashKey,
        timestamp: DateTime<Utc>,
        header: &ObjectHeader,
    ) -> StoreResult<()>;

    fn get_object_header(&self, hash: &ContentHash) -> StoreResult<Option<ObjectHeader>>;

    fn get_header_owner(&self, hash: &ContentHash) -> StoreResult<Option<RootHashKey>>;

    fn has_object_header(&self, hash: &ContentHash) -> StoreResult<bool> {
        Ok(self.get_object_header(hash)?.is_some())
    }

    /// Move a header to `new_owner`. Returns `false` if it is not stored.
    fn update_object_header_owner(
        &self,
        hash: &ContentHash,
        new_owner: &RootHashKey,
    ) -> StoreResult<bool>;

    /// Hashes of the headers owned by `owner` that were saved with `timestamp`.
    fn find_header_hashes_for_owner(
        &self,
        owner: &RootHashKey,
        timestamp: DateTime<Utc>,
    ) -> StoreResult<HashSet<ContentHash>>;

    // -- objects -------------------------------------------------------------

    fn save_object(
        &self,
        hash: &ContentHash,
        owner_header: &ContentHash,
        object: &Object,
    ) -> StoreResult<()>;

    fn get_object(&self, hash: &ContentHash) -> StoreResult<Option<Object>>;

    fn has_object(&self, hash: &ContentHash) -> StoreResult<bool> {
        Ok(self.get_object(hash)?.is_some())
    }

    // -- garbage collection --------------------------------------------------

    /// Delete exactly the given headers, plus their objects when no surviving
    /// header references them.
    fn remove_object_headers(&self, hashes: &HashSet<ContentHash>) -> StoreResult<GcReport>;

    /// Collect the publisher of `latest`.
    ///
    /// With a valid signature, every header owned by another key of the same
    /// publisher is deleted. With an invalid one, every header of the
    /// publisher is deleted along with the `latest` root entry.
    fn remove_unreferenced_objects(
        &self,
        latest: &RootHashKey,
        signature_valid: bool,
    ) -> StoreResult<GcReport>;

    // -- registered apps -----------------------------------------------------

    /// Register an application. Registering a known address returns the
    /// existing registration unchanged.
    fn register_app(&self, address: &str, name: &str) -> StoreResult<AppRegistration>;

    /// Registered addresses in registration order.
    fn list_registered_apps(&self) -> StoreResult<Vec<String>>;

    /// Persist buffered writes. No-op for volatile backends.
    fn flush(&self) -> StoreResult<()> {
        Ok(())
    }
}
