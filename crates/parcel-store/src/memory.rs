use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use parcel_types::{ContentHash, Object, ObjectHeader, RootHash, RootHashKey};

use crate::error::StoreResult;
use crate::gc::{self, GcPlan};
use crate::records::{AppRegistration, GcReport, HeaderRecord, ObjectRecord};
use crate::traits::NodeStore;

#[derive(Default)]
struct State {
    roots: HashMap<RootHashKey, RootHash>,
    headers: HashMap<ContentHash, HeaderRecord>,
    objects: HashMap<ContentHash, ObjectRecord>,
    apps: Vec<AppRegistration>,
}

impl State {
    fn apply(&mut self, plan: GcPlan) -> GcReport {
        let headers_removed = plan
            .headers
            .iter()
            .filter(|h| self.headers.remove(h).is_some())
            .count();
        let objects_removed = plan
            .objects
            .iter()
            .filter(|h| self.objects.remove(h).is_some())
            .count();
        GcReport {
            headers_removed,
            objects_removed,
            root_removed: false,
        }
    }

    fn plan<F>(&self, doomed: F) -> GcPlan
    where
        F: FnMut(&ContentHash, &HeaderRecord) -> bool,
    {
        gc::plan(self.headers.iter().map(|(h, r)| (*h, r)), doomed)
    }
}

/// In-memory node store.
///
/// Intended for tests and embedding. Everything lives behind one `RwLock`, so
/// each operation, garbage collection included, is atomic.
pub struct InMemoryNodeStore {
    state: RwLock<State>,
}

impl InMemoryNodeStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            state: RwLock::new(State::default()),
        }
    }

    pub fn root_count(&self) -> usize {
        self.state.read().expect("lock poisoned").roots.len()
    }

    pub fn header_count(&self) -> usize {
        self.state.read().expect("lock poisoned").headers.len()
    }

    pub fn object_count(&self) -> usize {
        self.state.read().expect("lock poisoned").objects.len()
    }

    /// Total bytes across all stored objects.
    pub fn total_bytes(&self) -> u64 {
        self.state
            .read()
            .expect("lock poisoned")
            .objects
            .values()
            .map(|r| r.object.length)
            .sum()
    }
}

impl Default for InMemoryNodeStore {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeStore for InMemoryNodeStore {
    fn save_root_hash(&self, root: &RootHash) -> StoreResult<()> {
        let mut state = self.state.write().expect("lock poisoned");
        state.roots.insert(root.key(), root.clone());
        Ok(())
    }

    fn get_root_hash(&self, key: &RootHashKey) -> StoreResult<Option<RootHash>> {
        let state = self.state.read().expect("lock poisoned");
        Ok(state.roots.get(key).cloned())
    }

    fn delete_root_hash(&self, key: &RootHashKey) -> StoreResult<bool> {
        let mut state = self.state.write().expect("lock poisoned");
        Ok(state.roots.remove(key).is_some())
    }

    fn save_object_header(
        &self,
        hash: &ContentHash,
        owner: &RootHashKey,
        timestamp: DateTime<Utc>,
        header: &ObjectHeader,
    ) -> StoreResult<()> {
        let mut state = self.state.write().expect("lock poisoned");
        state.headers.insert(
            *hash,
            HeaderRecord {
                owner: owner.clone(),
                timestamp,
                header: header.clone(),
            },
        );
        Ok(())
    }

    fn get_object_header(&self, hash: &ContentHash) -> StoreResult<Option<ObjectHeader>> {
        let state = self.state.read().expect("lock poisoned");
        Ok(state.headers.get(hash).map(|r| r.header.clone()))
    }

    fn get_header_owner(&self, hash: &ContentHash) -> StoreResult<Option<RootHashKey>> {
        let state = self.state.read().expect("lock poisoned");
        Ok(state.headers.get(hash).map(|r| r.owner.clone()))
    }

    fn update_object_header_owner(
        &self,
        hash: &ContentHash,
        new_owner: &RootHashKey,
    ) -> StoreResult<bool> {
        let mut state = self.state.write().expect("lock poisoned");
        match state.headers.get_mut(hash) {
            Some(record) => {
                record.owner = new_owner.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn find_header_hashes_for_owner(
        &self,
        owner: &RootHashKey,
        timestamp: DateTime<Utc>,
    ) -> StoreResult<HashSet<ContentHash>> {
        let state = self.state.read().expect("lock poisoned");
        Ok(state
            .headers
            .iter()
            .filter(|(_, r)| &r.owner == owner && r.timestamp == timestamp)
            .map(|(h, _)| *h)
            .collect())
    }

    fn save_object(
        &self,
        hash: &ContentHash,
        owner_header: &ContentHash,
        object: &Object,
    ) -> StoreResult<()> {
        let mut state = self.state.write().expect("lock poisoned");
        state.objects.insert(
            *hash,
            ObjectRecord {
                owner_header: *owner_header,
                object: object.clone(),
            },
        );
        Ok(())
    }

    fn get_object(&self, hash: &ContentHash) -> StoreResult<Option<Object>> {
        let state = self.state.read().expect("lock poisoned");
        Ok(state.objects.get(hash).map(|r| r.object.clone()))
    }

    fn has_object(&self, hash: &ContentHash) -> StoreResult<bool> {
        let state = self.state.read().expect("lock poisoned");
        Ok(state.objects.contains_key(hash))
    }

    fn remove_object_headers(&self, hashes: &HashSet<ContentHash>) -> StoreResult<GcReport> {
        let mut state = self.state.write().expect("lock poisoned");
        let plan = state.plan(|h, _| hashes.contains(h));
        Ok(state.apply(plan))
    }

    fn remove_unreferenced_objects(
        &self,
        latest: &RootHashKey,
        signature_valid: bool,
    ) -> StoreResult<GcReport> {
        let prefix = latest.publisher_prefix();
        let mut state = self.state.write().expect("lock poisoned");
        let plan = state.plan(|_, r| {
            r.owner.has_prefix(prefix) && (!signature_valid || &r.owner != latest)
        });
        let mut report = state.apply(plan);
        if !signature_valid {
            report.root_removed = state.roots.remove(latest).is_some();
        }
        Ok(report)
    }

    fn register_app(&self, address: &str, name: &str) -> StoreResult<AppRegistration> {
        let mut state = self.state.write().expect("lock poisoned");
        if let Some(existing) = state.apps.iter().find(|a| a.address == address) {
            return Ok(existing.clone());
        }
        let registration = AppRegistration {
            id: state.apps.len() as u64 + 1,
            address: address.to_string(),
            name: name.to_string(),
        };
        state.apps.push(registration.clone());
        Ok(registration)
    }

    fn list_registered_apps(&self) -> StoreResult<Vec<String>> {
        let state = self.state.read().expect("lock poisoned");
        Ok(state.apps.iter().map(|a| a.address.clone()).collect())
    }
}

impl std::fmt::Debug for InMemoryNodeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryNodeStore")
            .field("roots", &self.root_count())
            .field("headers", &self.header_count())
            .field("objects", &self.object_count())
            .finish()
    }
}
