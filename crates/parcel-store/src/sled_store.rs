use std::collections::HashSet;
use std::path::Path;

use chrono::{DateTime, Utc};
use parcel_types::{ContentHash, Object, ObjectHeader, RootHash, RootHashKey};
use serde::de::DeserializeOwned;
use serde::Serialize;
use sled::transaction::{ConflictableTransactionError, TransactionError, Transactional};
use sled::{Db, Tree};
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::gc;
use crate::records::{AppRegistration, GcReport, HeaderRecord, ObjectRecord};
use crate::traits::NodeStore;

const ROOT_HASHES: &str = "root_hashes";
const OBJECT_HEADERS: &str = "object_headers";
const HEADER_OWNER_INDEX: &str = "header_owner_index";
const OBJECTS: &str = "objects";
const OBJECT_OWNER_INDEX: &str = "object_owner_index";
const APPS: &str = "apps";
const APP_ADDRESSES: &str = "app_addresses";

type TxResult<T> = Result<T, ConflictableTransactionError<StoreError>>;

/// Durable node store on sled.
///
/// Records are bincode-encoded. Besides one tree per record kind, the
/// `header_owner_index` tree holds `owner_key \0 header_hash` entries so that
/// lookups by owner do not scan every header, and `object_owner_index` holds
/// `owner_header ++ object_hash` entries for each stored object. Multi-tree
/// updates run in sled transactions.
pub struct SledNodeStore {
    db: Db,
    roots: Tree,
    headers: Tree,
    owner_index: Tree,
    objects: Tree,
    object_index: Tree,
    apps: Tree,
    app_addresses: Tree,
}

impl SledNodeStore {
    /// Open (or create) a store in `path`.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        std::fs::create_dir_all(path)?;
        let db = sled::open(path)?;
        debug!(path = %path.display(), "opened sled store");
        Self::from_db(db)
    }

    /// A store that is deleted when dropped.
    pub fn temporary() -> StoreResult<Self> {
        Self::from_db(sled::Config::new().temporary(true).open()?)
    }

    pub fn from_db(db: Db) -> StoreResult<Self> {
        Ok(Self {
            roots: db.open_tree(ROOT_HASHES)?,
            headers: db.open_tree(OBJECT_HEADERS)?,
            owner_index: db.open_tree(HEADER_OWNER_INDEX)?,
            objects: db.open_tree(OBJECTS)?,
            object_index: db.open_tree(OBJECT_OWNER_INDEX)?,
            apps: db.open_tree(APPS)?,
            app_addresses: db.open_tree(APP_ADDRESSES)?,
            db,
        })
    }

    fn header_record(&self, hash: &ContentHash) -> StoreResult<Option<HeaderRecord>> {
        self.headers
            .get(hash.as_bytes())?
            .map(|bytes| decode(OBJECT_HEADERS, &bytes))
            .transpose()
    }

    fn all_headers(&self) -> StoreResult<Vec<(ContentHash, HeaderRecord)>> {
        self.headers
            .iter()
            .map(|entry| {
                let (key, value) = entry?;
                Ok((hash_from_key(OBJECT_HEADERS, &key)?, decode(OBJECT_HEADERS, &value)?))
            })
            .collect()
    }

    /// Delete the headers in `plan` and their doomed objects, and optionally a
    /// root entry, in one transaction.
    fn apply(
        &self,
        all: &[(ContentHash, HeaderRecord)],
        plan: gc::GcPlan,
        root: Option<&RootHashKey>,
    ) -> StoreResult<GcReport> {
        let owners: Vec<(ContentHash, Vec<u8>)> = all
            .iter()
            .filter(|(h, _)| plan.headers.contains(h))
            .map(|(h, r)| (*h, index_key(&r.owner, h)))
            .collect();

        (
            &self.headers,
            &self.owner_index,
            &self.objects,
            &self.object_index,
            &self.roots,
        )
            .transaction(|(headers, index, objects, object_index, roots)| -> TxResult<GcReport> {
                let mut report = GcReport::default();
                for (hash, index_entry) in &owners {
                    if headers.remove(&hash.as_bytes()[..])?.is_some() {
                        report.headers_removed += 1;
                    }
                    index.remove(index_entry.as_slice())?;
                }
                for hash in &plan.objects {
                    if let Some(old) = objects.remove(&hash.as_bytes()[..])? {
                        let old: ObjectRecord = decode(OBJECTS, &old)
                            .map_err(ConflictableTransactionError::Abort)?;
                        object_index.remove(object_index_key(&old.owner_header, hash))?;
                        report.objects_removed += 1;
                    }
                }
                if let Some(key) = root {
                    report.root_removed = roots.remove(key.as_str())?.is_some();
                }
                Ok(report)
            })
            .map_err(tx_error)
    }
}

impl NodeStore for SledNodeStore {
    fn save_root_hash(&self, root: &RootHash) -> StoreResult<()> {
        self.roots.insert(root.key().as_str(), encode(root)?)?;
        Ok(())
    }

    fn get_root_hash(&self, key: &RootHashKey) -> StoreResult<Option<RootHash>> {
        self.roots
            .get(key.as_str())?
            .map(|bytes| decode(ROOT_HASHES, &bytes))
            .transpose()
    }

    fn delete_root_hash(&self, key: &RootHashKey) -> StoreResult<bool> {
        Ok(self.roots.remove(key.as_str())?.is_some())
    }

    fn save_object_header(
        &self,
        hash: &ContentHash,
        owner: &RootHashKey,
        timestamp: DateTime<Utc>,
        header: &ObjectHeader,
    ) -> StoreResult<()> {
        let record = encode(&HeaderRecord {
            owner: owner.clone(),
            timestamp,
            header: header.clone(),
        })?;
        let new_entry = index_key(owner, hash);

        (&self.headers, &self.owner_index)
            .transaction(|(headers, index)| -> TxResult<()> {
                if let Some(old) = headers.get(hash.as_bytes())? {
                    let old: HeaderRecord = decode(OBJECT_HEADERS, &old)
                        .map_err(ConflictableTransactionError::Abort)?;
                    index.remove(index_key(&old.owner, hash))?;
                }
                headers.insert(&hash.as_bytes()[..], record.as_slice())?;
                index.insert(new_entry.as_slice(), &b""[..])?;
                Ok(())
            })
            .map_err(tx_error)
    }

    fn get_object_header(&self, hash: &ContentHash) -> StoreResult<Option<ObjectHeader>> {
        Ok(self.header_record(hash)?.map(|r| r.header))
    }

    fn get_header_owner(&self, hash: &ContentHash) -> StoreResult<Option<RootHashKey>> {
        Ok(self.header_record(hash)?.map(|r| r.owner))
    }

    fn has_object_header(&self, hash: &ContentHash) -> StoreResult<bool> {
        Ok(self.headers.contains_key(hash.as_bytes())?)
    }

    fn update_object_header_owner(
        &self,
        hash: &ContentHash,
        new_owner: &RootHashKey,
    ) -> StoreResult<bool> {
        (&self.headers, &self.owner_index)
            .transaction(|(headers, index)| -> TxResult<bool> {
                let Some(bytes) = headers.get(hash.as_bytes())? else {
                    return Ok(false);
                };
                let mut record: HeaderRecord = decode(OBJECT_HEADERS, &bytes)
                    .map_err(ConflictableTransactionError::Abort)?;
                if &record.owner == new_owner {
                    return Ok(true);
                }
                index.remove(index_key(&record.owner, hash))?;
                record.owner = new_owner.clone();
                let encoded = encode(&record).map_err(ConflictableTransactionError::Abort)?;
                headers.insert(&hash.as_bytes()[..], encoded)?;
                index.insert(index_key(new_owner, hash), &b""[..])?;
                Ok(true)
            })
            .map_err(tx_error)
    }

    fn find_header_hashes_for_owner(
        &self,
        owner: &RootHashKey,
        timestamp: DateTime<Utc>,
    ) -> StoreResult<HashSet<ContentHash>> {
        let mut prefix = owner.as_str().as_bytes().to_vec();
        prefix.push(0);

        let mut found = HashSet::new();
        for entry in self.owner_index.scan_prefix(&prefix) {
            let (key, _) = entry?;
            let hash = hash_from_key(HEADER_OWNER_INDEX, &key[prefix.len()..])?;
            match self.header_record(&hash)? {
                Some(record) if record.timestamp == timestamp => {
                    found.insert(hash);
                }
                Some(_) => {}
                None => {
                    return Err(StoreError::CorruptRecord {
                        tree: HEADER_OWNER_INDEX,
                        reason: format!("dangling index entry for {hash}"),
                    })
                }
            }
        }
        Ok(found)
    }

    fn save_object(
        &self,
        hash: &ContentHash,
        owner_header: &ContentHash,
        object: &Object,
    ) -> StoreResult<()> {
        let record = encode(&ObjectRecord {
            owner_header: *owner_header,
            object: object.clone(),
        })?;
        let new_entry = object_index_key(owner_header, hash);

        (&self.objects, &self.object_index)
            .transaction(|(objects, index)| -> TxResult<()> {
                if let Some(old) = objects.insert(&hash.as_bytes()[..], record.as_slice())? {
                    let old: ObjectRecord =
                        decode(OBJECTS, &old).map_err(ConflictableTransactionError::Abort)?;
                    index.remove(object_index_key(&old.owner_header, hash))?;
                }
                index.insert(new_entry.as_slice(), &b""[..])?;
                Ok(())
            })
            .map_err(tx_error)
    }

    fn get_object(&self, hash: &ContentHash) -> StoreResult<Option<Object>> {
        self.objects
            .get(hash.as_bytes())?
            .map(|bytes| decode::<ObjectRecord>(OBJECTS, &bytes).map(|r| r.object))
            .transpose()
    }

    fn has_object(&self, hash: &ContentHash) -> StoreResult<bool> {
        Ok(self.objects.contains_key(hash.as_bytes())?)
    }

    fn remove_object_headers(&self, hashes: &HashSet<ContentHash>) -> StoreResult<GcReport> {
        if hashes.is_empty() {
            return Ok(GcReport::default());
        }
        let all = self.all_headers()?;
        let plan = gc::plan(all.iter().map(|(h, r)| (*h, r)), |h, _| hashes.contains(h));
        self.apply(&all, plan, None)
    }

    fn remove_unreferenced_objects(
        &self,
        latest: &RootHashKey,
        signature_valid: bool,
    ) -> StoreResult<GcReport> {
        let prefix = latest.publisher_prefix();
        let all = self.all_headers()?;
        let plan = gc::plan(all.iter().map(|(h, r)| (*h, r)), |_, r| {
            r.owner.has_prefix(prefix) && (!signature_valid || &r.owner != latest)
        });
        let root = (!signature_valid).then_some(latest);
        self.apply(&all, plan, root)
    }

    fn register_app(&self, address: &str, name: &str) -> StoreResult<AppRegistration> {
        (&self.apps, &self.app_addresses)
            .transaction(|(apps, addresses)| -> TxResult<AppRegistration> {
                if let Some(id) = addresses.get(address)? {
                    let existing = apps.get(id)?.ok_or_else(|| {
                        ConflictableTransactionError::Abort(StoreError::CorruptRecord {
                            tree: APP_ADDRESSES,
                            reason: format!("address {address} points at a missing app"),
                        })
                    })?;
                    return decode(APPS, &existing).map_err(ConflictableTransactionError::Abort);
                }

                let registration = AppRegistration {
                    id: apps.generate_id()?,
                    address: address.to_string(),
                    name: name.to_string(),
                };
                let id_key = registration.id.to_be_bytes();
                let encoded =
                    encode(&registration).map_err(ConflictableTransactionError::Abort)?;
                apps.insert(&id_key[..], encoded)?;
                addresses.insert(address, &id_key[..])?;
                Ok(registration)
            })
            .map_err(tx_error)
    }

    fn list_registered_apps(&self) -> StoreResult<Vec<String>> {
        self.apps
            .iter()
            .values()
            .map(|bytes| Ok(decode::<AppRegistration>(APPS, &bytes?)?.address))
            .collect()
    }

    fn flush(&self) -> StoreResult<()> {
        self.db.flush()?;
        Ok(())
    }
}

impl std::fmt::Debug for SledNodeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SledNodeStore")
            .field("roots", &self.roots.len())
            .field("headers", &self.headers.len())
            .field("objects", &self.objects.len())
            .finish()
    }
}

fn encode<T: Serialize>(value: &T) -> StoreResult<Vec<u8>> {
    Ok(bincode::serialize(value)?)
}

fn decode<T: DeserializeOwned>(tree: &'static str, bytes: &[u8]) -> StoreResult<T> {
    bincode::deserialize(bytes).map_err(|e| StoreError::CorruptRecord {
        tree,
        reason: e.to_string(),
    })
}

fn index_key(owner: &RootHashKey, hash: &ContentHash) -> Vec<u8> {
    let mut key = Vec::with_capacity(owner.as_str().len() + 1 + 32);
    key.extend_from_slice(owner.as_str().as_bytes());
    key.push(0);
    key.extend_from_slice(hash.as_bytes());
    key
}

fn object_index_key(owner_header: &ContentHash, hash: &ContentHash) -> Vec<u8> {
    let mut key = Vec::with_capacity(64);
    key.extend_from_slice(owner_header.as_bytes());
    key.extend_from_slice(hash.as_bytes());
    key
}

fn hash_from_key(tree: &'static str, bytes: &[u8]) -> StoreResult<ContentHash> {
    let digest: [u8; 32] = bytes.try_into().map_err(|_| StoreError::CorruptRecord {
        tree,
        reason: format!("expected 32-byte hash key, got {} bytes", bytes.len()),
    })?;
    Ok(ContentHash::from_digest(digest))
}

fn tx_error(e: TransactionError<StoreError>) -> StoreError {
    match e {
        TransactionError::Abort(e) => e,
        TransactionError::Storage(e) => e.into(),
    }
}
