//! Behaviour every `NodeStore` backend must share. Each backend's test module
//! runs these against a fresh instance.

use std::collections::HashSet;

use chrono::{DateTime, TimeZone, Utc};
use parcel_types::{
    ContentHash, Object, ObjectHeader, ParcelSignature, PublisherId, RootHash,
};

use crate::records::GcReport;
use crate::traits::NodeStore;

fn publisher(byte: u8) -> PublisherId {
    PublisherId::from_bytes([byte; 32])
}

fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
}

fn root(publisher: PublisherId, sequence: u64) -> RootHash {
    RootHash {
        publisher,
        signature: ParcelSignature::from_bytes([9; 64]),
        sequence,
        timestamp: at(sequence as i64),
        object_header_hash: ContentHash::of(format!("root-{sequence}").as_bytes()),
    }
}

/// Store a file header owned by `owner` plus its object. Returns the header hash.
fn put_file(store: &dyn NodeStore, owner: &RootHash, name: &str, data: &[u8]) -> ContentHash {
    let object = Object::new(data.to_vec());
    let object_hash = ContentHash::of(data);
    let header = ObjectHeader::file(name, object_hash, data.len() as u64);
    let header_hash = ContentHash::of(format!("{}:{name}", owner.key()).as_bytes());
    store
        .save_object_header(&header_hash, &owner.key(), owner.timestamp, &header)
        .unwrap();
    store.save_object(&object_hash, &header_hash, &object).unwrap();
    header_hash
}

pub fn root_hash_lifecycle(store: &dyn NodeStore) {
    let r = root(publisher(1), 1);
    assert!(store.get_root_hash(&r.key()).unwrap().is_none());

    store.save_root_hash(&r).unwrap();
    assert_eq!(store.get_root_hash(&r.key()).unwrap(), Some(r.clone()));

    assert!(store.delete_root_hash(&r.key()).unwrap());
    assert!(!store.delete_root_hash(&r.key()).unwrap());
    assert!(store.get_root_hash(&r.key()).unwrap().is_none());
}

pub fn header_ownership(store: &dyn NodeStore) {
    let v1 = root(publisher(1), 1);
    let v2 = root(publisher(1), 2);
    let h = put_file(store, &v1, "a.txt", b"aaa");

    assert_eq!(store.get_header_owner(&h).unwrap(), Some(v1.key()));
    assert_eq!(store.get_object_header(&h).unwrap().unwrap().name(), "a.txt");
    assert!(store.has_object_header(&h).unwrap());

    assert!(store.update_object_header_owner(&h, &v2.key()).unwrap());
    assert_eq!(store.get_header_owner(&h).unwrap(), Some(v2.key()));

    let missing = ContentHash::of(b"missing");
    assert!(!store.update_object_header_owner(&missing, &v2.key()).unwrap());
    assert!(store.get_object_header(&missing).unwrap().is_none());
    assert!(store.get_header_owner(&missing).unwrap().is_none());
}

pub fn find_headers_by_owner_and_timestamp(store: &dyn NodeStore) {
    let v1 = root(publisher(1), 1);
    let v2 = root(publisher(1), 2);
    let a = put_file(store, &v1, "a", b"a");
    let b = put_file(store, &v1, "b", b"b");
    put_file(store, &v2, "c", b"c");

    let stale = ContentHash::of(b"stale");
    store
        .save_object_header(&stale, &v1.key(), at(999), &ObjectHeader::directory("d"))
        .unwrap();

    let found = store
        .find_header_hashes_for_owner(&v1.key(), v1.timestamp)
        .unwrap();
    assert_eq!(found, HashSet::from([a, b]));
}

pub fn objects_by_hash(store: &dyn NodeStore) {
    let object = Object::new(b"payload".to_vec());
    let hash = ContentHash::of(b"payload");
    assert!(!store.has_object(&hash).unwrap());
    assert!(store.get_object(&hash).unwrap().is_none());

    store.save_object(&hash, &ContentHash::of(b"h"), &object).unwrap();
    assert!(store.has_object(&hash).unwrap());
    assert_eq!(store.get_object(&hash).unwrap(), Some(object));
}

pub fn valid_gc_keeps_latest_and_shared_objects(store: &dyn NodeStore) {
    let p = publisher(1);
    let v1 = root(p, 1);
    let v2 = root(p, 2);
    store.save_root_hash(&v1).unwrap();
    store.save_root_hash(&v2).unwrap();

    let old = put_file(store, &v1, "old.txt", b"old");
    let shared_v1 = put_file(store, &v1, "shared.txt", b"shared");
    let new = put_file(store, &v2, "new.txt", b"new");
    let shared_v2 = put_file(store, &v2, "shared-again.txt", b"shared");

    let report = store.remove_unreferenced_objects(&v2.key(), true).unwrap();
    assert_eq!(report.headers_removed, 2);
    assert_eq!(report.objects_removed, 1);
    assert!(!report.root_removed);

    assert!(store.get_object_header(&old).unwrap().is_none());
    assert!(store.get_object_header(&shared_v1).unwrap().is_none());
    assert!(store.get_object_header(&new).unwrap().is_some());
    assert!(store.get_object_header(&shared_v2).unwrap().is_some());

    assert!(!store.has_object(&ContentHash::of(b"old")).unwrap());
    assert!(store.has_object(&ContentHash::of(b"shared")).unwrap());
    assert!(store.has_object(&ContentHash::of(b"new")).unwrap());
    assert!(store.get_root_hash(&v2.key()).unwrap().is_some());
}

pub fn invalid_gc_removes_whole_publisher(store: &dyn NodeStore) {
    let p = publisher(1);
    let v1 = root(p, 1);
    let v2 = root(p, 2);
    store.save_root_hash(&v1).unwrap();
    store.save_root_hash(&v2).unwrap();
    let a = put_file(store, &v1, "a", b"a");
    let b = put_file(store, &v2, "b", b"b");

    let report = store.remove_unreferenced_objects(&v2.key(), false).unwrap();
    assert_eq!(report.headers_removed, 2);
    assert_eq!(report.objects_removed, 2);
    assert!(report.root_removed);

    assert!(store.get_object_header(&a).unwrap().is_none());
    assert!(store.get_object_header(&b).unwrap().is_none());
    assert!(store.get_root_hash(&v2.key()).unwrap().is_none());
    assert!(store.get_root_hash(&v1.key()).unwrap().is_some());
}

pub fn gc_is_scoped_to_one_publisher(store: &dyn NodeStore) {
    let a = publisher(0x11);
    let mut bytes = [0x11; 32];
    bytes[31] = 0x12;
    let b = PublisherId::from_bytes(bytes);

    let a1 = root(a, 1);
    let b1 = root(b, 1);
    let b10 = root(b, 10);
    let a_file = put_file(store, &a1, "a", b"a-data");
    let b_file = put_file(store, &b1, "b", b"b-data");
    let b10_file = put_file(store, &b10, "b10", b"b10-data");

    let report = store.remove_unreferenced_objects(&a1.key(), false).unwrap();
    assert_eq!(report.headers_removed, 1);
    assert!(store.get_object_header(&a_file).unwrap().is_none());
    assert!(store.get_object_header(&b_file).unwrap().is_some());

    let report = store.remove_unreferenced_objects(&b1.key(), true).unwrap();
    assert_eq!(report.headers_removed, 1);
    assert!(store.get_object_header(&b_file).unwrap().is_some());
    assert!(store.get_object_header(&b10_file).unwrap().is_none());
}

pub fn remove_specific_headers(store: &dyn NodeStore) {
    let v1 = root(publisher(1), 1);
    let first = put_file(store, &v1, "one", b"same");
    let second = put_file(store, &v1, "two", b"same");

    let report = store.remove_object_headers(&HashSet::from([first])).unwrap();
    assert_eq!(report.headers_removed, 1);
    assert_eq!(report.objects_removed, 0);
    assert!(store.has_object(&ContentHash::of(b"same")).unwrap());

    let report = store.remove_object_headers(&HashSet::from([second])).unwrap();
    assert_eq!(report.headers_removed, 1);
    assert_eq!(report.objects_removed, 1);
    assert!(!store.has_object(&ContentHash::of(b"same")).unwrap());

    let report = store.remove_object_headers(&HashSet::new()).unwrap();
    assert_eq!(report, GcReport::default());
}

pub fn app_registration(store: &dyn NodeStore) {
    assert!(store.list_registered_apps().unwrap().is_empty());

    let first = store.register_app("127.0.0.1:9001", "viewer").unwrap();
    let second = store.register_app("127.0.0.1:9002", "indexer").unwrap();
    assert_ne!(first.id, second.id);

    let again = store.register_app("127.0.0.1:9001", "renamed").unwrap();
    assert_eq!(again, first);

    assert_eq!(
        store.list_registered_apps().unwrap(),
        vec!["127.0.0.1:9001".to_string(), "127.0.0.1:9002".to_string()]
    );
}

