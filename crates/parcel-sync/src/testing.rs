//! In-process doubles shared by the unit tests.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use parcel_crypto::{CanonicalHasher, SigningKey};
use parcel_protocol::NotifyAppRequest;
use parcel_types::{
    ContentHash, Object, ObjectHeader, Parcel, ParcelSignature, PublisherId, RootHash,
};
use tempfile::TempDir;

use crate::error::{SyncError, SyncResult};
use crate::fanout::AppNotifier;
use crate::transport::Tracker;

/// Tracker serving whatever has been published to it, counting requests.
#[derive(Default)]
pub struct FakeTracker {
    headers: Mutex<HashMap<ContentHash, ObjectHeader>>,
    objects: Mutex<HashMap<ContentHash, Object>>,
    header_batches: AtomicUsize,
    headers_requested: AtomicUsize,
    objects_requested: AtomicUsize,
    offline: AtomicBool,
}

impl FakeTracker {
    pub fn publish(&self, parcel: &Parcel) {
        let mut headers = self.headers.lock().unwrap();
        for header in &parcel.object_headers {
            headers.insert(CanonicalHasher::header_hash(header).unwrap(), header.clone());
        }
        let mut objects = self.objects.lock().unwrap();
        for object in &parcel.objects {
            objects.insert(CanonicalHasher::object_hash(object).unwrap(), object.clone());
        }
    }

    /// Serve `header` when asked for `hash`, whatever it really hashes to.
    pub fn serve_header_as(&self, hash: ContentHash, header: ObjectHeader) {
        self.headers.lock().unwrap().insert(hash, header);
    }

    pub fn serve_object_as(&self, hash: ContentHash, object: Object) {
        self.objects.lock().unwrap().insert(hash, object);
    }

    pub fn go_offline(&self) {
        self.offline.store(true, Ordering::SeqCst);
    }

    pub fn header_batches(&self) -> usize {
        self.header_batches.load(Ordering::SeqCst)
    }

    pub fn headers_requested(&self) -> usize {
        self.headers_requested.load(Ordering::SeqCst)
    }

    pub fn objects_requested(&self) -> usize {
        self.objects_requested.load(Ordering::SeqCst)
    }

    fn check_online(&self) -> SyncResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(SyncError::Transport("tracker unreachable".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl Tracker for FakeTracker {
    async fn object_headers(&self, hashes: &[ContentHash]) -> SyncResult<Vec<ObjectHeader>> {
        self.check_online()?;
        self.header_batches.fetch_add(1, Ordering::SeqCst);
        self.headers_requested.fetch_add(hashes.len(), Ordering::SeqCst);
        let headers = self.headers.lock().unwrap();
        Ok(hashes.iter().filter_map(|h| headers.get(h).cloned()).collect())
    }

    async fn object(&self, hash: &ContentHash) -> SyncResult<Object> {
        self.check_online()?;
        self.objects_requested.fetch_add(1, Ordering::SeqCst);
        self.objects
            .lock()
            .unwrap()
            .get(hash)
            .cloned()
            .ok_or_else(|| SyncError::Transport(format!("no object {}", hash.short_hex())))
    }
}

/// Notifier that records every delivery and fails for chosen addresses.
#[derive(Default)]
pub struct RecordingNotifier {
    delivered: Mutex<Vec<(String, NotifyAppRequest)>>,
    failing: HashSet<String>,
}

impl RecordingNotifier {
    pub fn failing<const N: usize>(addresses: [&str; N]) -> Self {
        Self {
            delivered: Mutex::default(),
            failing: addresses.iter().map(|a| a.to_string()).collect(),
        }
    }

    pub fn addresses(&self) -> Vec<String> {
        self.delivered
            .lock()
            .unwrap()
            .iter()
            .map(|(a, _)| a.clone())
            .collect()
    }

    pub fn requests(&self) -> Vec<NotifyAppRequest> {
        self.delivered
            .lock()
            .unwrap()
            .iter()
            .map(|(_, r)| r.clone())
            .collect()
    }
}

#[async_trait]
impl AppNotifier for RecordingNotifier {
    async fn notify(&self, address: &str, request: &NotifyAppRequest) -> SyncResult<()> {
        self.delivered
            .lock()
            .unwrap()
            .push((address.to_string(), request.clone()));
        if self.failing.contains(address) {
            return Err(SyncError::Transport(format!("{address} refused")));
        }
        Ok(())
    }
}

pub fn sample_request() -> NotifyAppRequest {
    NotifyAppRequest {
        root_hash: RootHash {
            publisher: PublisherId::from_bytes([3; 32]),
            signature: ParcelSignature::from_bytes([0; 64]),
            sequence: 1,
            timestamp: chrono::Utc::now(),
            object_header_hash: ContentHash::of(b"root"),
        },
        parcel: Parcel::new(),
    }
}

/// Write `files` under `<tmp>/site` and build a parcel of that directory.
pub fn site_parcel(files: &[(&str, &[u8])]) -> Parcel {
    let dir = TempDir::new().unwrap();
    let site = dir.path().join("site");
    write_files(&site, files);
    parcel_builder::build_parcel(&[&site]).unwrap()
}

fn write_files(root: &Path, files: &[(&str, &[u8])]) {
    for (name, data) in files {
        let path = root.join(name);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, data).unwrap();
    }
}

pub fn signed(parcel: &Parcel, key: &SigningKey, sequence: u64) -> RootHash {
    parcel_builder::build_root_hash(parcel, key, sequence).unwrap()
}
