//! Resolution of announced root hashes.
//!
//! A resolution walks the announced tree top-down, asking the tracker only
//! for headers the node does not already hold. Headers that are held are
//! claimed by the new version together with everything below them. Once the
//! tree is complete it is reassembled into a parcel and its signature is
//! checked against the announcing publisher.
//!
//! ```text
//!   announce ─► dedup ─► save root ─► fetch frontier ─► reconstruct ─► verify
//!                                                                      │
//!                     ┌──────────── valid ◄─────────────────────────┤
//!                     ▼                                              ▼
//!               gc(valid) ─► fan out                       discard, retry once,
//!                                                           then gc(invalid)
//! ```

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parcel_crypto::{verify_parcel, CanonicalHasher};
use parcel_protocol::NotifyAppRequest;
use parcel_store::{GcReport, NodeStore};
use parcel_types::{ContentHash, ObjectHeader, Parcel, RootHash, RootHashKey};
use tracing::{debug, error, info, warn};

use crate::error::{SyncError, SyncResult};
use crate::fanout::{fan_out, AppNotifier, FanOutReport};
use crate::locks::PublisherLocks;
use crate::transport::Tracker;

/// Attempts made before a version is declared invalid.
pub const MAX_ATTEMPTS: u32 = 2;

/// How a resolution ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The root key was already stored; nothing was done.
    AlreadyResolved,
    /// Signature verified; older versions collected and apps notified.
    Accepted {
        gc: GcReport,
        delivery: FanOutReport,
    },
    /// Signature did not verify on any attempt; the publisher's headers
    /// were dropped.
    Discarded { gc: GcReport },
}

/// Drives resolutions against one store, tracker and notifier.
pub struct SyncEngine {
    store: Arc<dyn NodeStore>,
    tracker: Arc<dyn Tracker>,
    notifier: Arc<dyn AppNotifier>,
    locks: PublisherLocks,
}

impl SyncEngine {
    pub fn new(
        store: Arc<dyn NodeStore>,
        tracker: Arc<dyn Tracker>,
        notifier: Arc<dyn AppNotifier>,
    ) -> Self {
        Self {
            store,
            tracker,
            notifier,
            locks: PublisherLocks::new(),
        }
    }

    /// Resolve one announced version.
    ///
    /// Runs under the publisher's lock. An `Err` means the attempt was
    /// aborted: the optimistic root entry is removed so a later announcement
    /// of the same version starts over, while fetched headers and objects are
    /// kept for reuse.
    pub async fn resolve(&self, root: &RootHash) -> SyncResult<SyncOutcome> {
        let _guard = self.locks.lock(&root.publisher).await;
        let key = root.key();

        if self.store.get_root_hash(&key)?.is_some() {
            info!(%key, "root hash already resolved");
            return Ok(SyncOutcome::AlreadyResolved);
        }

        let mut attempt = 1;
        loop {
            let verified = match self.attempt(root, &key).await {
                Ok(verified) => verified,
                Err(e) => {
                    error!(%key, kind = ?e.kind(), error = %e, "resolution aborted");
                    if let Err(cleanup) = self.store.delete_root_hash(&key) {
                        error!(%key, error = %cleanup, "failed to remove aborted root hash");
                    }
                    return Err(e);
                }
            };

            if let Some(parcel) = verified {
                let gc = self.store.remove_unreferenced_objects(&key, true)?;
                info!(
                    %key,
                    headers = parcel.object_headers.len(),
                    headers_removed = gc.headers_removed,
                    objects_removed = gc.objects_removed,
                    "accepted new version"
                );
                let request = NotifyAppRequest {
                    root_hash: root.clone(),
                    parcel,
                };
                let delivery = fan_out(self.store.as_ref(), self.notifier.as_ref(), &request).await?;
                return Ok(SyncOutcome::Accepted { gc, delivery });
            }

            if attempt < MAX_ATTEMPTS {
                warn!(%key, attempt, "signature did not verify, retrying");
                self.discard_attempt(root, &key)?;
                attempt += 1;
                continue;
            }

            let gc = self.store.remove_unreferenced_objects(&key, false)?;
            warn!(
                %key,
                headers_removed = gc.headers_removed,
                objects_removed = gc.objects_removed,
                "signature did not verify, discarded version"
            );
            return Ok(SyncOutcome::Discarded { gc });
        }
    }

    /// One fetch-and-verify pass. `Ok(None)` means the tree was incomplete or
    /// the signature did not verify.
    async fn attempt(&self, root: &RootHash, key: &RootHashKey) -> SyncResult<Option<Parcel>> {
        self.store.save_root_hash(root)?;
        self.fetch_tree(root, key).await?;

        let Some(parcel) = self.reconstruct(&root.object_header_hash)? else {
            warn!(%key, "tree is incomplete after fetch");
            return Ok(None);
        };
        if verify_parcel(&parcel, &root.publisher, &root.signature) {
            Ok(Some(parcel))
        } else {
            Ok(None)
        }
    }

    /// Bring every header and object under `root` into the store, owned by
    /// `key`.
    async fn fetch_tree(&self, root: &RootHash, key: &RootHashKey) -> SyncResult<()> {
        let mut seen = HashSet::new();
        let mut frontier = Vec::new();
        self.claim(&root.object_header_hash, key, &mut seen, &mut frontier)?;

        while !frontier.is_empty() {
            debug!(%key, count = frontier.len(), "requesting header frontier");
            let answered = self.tracker.object_headers(&frontier).await?;
            let headers = match_answers(&frontier, answered)?;

            let mut next = Vec::new();
            for hash in &frontier {
                let Some(header) = headers.get(hash) else {
                    continue;
                };
                for child in &header.external_references {
                    self.claim(child, key, &mut seen, &mut next)?;
                }
                self.store
                    .save_object_header(hash, key, root.timestamp, header)?;
                if let Some(object_hash) = &header.object_hash {
                    self.fetch_object(object_hash, hash).await?;
                }
            }
            frontier = next;
        }
        Ok(())
    }

    /// Re-own `hash` and everything held below it, queueing whatever is
    /// missing onto `missing`. A held header whose object is gone counts as
    /// missing.
    fn claim(
        &self,
        hash: &ContentHash,
        key: &RootHashKey,
        seen: &mut HashSet<ContentHash>,
        missing: &mut Vec<ContentHash>,
    ) -> SyncResult<()> {
        let mut stack = vec![*hash];
        while let Some(hash) = stack.pop() {
            if !seen.insert(hash) {
                continue;
            }
            match self.store.get_object_header(&hash)? {
                Some(header) if self.object_held(&header)? => {
                    self.store.update_object_header_owner(&hash, key)?;
                    stack.extend(header.external_references.iter().copied());
                }
                _ => missing.push(hash),
            }
        }
        Ok(())
    }

    fn object_held(&self, header: &ObjectHeader) -> SyncResult<bool> {
        match &header.object_hash {
            Some(hash) => Ok(self.store.has_object(hash)?),
            None => Ok(true),
        }
    }

    async fn fetch_object(&self, hash: &ContentHash, owner: &ContentHash) -> SyncResult<()> {
        if self.store.has_object(hash)? {
            return Ok(());
        }
        let object = self.tracker.object(hash).await?;
        let actual = CanonicalHasher::object_hash(&object)?;
        if actual != *hash {
            return Err(SyncError::Integrity(format!(
                "object {} hashes to {}",
                hash.short_hex(),
                actual.short_hex()
            )));
        }
        self.store.save_object(hash, owner, &object)?;
        Ok(())
    }

    /// Reassemble the parcel rooted at `root` in builder order: each header
    /// before its children, children in reference order.
    fn reconstruct(&self, root: &ContentHash) -> SyncResult<Option<Parcel>> {
        let mut parcel = Parcel::new();
        let mut stack = vec![*root];

        while let Some(hash) = stack.pop() {
            let Some(header) = self.store.get_object_header(&hash)? else {
                return Ok(None);
            };
            if let Some(object_hash) = &header.object_hash {
                let Some(object) = self.store.get_object(object_hash)? else {
                    return Ok(None);
                };
                parcel.objects.push(object);
            }
            stack.extend(header.external_references.iter().rev().copied());
            parcel.object_headers.push(header);
        }
        Ok(Some(parcel))
    }

    /// Undo a failed attempt so the next one starts from a clean slate.
    fn discard_attempt(&self, root: &RootHash, key: &RootHashKey) -> SyncResult<()> {
        self.store.delete_root_hash(key)?;
        let fetched = self.store.find_header_hashes_for_owner(key, root.timestamp)?;
        let report = self.store.remove_object_headers(&fetched)?;
        debug!(
            %key,
            headers_removed = report.headers_removed,
            objects_removed = report.objects_removed,
            "discarded attempt"
        );
        Ok(())
    }
}

/// Pair a tracker answer with the hashes that were asked for.
///
/// Every answered header must hash to a requested value and every requested
/// value must be answered.
fn match_answers(
    requested: &[ContentHash],
    answered: Vec<ObjectHeader>,
) -> SyncResult<HashMap<ContentHash, ObjectHeader>> {
    let wanted: HashSet<&ContentHash> = requested.iter().collect();
    let mut headers = HashMap::with_capacity(answered.len());

    for header in answered {
        let hash = CanonicalHasher::header_hash(&header)?;
        if !wanted.contains(&hash) {
            return Err(SyncError::Decode(format!(
                "tracker returned unrequested header {}",
                hash.short_hex()
            )));
        }
        headers.insert(hash, header);
    }

    if let Some(missing) = requested.iter().find(|h| !headers.contains_key(h)) {
        return Err(SyncError::Decode(format!(
            "tracker did not return header {}",
            missing.short_hex()
        )));
    }
    Ok(headers)
}
