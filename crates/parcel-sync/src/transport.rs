use async_trait::async_trait;
use parcel_protocol::TrackerClient;
use parcel_types::{ContentHash, Object, ObjectHeader};

use crate::error::SyncResult;

/// Source of headers and objects a node does not hold yet.
#[async_trait]
pub trait Tracker: Send + Sync {
    /// Headers for `hashes`, in any order.
    async fn object_headers(&self, hashes: &[ContentHash]) -> SyncResult<Vec<ObjectHeader>>;

    async fn object(&self, hash: &ContentHash) -> SyncResult<Object>;
}

#[async_trait]
impl Tracker for TrackerClient {
    async fn object_headers(&self, hashes: &[ContentHash]) -> SyncResult<Vec<ObjectHeader>> {
        Ok(self.get_object_headers(hashes).await?)
    }

    async fn object(&self, hash: &ContentHash) -> SyncResult<Object> {
        Ok(self.get_object(hash).await?)
    }
}
