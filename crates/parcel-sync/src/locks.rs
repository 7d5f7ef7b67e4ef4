//! Per-publisher mutual exclusion.
//!
//! Resolutions for different publishers run concurrently; resolutions for
//! the same publisher are serialized so that deduplication, fetching and
//! garbage collection never interleave within one feed.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use parcel_types::PublisherId;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

#[derive(Default)]
pub struct PublisherLocks {
    locks: Mutex<HashMap<PublisherId, Arc<AsyncMutex<()>>>>,
}

impl PublisherLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `publisher`'s feed.
    ///
    /// Entries nobody holds or waits on are pruned here, so the map only
    /// keeps publishers with a resolution in flight.
    pub async fn lock(&self, publisher: &PublisherId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.locks.lock().expect("lock poisoned");
            // Clones are only taken under the map lock, so a count of 1 is final.
            map.retain(|_, lock| Arc::strong_count(lock) > 1);
            map.entry(*publisher)
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }

    /// Number of publishers currently tracked.
    pub fn len(&self) -> usize {
        self.locks.lock().expect("lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn same_publisher_is_serialized() {
        let locks = Arc::new(PublisherLocks::new());
        let active = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));
        let publisher = PublisherId::from_bytes([1; 32]);

        let mut handles = Vec::new();
        for _ in 0..4 {
            let (locks, active, max_seen) = (locks.clone(), active.clone(), max_seen.clone());
            handles.push(tokio::spawn(async move {
                let _guard = locks.lock(&publisher).await;
                let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                max_seen.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                active.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
        assert_eq!(locks.len(), 1);
    }

    #[tokio::test]
    async fn different_publishers_do_not_block() {
        let locks = PublisherLocks::new();
        let _a = locks.lock(&PublisherId::from_bytes([1; 32])).await;
        let b = tokio::time::timeout(
            Duration::from_millis(100),
            locks.lock(&PublisherId::from_bytes([2; 32])),
        )
        .await;
        assert!(b.is_ok());
    }

    #[tokio::test]
    async fn released_locks_are_pruned() {
        let locks = PublisherLocks::new();
        let held = locks.lock(&PublisherId::from_bytes([1; 32])).await;
        drop(locks.lock(&PublisherId::from_bytes([2; 32])).await);

        let third = locks.lock(&PublisherId::from_bytes([3; 32])).await;
        assert_eq!(locks.len(), 2);

        drop(held);
        drop(third);
        let _d = locks.lock(&PublisherId::from_bytes([4; 32])).await;
        assert_eq!(locks.len(), 1);
    }
}
