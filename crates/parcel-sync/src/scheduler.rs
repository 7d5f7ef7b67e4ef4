use std::sync::Arc;
use std::time::Duration;

use parcel_types::RootHash;
use tokio::task::JoinHandle;
use tracing::{debug, error};

use crate::engine::{SyncEngine, SyncOutcome};
use crate::error::SyncResult;

/// Defers resolution of inbound announcements.
///
/// The tracker announces a version as soon as it is published, often before
/// its own copy is queryable. Each announcement is resolved on its own task
/// after `delay`.
#[derive(Clone)]
pub struct AnnouncementScheduler {
    engine: Arc<SyncEngine>,
    delay: Duration,
}

impl AnnouncementScheduler {
    pub fn new(engine: Arc<SyncEngine>, delay: Duration) -> Self {
        Self { engine, delay }
    }

    /// Queue `root` and return immediately. Failures are logged by the task
    /// and also surfaced through the handle.
    pub fn schedule(&self, root: RootHash) -> JoinHandle<SyncResult<SyncOutcome>> {
        let engine = self.engine.clone();
        let delay = self.delay;
        debug!(key = %root.key(), ?delay, "scheduled announcement");

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let result = engine.resolve(&root).await;
            if let Err(e) = &result {
                error!(key = %root.key(), error = %e, "announcement failed");
            }
            result
        })
    }
}
