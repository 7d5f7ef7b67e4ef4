//! Synchronization for parcel subscriber nodes.
//!
//! Turns announced root hashes into verified local copies:
//!
//! - [`SyncEngine`] resolves one announcement end to end
//! - [`AnnouncementScheduler`] defers resolution off the request path
//! - [`Tracker`] abstracts where missing content comes from
//! - [`AppNotifier`] delivers accepted versions to local applications

pub mod engine;
pub mod error;
pub mod fanout;
pub mod locks;
pub mod scheduler;
pub mod transport;

#[cfg(test)]
mod testing;

pub use engine::{SyncEngine, SyncOutcome, MAX_ATTEMPTS};
pub use error::{FailureKind, SyncError, SyncResult};
pub use fanout::{fan_out, AppNotifier, FanOutReport, HttpAppNotifier};
pub use locks::PublisherLocks;
pub use scheduler::AnnouncementScheduler;
pub use transport::Tracker;
