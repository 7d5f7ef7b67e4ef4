//! Local persistence for a parcel node.
//!
//! A subscriber node keeps every root hash it has accepted, the headers and
//! objects of the trees behind them, and the local applications that want to
//! be told about new parcels. Each header is owned by exactly one root key
//! (`publisher_sequence`), which is what garbage collection uses to drop
//! superseded versions of a publisher's feed.
//!
//! # Storage Backends
//!
//! All backends implement the [`NodeStore`] trait:
//!
//! - [`InMemoryNodeStore`] -- `HashMap`-based store for tests and embedding
//! - [`SledNodeStore`] -- durable store on sled
//!
//! # Design Rules
//!
//! 1. Headers and objects are keyed by content hash and never mutated.
//! 2. A header's owner changes only by re-ownership to a newer version.
//! 3. Objects are deleted only when no surviving header references them.
//! 4. The store is an explicit instance, injected where it is needed.
//! 5. All I/O errors are propagated, never silently ignored.

pub mod error;
mod gc;
pub mod memory;
pub mod records;
pub mod sled_store;
pub mod traits;

#[cfg(test)]
mod conformance;

// Re-export primary types at crate root for ergonomic imports.
pub use error::{StoreError, StoreResult};
pub use memory::InMemoryNodeStore;
pub use records::{AppRegistration, GcReport, HeaderRecord, ObjectRecord};
pub use sled_store::SledNodeStore;
pub use traits::NodeStore;
