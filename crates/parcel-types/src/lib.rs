//! Foundation types for parcel distribution.
//!
//! A publisher turns a filesystem tree into a [`Parcel`]: a flat pre-order list
//! of [`ObjectHeader`]s that reference each other by [`ContentHash`], plus the
//! [`Object`] payloads of the files. The parcel is announced through a signed
//! [`RootHash`] and subscribers resolve the rest by hash.
//!
//! # Key Types
//!
//! - [`ContentHash`] -- SHA-256 content address, hex on the wire
//! - [`ObjectHeader`] -- metadata node of the tree (file or directory)
//! - [`Object`] -- immutable file payload
//! - [`Parcel`] -- the materialized tree of one publish
//! - [`RootHash`] -- signed announcement of one version
//! - [`RootHashKey`] -- `publisher_sequence` storage key
//! - [`PublisherId`] -- ed25519 public key of a feed

pub mod error;
pub mod hash;
pub mod header;
pub mod object;
pub mod publisher;
pub mod root;

pub use error::TypeError;
pub use hash::ContentHash;
pub use header::{HeaderMeta, MetaEntry, NodeKind, ObjectHeader};
pub use object::{Object, Parcel};
pub use publisher::{ParcelSignature, PublisherId};
pub use root::{RootHash, RootHashKey};
