//! Parcel construction for publishers.
//!
//! Walks a filesystem path depth-first and emits a [`Parcel`]: every file
//! becomes an [`Object`] plus a file header, every directory a header whose
//! references are the hashes of its finished children. The parcel is then
//! signed and announced through a [`RootHash`].
//!
//! # Key Types
//!
//! - [`TreeBuilder`] -- arena-based pre-order tree construction
//! - [`build_parcel`] -- paths to unsigned parcel
//! - [`build`] -- paths to signed parcel plus root hash
//! - [`BuildError`] -- unreadable inputs and signing failures
//!
//! [`Parcel`]: parcel_types::Parcel
//! [`Object`]: parcel_types::Object
//! [`RootHash`]: parcel_types::RootHash

pub mod error;
pub mod publish;
pub mod tree;

pub use error::{BuildError, BuildResult};
pub use publish::{build, build_root_hash};
pub use tree::{build_parcel, parse_path_list, TreeBuilder};
