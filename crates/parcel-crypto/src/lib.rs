//! Cryptographic primitives for parcel distribution.
//!
//! Provides canonical SHA-256 content hashing, Ed25519 signing with
//! self-verification, parcel signature checks, and the node key file.
//!
//! All crypto operations wrap established libraries.

pub mod hasher;
pub mod keyfile;
pub mod signer;

pub use hasher::{CanonicalHasher, HasherError};
pub use keyfile::{KeyFileError, KeyPair};
pub use signer::{sign_parcel, verify, verify_parcel, SignatureError, SigningKey, VerifyingKey};
