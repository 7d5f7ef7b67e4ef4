use std::path::Path;

use chrono::Utc;
use parcel_crypto::{sign_parcel, CanonicalHasher, SigningKey};
use parcel_types::{Parcel, RootHash};
use tracing::info;

use crate::error::{BuildError, BuildResult};
use crate::tree::build_parcel;

/// Sign `parcel` and stamp the root hash announcing it.
///
/// The signature covers the canonical bytes of the whole parcel; the
/// announced header hash is that of `object_headers[0]`.
pub fn build_root_hash(parcel: &Parcel, key: &SigningKey, sequence: u64) -> BuildResult<RootHash> {
    let root = parcel.root().ok_or(BuildError::EmptyInput)?;
    let object_header_hash = CanonicalHasher::header_hash(root)?;
    let signature = sign_parcel(parcel, key)?;

    Ok(RootHash {
        publisher: key.publisher_id(),
        signature,
        sequence,
        timestamp: Utc::now(),
        object_header_hash,
    })
}

/// Build and sign the parcel for `paths` as version `sequence`.
pub fn build<P: AsRef<Path>>(
    paths: &[P],
    key: &SigningKey,
    sequence: u64,
) -> BuildResult<(Parcel, RootHash)> {
    let parcel = build_parcel(paths)?;
    let root_hash = build_root_hash(&parcel, key, sequence)?;
    info!(
        key = %root_hash.key(),
        headers = parcel.object_headers.len(),
        bytes = parcel.total_bytes(),
        "built parcel"
    );
    Ok((parcel, root_hash))
}
