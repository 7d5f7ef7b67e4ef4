use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use parcel_types::PublisherId;
use tracing::{info, warn};

use crate::signer::SigningKey;

/// A node's long-lived ed25519 key pair.
///
/// Persisted as a single line `"<public_hex>:<secret_hex>"`.
pub struct KeyPair {
    signing: SigningKey,
}

impl KeyPair {
    pub fn generate() -> Self {
        Self {
            signing: SigningKey::generate(),
        }
    }

    pub fn from_signing_key(signing: SigningKey) -> Self {
        Self { signing }
    }

    pub fn signing_key(&self) -> &SigningKey {
        &self.signing
    }

    pub fn publisher_id(&self) -> PublisherId {
        self.signing.publisher_id()
    }

    /// Key file line for this pair.
    pub fn encode(&self) -> String {
        format!(
            "{}:{}",
            self.publisher_id().to_hex(),
            hex::encode(self.signing.as_bytes())
        )
    }

    /// Parse a key file line. The public half must match the secret.
    pub fn decode(line: &str) -> Result<Self, KeyFileError> {
        let (public, secret) = line
            .trim()
            .split_once(':')
            .ok_or_else(|| KeyFileError::Malformed("missing ':' separator".into()))?;

        let secret = hex::decode(secret).map_err(|e| KeyFileError::Malformed(e.to_string()))?;
        let secret: [u8; 32] = secret
            .try_into()
            .map_err(|_| KeyFileError::Malformed("secret key must be 32 bytes".into()))?;
        let public =
            PublisherId::from_hex(public).map_err(|e| KeyFileError::Malformed(e.to_string()))?;

        let signing = SigningKey::from_bytes(secret);
        if signing.publisher_id() != public {
            return Err(KeyFileError::Malformed(
                "public key does not match secret key".into(),
            ));
        }
        Ok(Self { signing })
    }

    /// Read the key pair at `path`, writing a fresh one there if the file is
    /// missing or unusable.
    pub fn load_or_generate(path: impl AsRef<Path>) -> Result<Self, KeyFileError> {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(contents) => match Self::decode(&contents) {
                Ok(pair) => return Ok(pair),
                Err(e) => warn!(path = %path.display(), error = %e, "unusable key file, regenerating"),
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(KeyFileError::Io {
                    path: path.to_path_buf(),
                    source: e,
                })
            }
        }

        let pair = Self::generate();
        pair.save(path)?;
        info!(path = %path.display(), publisher = %pair.publisher_id().short_id(), "generated new key pair");
        Ok(pair)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), KeyFileError> {
        let path = path.as_ref();
        let io_err = |source| KeyFileError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        fs::write(path, self.encode()).map_err(io_err)
    }
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("publisher", &self.publisher_id())
            .finish_non_exhaustive()
    }
}

/// Errors from key file handling.
#[derive(Debug, thiserror::Error)]
pub enum KeyFileError {
    #[error("malformed key file: {0}")]
    Malformed(String),

    #[error("key file I/O at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
