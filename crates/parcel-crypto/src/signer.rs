use parcel_types::{Parcel, ParcelSignature, PublisherId};

use crate::hasher::CanonicalHasher;

/// Ed25519 signing key (private).
pub struct SigningKey(ed25519_dalek::SigningKey);

/// Ed25519 verifying key (public).
#[derive(Clone, PartialEq, Eq)]
pub struct VerifyingKey(ed25519_dalek::VerifyingKey);

impl SigningKey {
    /// Generate a new random signing key.
    pub fn generate() -> Self {
        let mut csprng = rand::thread_rng();
        Self(ed25519_dalek::SigningKey::generate(&mut csprng))
    }

    /// Create from raw 32-byte secret.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(ed25519_dalek::SigningKey::from_bytes(&bytes))
    }

    /// The corresponding public verifying key.
    pub fn verifying_key(&self) -> VerifyingKey {
        VerifyingKey(self.0.verifying_key())
    }

    /// Publisher identity of this key.
    pub fn publisher_id(&self) -> PublisherId {
        self.verifying_key().to_publisher_id()
    }

    /// Sign a message and check the result against the derived public key.
    ///
    /// A signature that does not verify is never returned.
    pub fn sign(&self, message: &[u8]) -> Result<ParcelSignature, SignatureError> {
        use ed25519_dalek::Signer;
        let signature = ParcelSignature::from_bytes(self.0.sign(message).to_bytes());
        if !verify(&self.publisher_id(), &signature, message) {
            return Err(SignatureError::SigningFailure);
        }
        Ok(signature)
    }

    /// Raw secret key bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        self.0.as_bytes()
    }
}

impl VerifyingKey {
    /// Verify a signature on a message.
    pub fn verify(&self, message: &[u8], signature: &ParcelSignature) -> Result<(), SignatureError> {
        use ed25519_dalek::Verifier;
        let signature = ed25519_dalek::Signature::from_bytes(signature.as_bytes());
        self.0
            .verify(message, &signature)
            .map_err(|_| SignatureError::InvalidSignature)
    }

    pub fn to_publisher_id(&self) -> PublisherId {
        PublisherId::from_bytes(self.0.to_bytes())
    }

    /// Raw public key bytes.
    pub fn as_bytes(&self) -> [u8; 32] {
        self.0.to_bytes()
    }

    /// Create from raw 32-byte public key.
    pub fn from_bytes(bytes: [u8; 32]) -> Result<Self, SignatureError> {
        let key = ed25519_dalek::VerifyingKey::from_bytes(&bytes)
            .map_err(|_| SignatureError::InvalidKey)?;
        Ok(Self(key))
    }

    pub fn from_publisher(publisher: &PublisherId) -> Result<Self, SignatureError> {
        Self::from_bytes(*publisher.as_bytes())
    }
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SigningKey(<redacted>)")
    }
}

impl std::fmt::Debug for VerifyingKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "VerifyingKey({})", hex::encode(self.0.to_bytes()))
    }
}

/// Check `signature` over `message` against a publisher key.
///
/// Any failure, including a publisher id that is not a valid curve point,
/// is reported as `false`.
pub fn verify(publisher: &PublisherId, signature: &ParcelSignature, message: &[u8]) -> bool {
    VerifyingKey::from_publisher(publisher)
        .and_then(|key| key.verify(message, signature))
        .is_ok()
}

/// Sign the canonical bytes of a parcel.
pub fn sign_parcel(parcel: &Parcel, key: &SigningKey) -> Result<ParcelSignature, SignatureError> {
    let bytes = CanonicalHasher::parcel_bytes(parcel)
        .map_err(|e| SignatureError::Serialization(e.to_string()))?;
    key.sign(&bytes)
}

/// Verify a parcel signature. Unserializable parcels do not verify.
pub fn verify_parcel(parcel: &Parcel, publisher: &PublisherId, signature: &ParcelSignature) -> bool {
    match CanonicalHasher::parcel_bytes(parcel) {
        Ok(bytes) => verify(publisher, signature, &bytes),
        Err(_) => false,
    }
}

/// Errors from signing operations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("invalid signature")]
    InvalidSignature,
    #[error("invalid key")]
    InvalidKey,
    #[error("signature failed self-verification")]
    SigningFailure,
    #[error("serialization error: {0}")]
    Serialization(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use parcel_types::{Object, ObjectHeader};

    fn sample_parcel() -> Parcel {
        let object = Object::new(b"0123456789".to_vec());
        let hash = CanonicalHasher::object_hash(&object).unwrap();
        Parcel {
            object_headers: vec![ObjectHeader::file("a.txt", hash, 10)],
            objects: vec![object],
        }
    }

    #[test]
    fn sign_and_verify() {
        let sk = SigningKey::generate();
        let sig = sk.sign(b"hello world").unwrap();
        assert!(verify(&sk.publisher_id(), &sig, b"hello world"));
    }

    #[test]
    fn verify_fails_on_wrong_message() {
        let sk = SigningKey::generate();
        let sig = sk.sign(b"correct message").unwrap();
        assert!(!verify(&sk.publisher_id(), &sig, b"wrong message"));
    }

    #[test]
    fn verify_fails_with_wrong_key() {
        let sk1 = SigningKey::generate();
        let sk2 = SigningKey::generate();
        let sig = sk1.sign(b"message").unwrap();
        assert!(!verify(&sk2.publisher_id(), &sig, b"message"));
    }

    #[test]
    fn from_bytes_roundtrip() {
        let sk = SigningKey::generate();
        let sk2 = SigningKey::from_bytes(*sk.as_bytes());
        assert_eq!(sk.verifying_key(), sk2.verifying_key());
    }

    #[test]
    fn publisher_id_matches_verifying_key() {
        let sk = SigningKey::generate();
        assert_eq!(sk.publisher_id().as_bytes(), &sk.verifying_key().as_bytes());
    }

    #[test]
    fn parcel_signature_roundtrip() {
        let sk = SigningKey::generate();
        let parcel = sample_parcel();
        let sig = sign_parcel(&parcel, &sk).unwrap();
        assert!(verify_parcel(&parcel, &sk.publisher_id(), &sig));
    }

    #[test]
    fn mutated_parcel_fails_verification() {
        let sk = SigningKey::generate();
        let parcel = sample_parcel();
        let sig = sign_parcel(&parcel, &sk).unwrap();

        let mut mutated = parcel.clone();
        mutated.objects[0].data[0] ^= 0x01;
        assert!(!verify_parcel(&mutated, &sk.publisher_id(), &sig));

        let mut renamed = parcel;
        renamed.object_headers[0].meta.name = "b.txt".into();
        assert!(!verify_parcel(&renamed, &sk.publisher_id(), &sig));
    }

    #[test]
    fn mutated_signature_fails_verification() {
        let sk = SigningKey::generate();
        let parcel = sample_parcel();
        let sig = sign_parcel(&parcel, &sk).unwrap();
        let mut bytes = *sig.as_bytes();
        bytes[0] ^= 0x80;
        let bad = ParcelSignature::from_bytes(bytes);
        assert!(!verify_parcel(&parcel, &sk.publisher_id(), &bad));
    }

    #[test]
    fn debug_redacts_signing_key() {
        let sk = SigningKey::generate();
        let debug = format!("{sk:?}");
        assert!(debug.contains("redacted"));
    }
}
