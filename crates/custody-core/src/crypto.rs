//! Cryptographic primitives for instance and principal identities
//!
//! Identities in the custody model are raw Ed25519 keys: an instance
//! is named by its public key, and operators/owners prove control of
//! theirs by signing the instance public key. Workload requests are
//! signed over the canonical payload bytes (see [`crate::canonical`]).
//!
//! Key types:
//! - `KeyPair`: Ed25519 key pair for signing
//! - `PublicKey`: Ed25519 public key for verification

use crate::error::{CustodyError, Result};
use ed25519_dalek::{Signature, Signer, SigningKey, VerifyingKey};
use rand::rngs::OsRng;

/// Length of an Ed25519 public key in bytes
pub const PUBLIC_KEY_LENGTH: usize = ed25519_dalek::PUBLIC_KEY_LENGTH;

/// Length of an Ed25519 detached signature in bytes
pub const SIGNATURE_LENGTH: usize = ed25519_dalek::SIGNATURE_LENGTH;

/// Ed25519 key pair for signing
#[derive(Clone)]
pub struct KeyPair {
    /// Ed25519 signing key (private)
    signing_key: SigningKey,
    /// Ed25519 verifying key (public)
    verifying_key: VerifyingKey,
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("public_key", &hex::encode(self.verifying_key.to_bytes()))
            .field("signing_key", &"[redacted]")
            .finish()
    }
}

impl KeyPair {
    /// Generate a new random key pair
    pub fn generate() -> Self {
        let signing_key = SigningKey::generate(&mut OsRng);
        let verifying_key = signing_key.verifying_key();

        Self {
            signing_key,
            verifying_key,
        }
    }

    /// Create a key pair from raw signing key bytes
    pub fn from_bytes(bytes: &[u8; 32]) -> Self {
        let signing_key = SigningKey::from_bytes(bytes);
        let verifying_key = signing_key.verifying_key();
        Self {
            signing_key,
            verifying_key,
        }
    }

    /// Get the raw signing key bytes
    pub fn signing_key_bytes(&self) -> [u8; 32] {
        self.signing_key.to_bytes()
    }

    /// Get the raw public key bytes
    pub fn public_key_bytes(&self) -> [u8; PUBLIC_KEY_LENGTH] {
        self.verifying_key.to_bytes()
    }

    /// Get the public half of this key pair
    pub fn public_key(&self) -> PublicKey {
        PublicKey {
            verifying_key: self.verifying_key,
        }
    }

    /// Produce a detached signature over a message
    pub fn sign(&self, message: &[u8]) -> [u8; SIGNATURE_LENGTH] {
        self.signing_key.sign(message).to_bytes()
    }
}

/// Ed25519 public key for verification
#[derive(Clone, PartialEq, Eq)]
pub struct PublicKey {
    verifying_key: VerifyingKey,
}

impl std::fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PublicKey")
            .field("bytes", &hex::encode(self.verifying_key.to_bytes()))
            .finish()
    }
}

impl PublicKey {
    /// Create a public key from raw bytes
    ///
    /// Rejects byte strings that do not decode to a valid curve point.
    pub fn from_bytes(bytes: &[u8; PUBLIC_KEY_LENGTH]) -> Result<Self> {
        let verifying_key = VerifyingKey::from_bytes(bytes)
            .map_err(|e| CustodyError::InvalidKey(e.to_string()))?;
        Ok(Self { verifying_key })
    }

    /// Get the raw public key bytes
    pub fn to_bytes(&self) -> [u8; PUBLIC_KEY_LENGTH] {
        self.verifying_key.to_bytes()
    }

    /// Verify a detached signature over a message
    ///
    /// Uses strict verification to reject malleable signature
    /// encodings.
    pub fn verify(&self, message: &[u8], signature: &[u8; SIGNATURE_LENGTH]) -> Result<()> {
        let sig = Signature::from_bytes(signature);
        self.verifying_key
            .verify_strict(message, &sig)
            .map_err(|e| CustodyError::SignatureInvalid(e.to_string()))
    }
}

/// Verify a detached signature over a message against raw key bytes
///
/// Boundary form of [`PublicKey::verify`]: wrong-length keys or
/// signatures and malformed key encodings return `false` rather than
/// panicking.
pub fn verify_detached(pubkey: &[u8], message: &[u8], signature: &[u8]) -> bool {
    let Ok(key_bytes) = <[u8; PUBLIC_KEY_LENGTH]>::try_from(pubkey) else {
        return false;
    };
    let Ok(sig_bytes) = <[u8; SIGNATURE_LENGTH]>::try_from(signature) else {
        return false;
    };
    let Ok(key) = PublicKey::from_bytes(&key_bytes) else {
        return false;
    };
    key.verify(message, &sig_bytes).is_ok()
}
