//! Instance identity key management
//!
//! The instance is named by an Ed25519 key generated on first boot and
//! persisted beside the lifecycle records. The private half never
//! leaves this type; it is used only to endorse registered principals
//! by counter-signing their public keys.

use custody_core::{KeyPair, PUBLIC_KEY_LENGTH, SIGNATURE_LENGTH};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::Path;
use thiserror::Error;
use tracing::info;

/// File name of the persisted instance signing key
const INSTANCE_KEY_FILE: &str = "instance.key";

/// Error loading or persisting the instance key
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid instance key file: {0}")]
    InvalidKey(String),
}

/// The instance's own cryptographic identity
#[derive(Debug, Clone)]
pub struct InstanceIdentity {
    key_pair: KeyPair,
}

impl InstanceIdentity {
    /// Create an identity from an existing key pair
    pub fn new(key_pair: KeyPair) -> Self {
        Self { key_pair }
    }

    /// Generate a fresh, unpersisted identity
    pub fn generate() -> Self {
        Self::new(KeyPair::generate())
    }

    /// Load the instance key from `storage_dir`, generating and
    /// persisting a new one if none exists yet
    pub fn load_or_generate(storage_dir: &Path) -> Result<Self, IdentityError> {
        fs::create_dir_all(storage_dir)?;
        let key_path = storage_dir.join(INSTANCE_KEY_FILE);

        match fs::read(&key_path) {
            Ok(bytes) => {
                let bytes: [u8; 32] = bytes.try_into().map_err(|v: Vec<u8>| {
                    IdentityError::InvalidKey(format!("expected 32 bytes, got {}", v.len()))
                })?;
                Ok(Self::new(KeyPair::from_bytes(&bytes)))
            }
            Err(err) if err.kind() == ErrorKind::NotFound => {
                let key_pair = KeyPair::generate();

                // Private key material: readable by the owner only
                let mut options = fs::OpenOptions::new();
                options.write(true).create_new(true);
                #[cfg(unix)]
                {
                    use std::os::unix::fs::OpenOptionsExt;
                    options.mode(0o600);
                }
                options
                    .open(&key_path)?
                    .write_all(&key_pair.signing_key_bytes())?;
                info!(
                    pubkey = %hex::encode(key_pair.public_key_bytes()),
                    "Generated new instance key"
                );
                Ok(Self::new(key_pair))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// The raw instance public key bytes
    pub fn pubkey_bytes(&self) -> [u8; PUBLIC_KEY_LENGTH] {
        self.key_pair.public_key_bytes()
    }

    /// The instance public key, hex-encoded
    pub fn pubkey_hex(&self) -> String {
        hex::encode(self.pubkey_bytes())
    }

    /// Counter-sign a principal's public key with the instance key
    pub fn endorse(&self, principal_pubkey: &[u8; PUBLIC_KEY_LENGTH]) -> [u8; SIGNATURE_LENGTH] {
        self.key_pair.sign(principal_pubkey)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use custody_core::PublicKey;

    #[test]
    fn test_load_or_generate_is_stable() {
        let dir = tempfile::tempdir().unwrap();

        let first = InstanceIdentity::load_or_generate(dir.path()).unwrap();
        let second = InstanceIdentity::load_or_generate(dir.path()).unwrap();

        assert_eq!(first.pubkey_bytes(), second.pubkey_bytes());
    }

    #[test]
    fn test_distinct_dirs_distinct_identities() {
        let dir_a = tempfile::tempdir().unwrap();
        let dir_b = tempfile::tempdir().unwrap();

        let a = InstanceIdentity::load_or_generate(dir_a.path()).unwrap();
        let b = InstanceIdentity::load_or_generate(dir_b.path()).unwrap();

        assert_ne!(a.pubkey_bytes(), b.pubkey_bytes());
    }

    #[test]
    fn test_corrupt_key_file_rejected() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(INSTANCE_KEY_FILE), b"short").unwrap();

        let result = InstanceIdentity::load_or_generate(dir.path());
        assert!(matches!(result, Err(IdentityError::InvalidKey(_))));
    }

    #[cfg(unix)]
    #[test]
    fn test_key_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        InstanceIdentity::load_or_generate(dir.path()).unwrap();

        let mode = fs::metadata(dir.path().join(INSTANCE_KEY_FILE))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_endorsement_verifies() {
        let identity = InstanceIdentity::generate();
        let principal = KeyPair::generate();

        let endorsement = identity.endorse(&principal.public_key_bytes());

        let instance_key = PublicKey::from_bytes(&identity.pubkey_bytes()).unwrap();
        assert!(instance_key
            .verify(&principal.public_key_bytes(), &endorsement)
            .is_ok());
    }
}
