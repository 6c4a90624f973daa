//! Error types for the Custody framework

use thiserror::Error;

/// Result type alias using CustodyError
pub type Result<T> = std::result::Result<T, CustodyError>;

/// Errors that can occur in the Custody core library
#[derive(Error, Debug)]
pub enum CustodyError {
    /// Public key bytes do not decode to a valid Ed25519 point
    #[error("Invalid public key: {0}")]
    InvalidKey(String),

    /// Signature verification failed
    #[error("Invalid signature: {0}")]
    SignatureInvalid(String),

    /// A persist directory failed path-safety validation
    #[error(transparent)]
    InvalidPath(#[from] crate::paths::PathError),

    /// A workload configuration field failed validation
    #[error("{0}")]
    InvalidConfig(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<ed25519_dalek::SignatureError> for CustodyError {
    fn from(err: ed25519_dalek::SignatureError) -> Self {
        CustodyError::SignatureInvalid(err.to_string())
    }
}

impl From<serde_json::Error> for CustodyError {
    fn from(err: serde_json::Error) -> Self {
        CustodyError::SerializationError(err.to_string())
    }
}
