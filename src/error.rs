//! Error types for license validation.

use thiserror::Error;

/// Failures of the parse → canonicalize → verify pipeline.
#[derive(Debug, Error)]
pub enum LicenseError {
    /// Required configuration is absent or empty.
    #[error("missing configuration: {0}")]
    Config(String),

    /// The public key is not valid base64, or not a usable Ed25519 key.
    #[error("[public key] {0}")]
    KeyFormat(String),

    /// The signature is not valid base64.
    #[error("[signature] {0}")]
    SignatureFormat(String),

    /// The signature is shorter than a base64 Ed25519 signature.
    #[error("invalid signature: {0}")]
    InvalidSignature(String),

    /// The canonical payload could not be encoded.
    #[error("[canonical payload] {0}")]
    Serialization(#[source] serde_json::Error),

    /// Ed25519 verification of the canonical payload failed.
    #[error("[ed25519] signature verification failed")]
    SignatureVerification,

    /// The input is not a JSON license object.
    #[error("failed to parse license: {0}")]
    Parse(#[source] serde_json::Error),
}

/// Result type for license operations.
pub type LicenseResult<T> = Result<T, LicenseError>;
