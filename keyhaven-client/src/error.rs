//! Session error types.

use thiserror::Error;

/// Result type for session operations.
pub type SessionResult<T> = Result<T, SessionError>;

/// Errors surfaced by the envelope session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Unwrap or open failed: wrong key, tampered ciphertext, or corrupt
    /// record. Never retried; a retry cannot fix an integrity failure and
    /// would only mask tampering.
    #[error("decryption failed")]
    DecryptionFailed,

    /// A collaborator call exceeded the configured timeout. Transient; the
    /// caller may retry with backoff, the session never does.
    #[error("operation timed out: {0}")]
    Timeout(&'static str),

    /// The blob store has no entry for the file.
    #[error("blob not found for file {0}")]
    BlobMissing(String),

    /// The key directory has no published key for the identity.
    #[error("no public key published for {0}")]
    UnknownIdentity(String),

    /// Blob-store collaborator failure.
    #[error("blob store error: {0}")]
    Blob(String),

    /// Custody-service failure, kind preserved.
    #[error(transparent)]
    Custody(#[from] keyhaven_custody::CustodyError),

    /// Crypto failure outside the unwrap/open path (keygen, wrap).
    #[error(transparent)]
    Crypto(#[from] keyhaven_crypto::CryptoError),
}
