//! Custody error types.

use thiserror::Error;

/// Result type for custody operations.
pub type CustodyResult<T> = Result<T, CustodyError>;

/// Errors that can occur in custody and access-gate operations.
#[derive(Debug, Error)]
pub enum CustodyError {
    /// The record does not exist, or the requester may not see it. The two
    /// cases are deliberately the same kind so a fetch cannot confirm file
    /// existence to an unauthorized party.
    #[error("no key record available for file {0}")]
    NotFound(String),

    /// Owner-only operation attempted by a non-owner.
    #[error("operation on file {0} denied")]
    Forbidden(String),

    /// A record already exists for this file id; re-upload needs a new id.
    #[error("key record already exists for file {0}")]
    DuplicateFile(String),

    /// The file's policy requires a step-up code and none was presented.
    #[error("step-up authentication required")]
    StepUpRequired,

    /// The presented step-up code was already consumed in its time step.
    #[error("step-up code already used")]
    CodeReplayed,

    /// Underlying record store failure.
    #[error("record store error: {0}")]
    Storage(String),

    /// Crypto-layer failure bubbling up through custody.
    #[error("crypto error: {0}")]
    Crypto(#[from] keyhaven_crypto::CryptoError),
}
