//! Crypto error types.

use thiserror::Error;

/// Result type for crypto operations.
pub type CryptoResult<T> = Result<T, CryptoError>;

/// Errors that can occur in envelope-encryption primitives.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// The environment lacks a usable crypto backend (RNG or keygen failure).
    /// Fatal; nothing in this crate works without it.
    #[error("crypto backend unavailable: {0}")]
    CryptoUnavailable(String),

    /// AEAD tag verification failed: tampered, truncated, or wrong key.
    #[error("authentication failed: ciphertext rejected")]
    AuthenticationFailed,

    /// RSA-OAEP unwrap failed. Deliberately carries no detail about which
    /// stage failed (padding, length, integrity) to avoid oracle behavior.
    #[error("key unwrap failed")]
    UnwrapFailed,

    /// The key material does not fit in the recipient modulus's OAEP payload.
    #[error("key of {len} bytes exceeds OAEP payload limit of {limit} bytes")]
    KeyTooLarge { len: usize, limit: usize },

    /// Raw key bytes had the wrong length.
    #[error("invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },
}
