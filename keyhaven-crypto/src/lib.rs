//! Envelope-encryption primitives for Keyhaven.
//!
//! Provides the per-file key lifecycle:
//! - AES-256-GCM content keys, generated fresh for every file
//! - RSA-OAEP (2048-bit, SHA-256) identity keypairs for wrapping those keys
//! - `seal`/`open` for file bodies, `wrap`/`unwrap` for content keys
//!
//! # Architecture
//!
//! Envelope encryption uses a two-tier key system:
//!
//! 1. **Content key**: a random 256-bit key generated per file. It exists
//!    only transiently in memory and is zeroized on drop; the persisted
//!    artifact is its RSA-OAEP ciphertext (the "wrapped" key).
//!
//! 2. **Identity keypair**: generated once per identity. The private key
//!    never leaves the originating device; the public key is published so
//!    others can wrap content keys for this identity.
//!
//! This allows sharing a single file by re-wrapping just its content key
//! under the recipient's public key, without re-encrypting the file body.

mod envelope;
mod error;
mod key;

pub use envelope::{
    generate_identity_keypair, open, seal, unwrap_key, wrap_key, IdentityKeyPair, SealedBlob,
};
pub use error::{CryptoError, CryptoResult};
pub use key::{ContentKey, KEY_SIZE, NONCE_SIZE, TAG_SIZE};

pub use rsa::{RsaPrivateKey, RsaPublicKey};
