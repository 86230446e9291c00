//! Seal/open and wrap/unwrap operations.
//!
//! Uses AES-256-GCM for file bodies and RSA-OAEP (SHA-256) for content keys.
//! Each seal generates a fresh 96-bit nonce; the nonce travels with the
//! sealed blob because the ciphertext is meaningless without it.

use crate::error::{CryptoError, CryptoResult};
use crate::key::{ContentKey, KEY_SIZE, NONCE_SIZE, TAG_SIZE};
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;
use rsa::traits::PublicKeyParts;
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use zeroize::Zeroize;

/// RSA modulus size for identity keypairs.
const RSA_BITS: usize = 2048;

/// OAEP overhead with SHA-256: 2 * hash_len + 2.
const OAEP_OVERHEAD: usize = 2 * 32 + 2;

/// RSA identity keypair for wrapping content keys.
///
/// The private key stays on the originating device; only the public half is
/// published. `rsa::RsaPrivateKey` zeroizes its private material on drop.
pub struct IdentityKeyPair {
    pub private: RsaPrivateKey,
    pub public: RsaPublicKey,
}

impl IdentityKeyPair {
    /// Returns a clone of the public key for publication.
    pub fn public_key(&self) -> RsaPublicKey {
        self.public.clone()
    }
}

/// AES-256-GCM ciphertext of a file body, with the nonce it was sealed under.
///
/// The authentication tag is appended to `ciphertext`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SealedBlob {
    pub nonce: [u8; NONCE_SIZE],
    pub ciphertext: Vec<u8>,
}

impl SealedBlob {
    /// Encodes nonce-then-ciphertext as base64 for at-rest storage.
    pub fn to_base64(&self) -> String {
        let mut combined = Vec::with_capacity(NONCE_SIZE + self.ciphertext.len());
        combined.extend_from_slice(&self.nonce);
        combined.extend_from_slice(&self.ciphertext);
        BASE64.encode(combined)
    }

    /// Decodes the base64 at-rest form.
    pub fn from_base64(encoded: &str) -> CryptoResult<Self> {
        let decoded = BASE64
            .decode(encoded)
            .map_err(|_| CryptoError::AuthenticationFailed)?;
        if decoded.len() < NONCE_SIZE + TAG_SIZE {
            return Err(CryptoError::AuthenticationFailed);
        }
        let (nonce, ciphertext) = decoded.split_at(NONCE_SIZE);
        let mut nonce_arr = [0u8; NONCE_SIZE];
        nonce_arr.copy_from_slice(nonce);
        Ok(Self {
            nonce: nonce_arr,
            ciphertext: ciphertext.to_vec(),
        })
    }
}

/// Generates an RSA-2048 identity keypair (public exponent 65537).
///
/// Fails with `CryptoUnavailable` if the backend cannot produce a key,
/// e.g. when the RNG is unusable.
pub fn generate_identity_keypair() -> CryptoResult<IdentityKeyPair> {
    let private = RsaPrivateKey::new(&mut OsRng, RSA_BITS)
        .map_err(|e| CryptoError::CryptoUnavailable(format!("RSA keygen failed: {e}")))?;
    let public = RsaPublicKey::from(&private);
    Ok(IdentityKeyPair { private, public })
}

/// Seals plaintext under a content key with AES-256-GCM.
///
/// A fresh random nonce is generated per call; the same (key, nonce) pair is
/// never reused because nonces are drawn from the OS CSPRNG each time.
pub fn seal(key: &ContentKey, plaintext: &[u8]) -> CryptoResult<SealedBlob> {
    let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
        .map_err(|e| CryptoError::CryptoUnavailable(format!("cipher init failed: {e}")))?;

    let mut nonce = [0u8; NONCE_SIZE];
    OsRng.fill_bytes(&mut nonce);

    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce), plaintext)
        .map_err(|e| CryptoError::CryptoUnavailable(format!("seal failed: {e}")))?;

    Ok(SealedBlob { nonce, ciphertext })
}

/// Opens a sealed blob, verifying the authentication tag.
///
/// Any tag mismatch or truncation fails with `AuthenticationFailed`; no
/// partial plaintext is ever returned.
pub fn open(key: &ContentKey, sealed: &SealedBlob) -> CryptoResult<Vec<u8>> {
    if sealed.ciphertext.len() < TAG_SIZE {
        return Err(CryptoError::AuthenticationFailed);
    }
    let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
        .map_err(|e| CryptoError::CryptoUnavailable(format!("cipher init failed: {e}")))?;

    cipher
        .decrypt(
            Nonce::from_slice(&sealed.nonce),
            sealed.ciphertext.as_slice(),
        )
        .map_err(|_| CryptoError::AuthenticationFailed)
}

/// Wraps a content key under a recipient's RSA public key with OAEP/SHA-256.
///
/// The payload-limit check is generic over the modulus size even though a
/// 256-bit key always fits a 2048-bit modulus.
pub fn wrap_key(key: &ContentKey, recipient: &RsaPublicKey) -> CryptoResult<Vec<u8>> {
    let limit = recipient.size().saturating_sub(OAEP_OVERHEAD);
    if KEY_SIZE > limit {
        return Err(CryptoError::KeyTooLarge {
            len: KEY_SIZE,
            limit,
        });
    }

    recipient
        .encrypt(&mut OsRng, Oaep::new::<Sha256>(), key.as_bytes())
        .map_err(|e| CryptoError::CryptoUnavailable(format!("wrap failed: {e}")))
}

/// Unwraps a content key with the recipient's RSA private key.
///
/// All failure modes (padding, length, wrong key) collapse into the single
/// `UnwrapFailed` kind so callers cannot be used as a padding oracle.
pub fn unwrap_key(wrapped: &[u8], recipient: &RsaPrivateKey) -> CryptoResult<ContentKey> {
    let mut raw = recipient
        .decrypt(Oaep::new::<Sha256>(), wrapped)
        .map_err(|_| CryptoError::UnwrapFailed)?;

    let key = ContentKey::from_bytes(&raw).map_err(|_| CryptoError::UnwrapFailed);
    raw.zeroize();
    key
}
