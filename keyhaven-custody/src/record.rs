//! Wrapped-key record types.
//!
//! A `WrappedKeyRecord` is the only persisted key artifact: the owner's
//! RSA-OAEP-wrapped content key, the AES-GCM nonce the file body was sealed
//! under, and one additional wrapped-key entry per grantee. Raw bytes are
//! stored base64-encoded so records round-trip losslessly through JSON.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Serde helper: raw bytes as base64 at rest.
pub(crate) mod base64_bytes {
    use base64::engine::general_purpose::STANDARD as BASE64;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], ser: S) -> Result<S::Ok, S::Error> {
        BASE64.encode(bytes).serialize(ser)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(de)?;
        BASE64.decode(encoded).map_err(serde::de::Error::custom)
    }
}

/// A content key wrapped for one additional authorized principal.
///
/// RSA-OAEP ciphertext only opens under a single private key, so each
/// grantee gets their own entry rather than sharing the owner's.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GrantEntry {
    #[serde(with = "base64_bytes")]
    pub wrapped_key: Vec<u8>,
    pub granted_at: DateTime<Utc>,
}

/// The persisted custody record for one file. At most one per file id.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WrappedKeyRecord {
    /// Opaque file identifier, unique across the store.
    pub file_id: String,
    /// Identity that created the file.
    pub owner: String,
    /// Content key wrapped under the owner's public key.
    #[serde(with = "base64_bytes")]
    pub wrapped_key: Vec<u8>,
    /// 96-bit AES-GCM nonce the file body was sealed under.
    #[serde(with = "base64_bytes")]
    pub nonce: Vec<u8>,
    /// Per-grantee wrapped keys, keyed by grantee identity.
    #[serde(default)]
    pub grants: BTreeMap<String, GrantEntry>,
    /// Whether key release requires a step-up (TOTP) code.
    #[serde(default)]
    pub require_step_up: bool,
    pub created_at: DateTime<Utc>,
}

impl WrappedKeyRecord {
    pub fn new(
        file_id: impl Into<String>,
        owner: impl Into<String>,
        wrapped_key: Vec<u8>,
        nonce: Vec<u8>,
        require_step_up: bool,
    ) -> Self {
        Self {
            file_id: file_id.into(),
            owner: owner.into(),
            wrapped_key,
            nonce,
            grants: BTreeMap::new(),
            require_step_up,
            created_at: Utc::now(),
        }
    }

    /// True if `requester` is the owner or holds a grant.
    pub fn permits(&self, requester: &str) -> bool {
        self.owner == requester || self.grants.contains_key(requester)
    }

    /// The wrapped key that `requester` can actually unwrap, if any.
    pub fn wrapped_key_for(&self, requester: &str) -> Option<&[u8]> {
        if self.owner == requester {
            Some(&self.wrapped_key)
        } else {
            self.grants.get(requester).map(|g| g.wrapped_key.as_slice())
        }
    }
}

/// The view of a record released to an authorized requester.
///
/// Carries only the wrapped key matching the requester, never the other
/// grantees' entries.
#[derive(Clone, Debug)]
pub struct ReleasedKey {
    pub file_id: String,
    pub owner: String,
    pub wrapped_key: Vec<u8>,
    pub nonce: Vec<u8>,
    pub created_at: DateTime<Utc>,
}

/// Owner-facing listing entry; key material elided.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RecordSummary {
    pub file_id: String,
    pub owner: String,
    pub grantee_count: usize,
    pub require_step_up: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&WrappedKeyRecord> for RecordSummary {
    fn from(record: &WrappedKeyRecord) -> Self {
        Self {
            file_id: record.file_id.clone(),
            owner: record.owner.clone(),
            grantee_count: record.grants.len(),
            require_step_up: record.require_step_up,
            created_at: record.created_at,
        }
    }
}
