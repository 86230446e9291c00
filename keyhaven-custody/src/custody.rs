//! Wrapped-key custody service.
//!
//! Owns the (owner, file) -> wrapped-key mapping and never releases a key
//! without the access gate's verdict. Ownership failures on `fetch` surface
//! as the same `NotFound` the caller would see for a missing record, so an
//! unauthorized fetch cannot confirm that a file exists.

use crate::error::{CustodyError, CustodyResult};
use crate::gate::{AccessGate, AccessProof, GateDenial};
use crate::record::{GrantEntry, RecordSummary, ReleasedKey, WrappedKeyRecord};
use crate::store::RecordStore;
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info};

/// Key custody: store, gated fetch, grant/revoke, delete.
pub struct KeyCustody {
    store: Arc<dyn RecordStore>,
    gate: AccessGate,
}

impl KeyCustody {
    pub fn new(store: Arc<dyn RecordStore>, gate: AccessGate) -> Self {
        Self { store, gate }
    }

    /// Persists a new wrapped-key record. At most one record per file id;
    /// a second store for the same id fails `DuplicateFile` and leaves the
    /// first record untouched.
    pub async fn store(
        &self,
        file_id: &str,
        owner: &str,
        wrapped_key: Vec<u8>,
        nonce: Vec<u8>,
        require_step_up: bool,
    ) -> CustodyResult<()> {
        let record =
            WrappedKeyRecord::new(file_id, owner, wrapped_key, nonce, require_step_up);
        self.store.insert_new(record).await?;
        info!(%file_id, %owner, require_step_up, "stored wrapped-key record");
        Ok(())
    }

    /// Releases the wrapped key for `requester`, subject to the access gate.
    ///
    /// The released view carries the wrapped key matching the requester:
    /// the owner's entry, or the requester's own grant entry.
    pub async fn fetch(
        &self,
        file_id: &str,
        requester: &str,
        proof: &AccessProof,
    ) -> CustodyResult<ReleasedKey> {
        let record = self.store.get(file_id).await?;
        self.release(file_id, record, requester, proof, None).await
    }

    /// `fetch` with an explicit clock, for deterministic step-up tests.
    pub async fn fetch_at(
        &self,
        file_id: &str,
        requester: &str,
        proof: &AccessProof,
        now_unix: u64,
    ) -> CustodyResult<ReleasedKey> {
        let record = self.store.get(file_id).await?;
        self.release(file_id, record, requester, proof, Some(now_unix))
            .await
    }

    async fn release(
        &self,
        file_id: &str,
        record: Option<WrappedKeyRecord>,
        requester: &str,
        proof: &AccessProof,
        now_unix: Option<u64>,
    ) -> CustodyResult<ReleasedKey> {
        // Missing record takes the same path as a denied one below.
        let Some(record) = record else {
            debug!(%file_id, %requester, "fetch of unknown file");
            return Err(CustodyError::NotFound(file_id.to_string()));
        };

        let verdict = match now_unix {
            Some(now) => self.gate.evaluate_at(&record, requester, proof, now).await?,
            None => self.gate.evaluate(&record, requester, proof).await?,
        };

        match verdict {
            Ok(()) => {}
            // Indistinguishable from a missing record, by policy.
            Err(GateDenial::NotPermitted) => {
                return Err(CustodyError::NotFound(file_id.to_string()))
            }
            Err(GateDenial::StepUpRequired) => return Err(CustodyError::StepUpRequired),
            Err(GateDenial::ReplayedCode) => return Err(CustodyError::CodeReplayed),
            Err(GateDenial::InvalidCode) => {
                return Err(CustodyError::Forbidden(file_id.to_string()))
            }
        }

        let wrapped_key = record
            .wrapped_key_for(requester)
            .ok_or_else(|| CustodyError::NotFound(file_id.to_string()))?
            .to_vec();

        info!(%file_id, %requester, "released wrapped key");
        Ok(ReleasedKey {
            file_id: record.file_id,
            owner: record.owner,
            wrapped_key,
            nonce: record.nonce,
            created_at: record.created_at,
        })
    }

    /// Records a grant: `grantee` may fetch the key, and gets their own
    /// wrapped copy (the content key re-wrapped under the grantee's public
    /// key, since a single RSA-OAEP ciphertext cannot serve two recipients).
    /// Only the owner may grant.
    pub async fn grant(
        &self,
        file_id: &str,
        caller: &str,
        grantee: &str,
        wrapped_key_for_grantee: Vec<u8>,
    ) -> CustodyResult<()> {
        self.authorize_owner(file_id, caller).await?;

        let grantee_owned = grantee.to_string();
        self.store
            .update(
                file_id,
                Box::new(move |record| {
                    record.grants.insert(
                        grantee_owned,
                        GrantEntry {
                            wrapped_key: wrapped_key_for_grantee,
                            granted_at: Utc::now(),
                        },
                    );
                    Ok(())
                }),
            )
            .await?;
        info!(%file_id, %caller, %grantee, "granted key access");
        Ok(())
    }

    /// Removes a grantee's wrapped-key entry. Subsequent fetches by that
    /// identity are denied. Not retroactive: a grantee who already unwrapped
    /// and cached the content key is not cryptographically locked out.
    pub async fn revoke(&self, file_id: &str, caller: &str, grantee: &str) -> CustodyResult<()> {
        self.authorize_owner(file_id, caller).await?;

        let grantee_owned = grantee.to_string();
        self.store
            .update(
                file_id,
                Box::new(move |record| {
                    record.grants.remove(&grantee_owned);
                    Ok(())
                }),
            )
            .await?;
        info!(%file_id, %caller, %grantee, "revoked key access");
        Ok(())
    }

    /// Removes all key records for the file. Must run before or alongside
    /// deletion of the paired blob, or the ciphertext becomes unrecoverable
    /// garbage with no key.
    pub async fn delete(&self, file_id: &str, caller: &str) -> CustodyResult<()> {
        self.authorize_owner(file_id, caller).await?;
        self.store.remove(file_id).await?;
        info!(%file_id, %caller, "deleted wrapped-key record");
        Ok(())
    }

    /// Metadata listing of the caller's records; key material elided.
    pub async fn list(&self, owner: &str) -> CustodyResult<Vec<RecordSummary>> {
        let records = self.store.list_by_owner(owner).await?;
        Ok(records.iter().map(RecordSummary::from).collect())
    }

    async fn authorize_owner(&self, file_id: &str, caller: &str) -> CustodyResult<()> {
        let record = self
            .store
            .get(file_id)
            .await?
            .ok_or_else(|| CustodyError::NotFound(file_id.to_string()))?;
        if record.owner != caller {
            return Err(CustodyError::Forbidden(file_id.to_string()));
        }
        Ok(())
    }
}
