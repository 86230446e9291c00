//! Client-side envelope session.
//!
//! The only component that ever holds a plaintext content key and file bytes
//! at the same time. Drives encrypt-then-wrap-then-submit on write and
//! fetch-then-unwrap-then-open on read; the blob store receives only sealed
//! ciphertext and the custody service only wrapped keys.

use crate::blob::BlobStore;
use crate::config::SessionConfig;
use crate::directory::KeyDirectory;
use crate::error::{SessionError, SessionResult};
use keyhaven_crypto::{
    open, seal, unwrap_key, wrap_key, ContentKey, CryptoError, IdentityKeyPair, SealedBlob,
    NONCE_SIZE,
};
use keyhaven_custody::{AccessProof, KeyCustody, RecordSummary};
use std::future::Future;
use std::sync::Arc;
use tokio::time::timeout;
use tracing::{info, warn};

/// One identity's envelope session.
///
/// Holds the device-local private key; it is never sent to a collaborator.
/// Sessions are explicit values passed by the caller; there is no
/// process-wide current-user state.
pub struct EnvelopeSession {
    identity: String,
    keypair: IdentityKeyPair,
    custody: Arc<KeyCustody>,
    blobs: Arc<dyn BlobStore>,
    directory: Arc<dyn KeyDirectory>,
    config: SessionConfig,
}

impl EnvelopeSession {
    pub fn new(
        identity: impl Into<String>,
        keypair: IdentityKeyPair,
        custody: Arc<KeyCustody>,
        blobs: Arc<dyn BlobStore>,
        directory: Arc<dyn KeyDirectory>,
        config: SessionConfig,
    ) -> Self {
        Self {
            identity: identity.into(),
            keypair,
            custody,
            blobs,
            directory,
            config,
        }
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Publishes this identity's public key to the directory of record.
    /// Call once when the identity is created.
    pub async fn register(&self) -> SessionResult<()> {
        self.timed(
            "directory publish",
            self.directory.publish(&self.identity, self.keypair.public_key()),
        )
        .await?;
        info!(identity = %self.identity, "published public key");
        Ok(())
    }

    /// Encrypts and uploads a file: fresh content key, seal, wrap under our
    /// own public key, custody store, blob put.
    ///
    /// The custody store runs first and doubles as the reservation of the
    /// file id: a duplicate fails before any blob is written, so an
    /// incumbent owner's ciphertext is never overwritten. If the blob put
    /// fails after the record was created, the keyless record is deleted
    /// (compensating action) and the original error propagates.
    pub async fn upload(
        &self,
        file_id: &str,
        plaintext: &[u8],
        require_step_up: bool,
    ) -> SessionResult<()> {
        let key = ContentKey::generate();
        let sealed = seal(&key, plaintext)?;
        let wrapped = wrap_key(&key, &self.keypair.public)?;
        drop(key);

        self.timed_custody(
            "custody store",
            self.custody.store(
                file_id,
                &self.identity,
                wrapped,
                sealed.nonce.to_vec(),
                require_step_up,
            ),
        )
        .await?;

        let put = self
            .timed("blob put", self.blobs.put(file_id, sealed.ciphertext))
            .await;

        if let Err(err) = put {
            // Compensating action; a key record with no blob behind it is
            // garbage.
            if let Err(cleanup) = self
                .timed_custody(
                    "custody delete",
                    self.custody.delete(file_id, &self.identity),
                )
                .await
            {
                warn!(%file_id, error = %cleanup, "failed to roll back keyless record");
            }
            return Err(err);
        }

        info!(%file_id, owner = %self.identity, "uploaded sealed file");
        Ok(())
    }

    /// Fetches and decrypts a file. `step_up_code` is required when the
    /// file's custody policy demands a second factor.
    ///
    /// Unwrap and open failures surface as `DecryptionFailed` and are never
    /// retried here.
    pub async fn download(
        &self,
        file_id: &str,
        step_up_code: Option<&str>,
    ) -> SessionResult<Vec<u8>> {
        let proof = match step_up_code {
            Some(code) => AccessProof::with_code(code),
            None => AccessProof::none(),
        };

        let released = self
            .timed_custody(
                "custody fetch",
                self.custody.fetch(file_id, &self.identity, &proof),
            )
            .await?;
        let ciphertext = self.timed("blob get", self.blobs.get(file_id)).await?;

        let key = unwrap_key(&released.wrapped_key, &self.keypair.private)
            .map_err(decrypt_error)?;

        let nonce: [u8; NONCE_SIZE] = released
            .nonce
            .as_slice()
            .try_into()
            .map_err(|_| SessionError::DecryptionFailed)?;

        let plaintext =
            open(&key, &SealedBlob { nonce, ciphertext }).map_err(decrypt_error)?;

        info!(%file_id, requester = %self.identity, "downloaded and opened file");
        Ok(plaintext)
    }

    /// Shares a file with `grantee`: unwraps our copy of the content key,
    /// re-wraps it under the grantee's published public key, and records the
    /// grant. The plaintext key lives only inside this call and is zeroized
    /// on every exit path.
    pub async fn grant(
        &self,
        file_id: &str,
        grantee: &str,
        step_up_code: Option<&str>,
    ) -> SessionResult<()> {
        let proof = match step_up_code {
            Some(code) => AccessProof::with_code(code),
            None => AccessProof::none(),
        };

        let released = self
            .timed_custody(
                "custody fetch",
                self.custody.fetch(file_id, &self.identity, &proof),
            )
            .await?;
        let grantee_pk = self
            .timed("directory lookup", self.directory.lookup(grantee))
            .await?;

        let key = unwrap_key(&released.wrapped_key, &self.keypair.private)
            .map_err(decrypt_error)?;
        let rewrapped = wrap_key(&key, &grantee_pk)?;
        drop(key);

        self.timed_custody(
            "custody grant",
            self.custody.grant(file_id, &self.identity, grantee, rewrapped),
        )
        .await?;

        info!(%file_id, owner = %self.identity, %grantee, "granted file access");
        Ok(())
    }

    /// Revokes a previously granted identity's access.
    pub async fn revoke(&self, file_id: &str, grantee: &str) -> SessionResult<()> {
        self.timed_custody(
            "custody revoke",
            self.custody.revoke(file_id, &self.identity, grantee),
        )
        .await?;
        info!(%file_id, owner = %self.identity, %grantee, "revoked file access");
        Ok(())
    }

    /// Deletes a file: custody records first, then the blob, so no
    /// ciphertext is ever left behind without a recoverable key.
    pub async fn delete(&self, file_id: &str) -> SessionResult<()> {
        self.timed_custody(
            "custody delete",
            self.custody.delete(file_id, &self.identity),
        )
        .await?;
        self.timed("blob delete", self.blobs.delete(file_id)).await?;
        info!(%file_id, owner = %self.identity, "deleted file and key records");
        Ok(())
    }

    /// Lists this identity's custodied files (metadata only).
    pub async fn list_files(&self) -> SessionResult<Vec<RecordSummary>> {
        self.timed_custody("custody list", self.custody.list(&self.identity))
            .await
    }

    async fn timed<T>(
        &self,
        op: &'static str,
        fut: impl Future<Output = SessionResult<T>>,
    ) -> SessionResult<T> {
        timeout(self.config.op_timeout(), fut)
            .await
            .map_err(|_| SessionError::Timeout(op))?
    }

    async fn timed_custody<T>(
        &self,
        op: &'static str,
        fut: impl Future<Output = keyhaven_custody::CustodyResult<T>>,
    ) -> SessionResult<T> {
        Ok(timeout(self.config.op_timeout(), fut)
            .await
            .map_err(|_| SessionError::Timeout(op))??)
    }
}

/// Maps unwrap/open failures into the session's single decryption-failure
/// kind; anything else keeps its original kind.
fn decrypt_error(err: CryptoError) -> SessionError {
    match err {
        CryptoError::UnwrapFailed
        | CryptoError::AuthenticationFailed
        | CryptoError::InvalidKeyLength { .. } => SessionError::DecryptionFailed,
        other => SessionError::Crypto(other),
    }
}
