//! End-to-end session flows: upload/download, sharing lifecycle, step-up,
//! write-path compensation, tamper surfacing, and collaborator timeouts.

use async_trait::async_trait;
use keyhaven_client::{
    BlobStore, EnvelopeSession, MemoryBlobStore, MemoryKeyDirectory, SessionConfig, SessionError,
};
use keyhaven_crypto::generate_identity_keypair;
use keyhaven_custody::{
    totp, AccessGate, AccessProof, CustodyError, KeyCustody, MemoryRecordStore,
    MemoryStepUpSecrets,
};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

struct World {
    custody: Arc<KeyCustody>,
    blobs: Arc<MemoryBlobStore>,
    directory: Arc<MemoryKeyDirectory>,
    secrets: MemoryStepUpSecrets,
}

impl World {
    fn new() -> Self {
        let secrets = MemoryStepUpSecrets::new();
        let custody = Arc::new(KeyCustody::new(
            Arc::new(MemoryRecordStore::new()),
            AccessGate::new(Arc::new(secrets.clone())),
        ));
        Self {
            custody,
            blobs: Arc::new(MemoryBlobStore::new()),
            directory: Arc::new(MemoryKeyDirectory::new()),
            secrets,
        }
    }

    async fn session(&self, identity: &str) -> EnvelopeSession {
        let keypair = generate_identity_keypair().unwrap();
        let session = EnvelopeSession::new(
            identity,
            keypair,
            self.custody.clone(),
            self.blobs.clone(),
            self.directory.clone(),
            SessionConfig::default(),
        );
        session.register().await.unwrap();
        session
    }
}

fn current_code(secret: &[u8]) -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs();
    totp::code_at(secret, totp::step_of(now))
}

#[tokio::test]
async fn upload_download_roundtrip() {
    let world = World::new();
    let alice = world.session("alice").await;

    alice.upload("f1", b"hello", false).await.unwrap();
    let plaintext = alice.download("f1", None).await.unwrap();

    assert_eq!(plaintext, b"hello");
}

#[tokio::test]
async fn full_sharing_scenario() {
    // alice uploads; bob is denied; alice grants; bob reads; alice revokes;
    // bob is denied again.
    let world = World::new();
    let alice = world.session("alice").await;
    let bob = world.session("bob").await;

    alice.upload("f1", b"hello", false).await.unwrap();

    let err = bob.download("f1", None).await.unwrap_err();
    assert!(matches!(
        err,
        SessionError::Custody(CustodyError::NotFound(_))
    ));

    alice.grant("f1", "bob", None).await.unwrap();
    assert_eq!(bob.download("f1", None).await.unwrap(), b"hello");

    alice.revoke("f1", "bob").await.unwrap();
    let err = bob.download("f1", None).await.unwrap_err();
    assert!(matches!(
        err,
        SessionError::Custody(CustodyError::NotFound(_))
    ));

    // Alice is unaffected throughout
    assert_eq!(alice.download("f1", None).await.unwrap(), b"hello");
}

#[tokio::test]
async fn grant_requires_published_grantee_key() {
    let world = World::new();
    let alice = world.session("alice").await;
    alice.upload("f1", b"hello", false).await.unwrap();

    let err = alice.grant("f1", "nobody", None).await.unwrap_err();
    assert!(matches!(err, SessionError::UnknownIdentity(ref id) if id == "nobody"));
}

#[tokio::test]
async fn step_up_policy_enforced_through_session() {
    let world = World::new();
    let secret = b"alice-totp-secret-01".to_vec();
    world.secrets.register("alice", secret.clone()).await;
    let alice = world.session("alice").await;

    alice.upload("locked", b"sensitive", true).await.unwrap();

    let err = alice.download("locked", None).await.unwrap_err();
    assert!(matches!(
        err,
        SessionError::Custody(CustodyError::StepUpRequired)
    ));

    let code = current_code(&secret);
    assert_eq!(
        alice.download("locked", Some(&code)).await.unwrap(),
        b"sensitive"
    );

    // Same code again inside its step is a replay
    let err = alice.download("locked", Some(&code)).await.unwrap_err();
    assert!(matches!(
        err,
        SessionError::Custody(CustodyError::CodeReplayed)
    ));
}

#[tokio::test]
async fn duplicate_upload_cannot_destroy_the_incumbent_blob() {
    let world = World::new();
    let alice = world.session("alice").await;
    let mallory = world.session("mallory").await;

    mallory.upload("contested", b"first", false).await.unwrap();
    // The id is already reserved; alice's store fails before any blob write
    let err = alice.upload("contested", b"second", false).await.unwrap_err();
    assert!(matches!(
        err,
        SessionError::Custody(CustodyError::DuplicateFile(_))
    ));

    // The incumbent's record and ciphertext both survive the attempt
    assert!(world.blobs.contains("contested").await);
    assert_eq!(mallory.download("contested", None).await.unwrap(), b"first");
}

/// Blob store whose writes always fail, for compensation-path coverage.
struct FailingBlobStore;

#[async_trait]
impl BlobStore for FailingBlobStore {
    async fn put(&self, _file_id: &str, _bytes: Vec<u8>) -> keyhaven_client::SessionResult<()> {
        Err(SessionError::Blob("disk full".to_string()))
    }

    async fn get(&self, file_id: &str) -> keyhaven_client::SessionResult<Vec<u8>> {
        Err(SessionError::BlobMissing(file_id.to_string()))
    }

    async fn delete(&self, _file_id: &str) -> keyhaven_client::SessionResult<()> {
        Ok(())
    }
}

#[tokio::test]
async fn failed_blob_put_rolls_back_the_key_record() {
    let world = World::new();
    let keypair = generate_identity_keypair().unwrap();
    let alice = EnvelopeSession::new(
        "alice",
        keypair,
        world.custody.clone(),
        Arc::new(FailingBlobStore),
        world.directory.clone(),
        SessionConfig::default(),
    );

    let err = alice.upload("f1", b"doomed", false).await.unwrap_err();
    assert!(matches!(err, SessionError::Blob(_)));

    // The reservation was rolled back; no keyless record lingers
    assert!(matches!(
        world.custody.fetch("f1", "alice", &AccessProof::none()).await,
        Err(CustodyError::NotFound(_))
    ));
}

#[tokio::test]
async fn tampered_blob_surfaces_as_decryption_failure() {
    let world = World::new();
    let alice = world.session("alice").await;
    alice.upload("f1", b"integrity", false).await.unwrap();

    let mut bytes = world.blobs.get("f1").await.unwrap();
    bytes[0] ^= 0x01;
    world.blobs.put("f1", bytes).await.unwrap();

    let err = alice.download("f1", None).await.unwrap_err();
    assert!(matches!(err, SessionError::DecryptionFailed));
}

#[tokio::test]
async fn delete_removes_key_records_and_blob() {
    let world = World::new();
    let alice = world.session("alice").await;
    alice.upload("f1", b"bye", false).await.unwrap();

    alice.delete("f1").await.unwrap();

    assert!(!world.blobs.contains("f1").await);
    assert!(matches!(
        alice.download("f1", None).await.unwrap_err(),
        SessionError::Custody(CustodyError::NotFound(_))
    ));
}

#[tokio::test]
async fn list_files_shows_owned_records_only() {
    let world = World::new();
    let alice = world.session("alice").await;
    let bob = world.session("bob").await;

    alice.upload("a1", b"one", false).await.unwrap();
    alice.upload("a2", b"two", true).await.unwrap();
    bob.upload("b1", b"three", false).await.unwrap();

    let mut files = alice.list_files().await.unwrap();
    files.sort_by(|x, y| x.file_id.cmp(&y.file_id));
    assert_eq!(files.len(), 2);
    assert_eq!(files[0].file_id, "a1");
    assert!(!files[0].require_step_up);
    assert_eq!(files[1].file_id, "a2");
    assert!(files[1].require_step_up);
}

/// Blob store that hangs long enough to trip the session timeout.
struct SlowBlobStore {
    inner: MemoryBlobStore,
    delay: Duration,
}

#[async_trait]
impl BlobStore for SlowBlobStore {
    async fn put(&self, file_id: &str, bytes: Vec<u8>) -> keyhaven_client::SessionResult<()> {
        tokio::time::sleep(self.delay).await;
        self.inner.put(file_id, bytes).await
    }

    async fn get(&self, file_id: &str) -> keyhaven_client::SessionResult<Vec<u8>> {
        tokio::time::sleep(self.delay).await;
        self.inner.get(file_id).await
    }

    async fn delete(&self, file_id: &str) -> keyhaven_client::SessionResult<()> {
        tokio::time::sleep(self.delay).await;
        self.inner.delete(file_id).await
    }
}

#[tokio::test]
async fn slow_collaborator_surfaces_timeout() {
    let world = World::new();
    let slow = Arc::new(SlowBlobStore {
        inner: MemoryBlobStore::new(),
        delay: Duration::from_millis(500),
    });
    let keypair = generate_identity_keypair().unwrap();
    let alice = EnvelopeSession::new(
        "alice",
        keypair,
        world.custody.clone(),
        slow,
        world.directory.clone(),
        SessionConfig { op_timeout_ms: 50 },
    );

    let err = alice.upload("f1", b"too slow", false).await.unwrap_err();
    assert!(matches!(err, SessionError::Timeout(_)));
}
