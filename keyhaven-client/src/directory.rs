//! Public-key directory collaborator.
//!
//! The directory of record maps identities to published RSA public keys.
//! Private keys never pass through it.

use crate::error::{SessionError, SessionResult};
use async_trait::async_trait;
use keyhaven_crypto::RsaPublicKey;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Identity -> public-key lookup.
#[async_trait]
pub trait KeyDirectory: Send + Sync {
    async fn publish(&self, identity: &str, public_key: RsaPublicKey) -> SessionResult<()>;
    async fn lookup(&self, identity: &str) -> SessionResult<RsaPublicKey>;
}

/// In-memory directory for tests and single-process use.
#[derive(Clone, Default)]
pub struct MemoryKeyDirectory {
    keys: Arc<RwLock<HashMap<String, RsaPublicKey>>>,
}

impl MemoryKeyDirectory {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyDirectory for MemoryKeyDirectory {
    async fn publish(&self, identity: &str, public_key: RsaPublicKey) -> SessionResult<()> {
        self.keys
            .write()
            .await
            .insert(identity.to_string(), public_key);
        Ok(())
    }

    async fn lookup(&self, identity: &str) -> SessionResult<RsaPublicKey> {
        self.keys
            .read()
            .await
            .get(identity)
            .cloned()
            .ok_or_else(|| SessionError::UnknownIdentity(identity.to_string()))
    }
}
