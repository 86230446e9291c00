//! Opaque blob-store collaborator.
//!
//! The store holds sealed ciphertext addressed by file id; naming and
//! durability are its concern. It never sees key material.

use crate::error::{SessionError, SessionResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Byte storage keyed by file id.
///
/// Implementations report a missing entry as [`SessionError::BlobMissing`]
/// and any backend failure as [`SessionError::Blob`].
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn put(&self, file_id: &str, bytes: Vec<u8>) -> SessionResult<()>;
    async fn get(&self, file_id: &str) -> SessionResult<Vec<u8>>;
    async fn delete(&self, file_id: &str) -> SessionResult<()>;
}

/// In-memory blob store for tests and single-process use.
#[derive(Clone, Default)]
pub struct MemoryBlobStore {
    blobs: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a blob exists. Test support.
    pub async fn contains(&self, file_id: &str) -> bool {
        self.blobs.read().await.contains_key(file_id)
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, file_id: &str, bytes: Vec<u8>) -> SessionResult<()> {
        self.blobs.write().await.insert(file_id.to_string(), bytes);
        Ok(())
    }

    async fn get(&self, file_id: &str) -> SessionResult<Vec<u8>> {
        self.blobs
            .read()
            .await
            .get(file_id)
            .cloned()
            .ok_or_else(|| SessionError::BlobMissing(file_id.to_string()))
    }

    async fn delete(&self, file_id: &str) -> SessionResult<()> {
        self.blobs.write().await.remove(file_id);
        Ok(())
    }
}
