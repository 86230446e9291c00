//! Record persistence seam.
//!
//! The concrete storage engine (embedded DB, network KV, ...) is an external
//! collaborator; custody only needs atomic insert-if-absent, reads that never
//! observe partial writes, and per-file serialized updates. The in-memory
//! implementation here is the reference for those semantics and backs the
//! test suite.

use crate::error::{CustodyError, CustodyResult};
use crate::record::WrappedKeyRecord;
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;

/// Mutation applied to a record under the store's per-file serialization.
pub type RecordMutation = Box<dyn FnOnce(&mut WrappedKeyRecord) -> CustodyResult<()> + Send>;

/// Durable mapping from file id to wrapped-key record.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Inserts a record iff no record exists for its file id.
    ///
    /// Atomic: concurrent inserts for the same id see exactly one winner,
    /// the rest fail `DuplicateFile`. A record is either fully visible to
    /// subsequent `get` calls or not at all.
    async fn insert_new(&self, record: WrappedKeyRecord) -> CustodyResult<()>;

    /// Fetches a record by file id.
    async fn get(&self, file_id: &str) -> CustodyResult<Option<WrappedKeyRecord>>;

    /// Applies a mutation to an existing record, serialized per file so
    /// concurrent grant/revoke never lose updates. Fails `NotFound` if the
    /// record does not exist.
    async fn update(&self, file_id: &str, mutation: RecordMutation) -> CustodyResult<()>;

    /// Removes a record. Returns whether one existed.
    async fn remove(&self, file_id: &str) -> CustodyResult<bool>;

    /// All records owned by `owner`.
    async fn list_by_owner(&self, owner: &str) -> CustodyResult<Vec<WrappedKeyRecord>>;
}

/// In-memory record store with per-record locking.
///
/// Built on a sharded map rather than one table-wide lock: stores for
/// different files proceed independently, while the entry API makes
/// insert-if-absent atomic and `update` exclusive per file.
#[derive(Clone, Default)]
pub struct MemoryRecordStore {
    records: Arc<DashMap<String, WrappedKeyRecord>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records held. Test support.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn insert_new(&self, record: WrappedKeyRecord) -> CustodyResult<()> {
        match self.records.entry(record.file_id.clone()) {
            Entry::Occupied(_) => Err(CustodyError::DuplicateFile(record.file_id)),
            Entry::Vacant(slot) => {
                slot.insert(record);
                Ok(())
            }
        }
    }

    async fn get(&self, file_id: &str) -> CustodyResult<Option<WrappedKeyRecord>> {
        Ok(self.records.get(file_id).map(|r| r.value().clone()))
    }

    async fn update(&self, file_id: &str, mutation: RecordMutation) -> CustodyResult<()> {
        let mut record = self
            .records
            .get_mut(file_id)
            .ok_or_else(|| CustodyError::NotFound(file_id.to_string()))?;
        mutation(record.value_mut())
    }

    async fn remove(&self, file_id: &str) -> CustodyResult<bool> {
        Ok(self.records.remove(file_id).is_some())
    }

    async fn list_by_owner(&self, owner: &str) -> CustodyResult<Vec<WrappedKeyRecord>> {
        Ok(self
            .records
            .iter()
            .filter(|r| r.owner == owner)
            .map(|r| r.value().clone())
            .collect())
    }
}
