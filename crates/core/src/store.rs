//! The partitioned storage collaborator.

use crate::CodecError;
use conductor_types::EntryKey;
use thiserror::Error;

/// Errors surfaced by a [`GridStore`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Operation run against exactly one entry while it is exclusively held.
///
/// Receives the entry's current bytes (`None` if absent). Leaving `None` in
/// place removes the entry; leaving `Some` stores the bytes.
pub type EntryProcessor<'a> = dyn FnMut(&mut Option<Vec<u8>>) + 'a;

/// A partitioned key-value store with atomic per-entry operations.
///
/// Entries live in named caches. Keys with the same
/// [affinity](EntryKey::affinity) are owned by the same partition.
///
/// # Guarantees
///
/// - **Atomic**: [`invoke`](Self::invoke) runs its processor exactly once
///   while no other operation on the same key can run
/// - **Independent**: operations on different keys may run in parallel and
///   are not ordered relative to each other
/// - **Re-entrant across keys**: a processor may call into the store for a
///   *different* key; callers keep a fixed lock order between caches
pub trait GridStore: Send + Sync {
    /// Read the bytes stored under `key`.
    fn get(&self, cache: &str, key: &EntryKey) -> Result<Option<Vec<u8>>, StoreError>;

    /// Store `value` under `key`, replacing what was there.
    fn put(&self, cache: &str, key: &EntryKey, value: Vec<u8>) -> Result<(), StoreError>;

    /// Remove `key`, returning the bytes it held.
    fn remove(&self, cache: &str, key: &EntryKey) -> Result<Option<Vec<u8>>, StoreError>;

    /// Run `processor` atomically against the entry under `key`.
    fn invoke(
        &self,
        cache: &str,
        key: &EntryKey,
        processor: &mut EntryProcessor<'_>,
    ) -> Result<(), StoreError>;

    /// Number of partitions entries are spread over.
    fn partition_count(&self) -> u32;

    /// Snapshot of the entries of `cache` owned by `partition`.
    fn partition_entries(
        &self,
        cache: &str,
        partition: u32,
    ) -> Result<Vec<(EntryKey, Vec<u8>)>, StoreError>;

    /// Check whether `key` holds a value.
    fn contains(&self, cache: &str, key: &EntryKey) -> Result<bool, StoreError> {
        Ok(self.get(cache, key)?.is_some())
    }
}
