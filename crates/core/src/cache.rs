//! Typed access to one named cache.

use crate::{codec, GridStore, StoreError};
use conductor_types::EntryKey;
use sbor::{BasicDecode, BasicEncode};
use std::marker::PhantomData;
use std::sync::Arc;

/// A named cache of a [`GridStore`] holding values of type `V`.
///
/// Encodes on the way in and decodes on the way out. Cheap to clone.
pub struct GridCache<V> {
    store: Arc<dyn GridStore>,
    name: &'static str,
    _value: PhantomData<fn() -> V>,
}

impl<V> Clone for GridCache<V> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            name: self.name,
            _value: PhantomData,
        }
    }
}

impl<V> std::fmt::Debug for GridCache<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GridCache").field("name", &self.name).finish()
    }
}

impl<V: BasicEncode + BasicDecode> GridCache<V> {
    pub fn new(store: Arc<dyn GridStore>, name: &'static str) -> Self {
        Self {
            store,
            name,
            _value: PhantomData,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn store(&self) -> &Arc<dyn GridStore> {
        &self.store
    }

    pub fn get(&self, key: &EntryKey) -> Result<Option<V>, StoreError> {
        self.store
            .get(self.name, key)?
            .map(|bytes| codec::decode(&bytes))
            .transpose()
            .map_err(StoreError::from)
    }

    pub fn put(&self, key: &EntryKey, value: &V) -> Result<(), StoreError> {
        let bytes = codec::encode(value)?;
        self.store.put(self.name, key, bytes)
    }

    pub fn contains(&self, key: &EntryKey) -> Result<bool, StoreError> {
        self.store.contains(self.name, key)
    }

    pub fn remove(&self, key: &EntryKey) -> Result<Option<V>, StoreError> {
        self.store
            .remove(self.name, key)?
            .map(|bytes| codec::decode(&bytes))
            .transpose()
            .map_err(StoreError::from)
    }

    /// Run `processor` atomically against the value under `key`.
    ///
    /// The processor sees the decoded value (`None` if absent) and may
    /// replace, modify or clear it. The result is encoded back into the
    /// entry before the entry is released.
    ///
    /// If the stored bytes fail to decode, the processor does not run and the
    /// entry is left as it was.
    pub fn invoke<R>(
        &self,
        key: &EntryKey,
        processor: impl FnOnce(&mut Option<V>) -> R,
    ) -> Result<R, StoreError> {
        let mut processor = Some(processor);
        let mut outcome: Option<Result<R, StoreError>> = None;

        self.store.invoke(self.name, key, &mut |slot| {
            let Some(processor) = processor.take() else {
                return;
            };

            let mut value = match slot.as_deref().map(codec::decode::<V>).transpose() {
                Ok(value) => value,
                Err(e) => {
                    outcome = Some(Err(e.into()));
                    return;
                }
            };

            let result = processor(&mut value);

            match value.as_ref().map(codec::encode::<V>).transpose() {
                Ok(bytes) => {
                    *slot = bytes;
                    outcome = Some(Ok(result));
                }
                Err(e) => outcome = Some(Err(e.into())),
            }
        })?;

        outcome.unwrap_or_else(|| {
            Err(StoreError::Unavailable(format!(
                "entry processor for {} in {} did not run",
                key, self.name
            )))
        })
    }

    /// Decoded values of every entry owned by `partition`.
    pub fn partition_values(&self, partition: u32) -> Result<Vec<(EntryKey, V)>, StoreError> {
        self.store
            .partition_entries(self.name, partition)?
            .into_iter()
            .map(|(key, bytes)| Ok((key, codec::decode(&bytes)?)))
            .collect()
    }

    pub fn partition_count(&self) -> u32 {
        self.store.partition_count()
    }
}
