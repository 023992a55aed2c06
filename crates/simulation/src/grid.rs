//! In-memory partitioned store.

use crate::SimGridConfig;
use conductor_core::{EntryProcessor, GridStore, StoreError};
use conductor_types::EntryKey;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Compute which partition owns an affinity.
pub fn partition_for(affinity: &str, partition_count: u32) -> u32 {
    let hash = blake3::hash(affinity.as_bytes());
    let bytes = hash.as_bytes();
    let hash_value = u64::from_le_bytes([
        bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
    ]);
    (hash_value % u64::from(partition_count.max(1))) as u32
}

/// A single entry. `None` means absent.
type Slot = Arc<Mutex<Option<Vec<u8>>>>;

#[derive(Default)]
struct Partition {
    caches: HashMap<String, HashMap<EntryKey, Slot>>,
}

/// A [`GridStore`] held in process memory.
///
/// Every entry has its own lock, taken for the whole of an
/// [`invoke`](GridStore::invoke). Partition maps are only locked long enough
/// to find, create or drop an entry, so a processor may operate on other
/// keys. An entry left empty is dropped from its partition once no
/// operation holds it.
///
/// Placement is deterministic: the same key always lands in the same
/// partition for a given partition count.
pub struct SimGrid {
    config: SimGridConfig,
    partitions: Vec<RwLock<Partition>>,
    unavailable: AtomicBool,
}

impl SimGrid {
    pub fn new(config: SimGridConfig) -> Self {
        let partition_count = config.partition_count.max(1);
        debug!(partitions = partition_count, "Created simulated grid");
        Self {
            partitions: (0..partition_count)
                .map(|_| RwLock::new(Partition::default()))
                .collect(),
            config,
            unavailable: AtomicBool::new(false),
        }
    }

    /// Make every following operation fail with
    /// [`StoreError::Unavailable`] until called again with `false`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn config(&self) -> &SimGridConfig {
        &self.config
    }

    /// Partition owning `key`.
    pub fn partition_of(&self, key: &EntryKey) -> u32 {
        partition_for(key.affinity(), self.partition_count())
    }

    /// Number of present entries in `cache`.
    pub fn entry_count(&self, cache: &str) -> usize {
        (0..self.partition_count())
            .filter_map(|partition| self.partition_entries(cache, partition).ok())
            .map(|entries| entries.len())
            .sum()
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("simulated outage".to_string()));
        }
        Ok(())
    }

    fn partition(&self, key: &EntryKey) -> &RwLock<Partition> {
        &self.partitions[self.partition_of(key) as usize]
    }

    fn find_slot(&self, cache: &str, key: &EntryKey) -> Option<Slot> {
        self.partition(key)
            .read()
            .caches
            .get(cache)
            .and_then(|entries| entries.get(key))
            .cloned()
    }

    fn slot(&self, cache: &str, key: &EntryKey) -> Slot {
        if let Some(slot) = self.find_slot(cache, key) {
            return slot;
        }
        let mut partition = self.partition(key).write();
        Arc::clone(
            partition
                .caches
                .entry(cache.to_string())
                .or_default()
                .entry(key.clone())
                .or_default(),
        )
    }

    /// Drop the slot of `key` if it is empty and no operation holds it.
    fn prune(&self, cache: &str, key: &EntryKey) {
        let mut partition = self.partition(key).write();
        let Some(entries) = partition.caches.get_mut(cache) else {
            return;
        };
        // Clones are only taken under the partition lock, so a count of one
        // cannot grow while it is held
        let unused = entries
            .get(key)
            .is_some_and(|slot| Arc::strong_count(slot) == 1 && slot.lock().is_none());
        if !unused {
            return;
        }
        entries.remove(key);
        if entries.is_empty() {
            partition.caches.remove(cache);
        }
    }

    #[cfg(test)]
    fn slot_count(&self) -> usize {
        self.partitions
            .iter()
            .map(|partition| {
                partition
                    .read()
                    .caches
                    .values()
                    .map(HashMap::len)
                    .sum::<usize>()
            })
            .sum()
    }
}

impl Default for SimGrid {
    fn default() -> Self {
        Self::new(SimGridConfig::default())
    }
}

impl std::fmt::Debug for SimGrid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimGrid")
            .field("partitions", &self.partitions.len())
            .finish()
    }
}

impl GridStore for SimGrid {
    fn get(&self, cache: &str, key: &EntryKey) -> Result<Option<Vec<u8>>, StoreError> {
        self.check_available()?;
        Ok(self
            .find_slot(cache, key)
            .and_then(|slot| slot.lock().clone()))
    }

    fn put(&self, cache: &str, key: &EntryKey, value: Vec<u8>) -> Result<(), StoreError> {
        self.check_available()?;
        *self.slot(cache, key).lock() = Some(value);
        Ok(())
    }

    fn remove(&self, cache: &str, key: &EntryKey) -> Result<Option<Vec<u8>>, StoreError> {
        self.check_available()?;
        let Some(slot) = self.find_slot(cache, key) else {
            return Ok(None);
        };
        let removed = slot.lock().take();
        drop(slot);
        self.prune(cache, key);
        Ok(removed)
    }

    fn invoke(
        &self,
        cache: &str,
        key: &EntryKey,
        processor: &mut EntryProcessor<'_>,
    ) -> Result<(), StoreError> {
        self.check_available()?;
        let slot = self.slot(cache, key);
        let vacant = {
            let mut entry = slot.lock();
            processor(&mut *entry);
            entry.is_none()
        };
        drop(slot);
        if vacant {
            self.prune(cache, key);
        }
        Ok(())
    }

    fn partition_count(&self) -> u32 {
        self.partitions.len() as u32
    }

    fn partition_entries(
        &self,
        cache: &str,
        partition: u32,
    ) -> Result<Vec<(EntryKey, Vec<u8>)>, StoreError> {
        self.check_available()?;
        let slots: Vec<(EntryKey, Slot)> = self
            .partitions
            .get(partition as usize)
            .map(|partition| {
                partition
                    .read()
                    .caches
                    .get(cache)
                    .map(|entries| {
                        entries
                            .iter()
                            .map(|(key, slot)| (key.clone(), Arc::clone(slot)))
                            .collect()
                    })
                    .unwrap_or_default()
            })
            .unwrap_or_default();

        let mut entries: Vec<(EntryKey, Vec<u8>)> = slots
            .into_iter()
            .filter_map(|(key, slot)| {
                let value = slot.lock().clone()?;
                Some((key, value))
            })
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conductor_core::GridCache;

    fn grid() -> Arc<SimGrid> {
        Arc::new(SimGrid::new(SimGridConfig::default().with_partitions(4)))
    }

    #[test]
    fn test_partition_placement_is_deterministic() {
        let a = partition_for("orders", 31);
        assert_eq!(a, partition_for("orders", 31));
        assert!(a < 31);
        assert_eq!(partition_for("orders", 1), 0);
    }

    #[test]
    fn test_associated_keys_share_partition() {
        let grid = grid();
        let owner = EntryKey::new("orders");
        for n in 0..20 {
            let associated = EntryKey::associated(format!("orders#0.{n}"), "orders");
            assert_eq!(grid.partition_of(&associated), grid.partition_of(&owner));
        }
    }

    #[test]
    fn test_get_put_remove() {
        let grid = grid();
        let key = EntryKey::new("a");

        assert_eq!(grid.get("c", &key), Ok(None));
        grid.put("c", &key, vec![1, 2]).unwrap();
        assert_eq!(grid.get("c", &key), Ok(Some(vec![1, 2])));
        assert_eq!(grid.get("other", &key), Ok(None));
        assert_eq!(grid.remove("c", &key), Ok(Some(vec![1, 2])));
        assert_eq!(grid.contains("c", &key), Ok(false));
    }

    #[test]
    fn test_invoke_can_touch_other_keys() {
        let grid = grid();
        let cache: GridCache<u64> = GridCache::new(grid.clone(), "counters");
        let outer = EntryKey::new("outer");
        let inner = EntryKey::new("inner");

        cache
            .invoke(&outer, |value| {
                *value = Some(1);
                cache.put(&inner, &2).unwrap();
            })
            .unwrap();

        assert_eq!(cache.get(&outer), Ok(Some(1)));
        assert_eq!(cache.get(&inner), Ok(Some(2)));
    }

    #[test]
    fn test_invoke_is_atomic_per_key() {
        let grid = grid();
        let cache: GridCache<u64> = GridCache::new(grid.clone(), "counters");
        let key = EntryKey::new("hits");

        std::thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| {
                    for _ in 0..250 {
                        cache
                            .invoke(&key, |value| *value = Some(value.unwrap_or(0) + 1))
                            .unwrap();
                    }
                });
            }
        });

        assert_eq!(cache.get(&key), Ok(Some(2_000)));
    }

    #[test]
    fn test_partition_entries_cover_every_key() {
        let grid = grid();
        for n in 0..50 {
            grid.put("c", &EntryKey::new(format!("k{n}")), vec![n]).unwrap();
        }
        grid.remove("c", &EntryKey::new("k7")).unwrap();

        let total: usize = (0..grid.partition_count())
            .map(|p| grid.partition_entries("c", p).unwrap().len())
            .sum();
        assert_eq!(total, 49);
        assert_eq!(grid.entry_count("c"), 49);
    }

    #[test]
    fn test_emptied_entries_are_dropped() {
        let grid = grid();
        let cache: GridCache<u64> = GridCache::new(grid.clone(), "counters");

        for n in 0..10 {
            cache.put(&EntryKey::new(format!("k{n}")), &n).unwrap();
        }
        assert_eq!(grid.slot_count(), 10);

        for n in 0..5 {
            assert_eq!(cache.remove(&EntryKey::new(format!("k{n}"))), Ok(Some(n)));
        }
        assert_eq!(grid.slot_count(), 5);

        cache
            .invoke(&EntryKey::new("k5"), |value| *value = None)
            .unwrap();
        cache
            .invoke(&EntryKey::new("never-stored"), |value| value.is_some())
            .unwrap();
        assert_eq!(grid.slot_count(), 4);
        assert_eq!(grid.entry_count("counters"), 4);
    }

    #[test]
    fn test_removal_during_invoke_keeps_the_new_value() {
        let grid = grid();
        let cache: GridCache<u64> = GridCache::new(grid.clone(), "counters");
        let key = EntryKey::new("k");
        cache.put(&key, &1).unwrap();

        cache
            .invoke(&key, |value| {
                *value = None;
                assert_eq!(cache.remove(&EntryKey::new("other")), Ok(None));
                *value = Some(2);
            })
            .unwrap();
        assert_eq!(cache.get(&key), Ok(Some(2)));
        assert_eq!(grid.slot_count(), 1);
    }

    #[test]
    fn test_outage() {
        let grid = grid();
        grid.set_unavailable(true);
        assert!(matches!(
            grid.get("c", &EntryKey::new("a")),
            Err(StoreError::Unavailable(_))
        ));
        grid.set_unavailable(false);
        assert_eq!(grid.get("c", &EntryKey::new("a")), Ok(None));
    }
}
