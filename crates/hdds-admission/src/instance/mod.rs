// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Instance key index.
//!
//! Maps a key hash to a stable [`InstanceHandle`] and owns the per-instance
//! state (stored samples, ordering baseline, filter cursor, deadline slot).
//!
//! # Architecture
//!
//! ```text
//! by_key: KeyHash -> InstanceHandle
//!
//! slots:  [0]            [1]            [2] (free)
//!          gen=1          gen=3          gen=2
//!          Arc<Mutex<..>> Arc<Mutex<..>> None
//!
//! InstanceHandle = (generation << 32) | slot
//! ```
//!
//! Each instance sits behind its own mutex so admission on distinct
//! instances never contends. The index lock is only held to resolve or
//! allocate a slot, never while an instance lock is being acquired.
//! Reusing a slot bumps its generation, so a stale handle resolves to
//! nothing instead of aliasing a newer instance.

mod key;

pub use key::{FieldKey, KeyHash, KeylessType, TypeSupport};

use crate::error::{Error, Result};
use crate::guid::GUID;
use crate::history::SampleEntry;
use crate::qos::{OrderBaseline, TimeBasedFilter, TimeBasedFilterChecker};
use crate::scheduler::TimerId;
use crate::time::Timestamp;
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeSet, HashMap, VecDeque};
use std::fmt;
use std::sync::Arc;

/// Handle of an instance within one reader or writer.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceHandle(u64);

impl InstanceHandle {
    /// Handle that never designates an instance.
    pub const NIL: InstanceHandle = InstanceHandle(0);

    fn new(slot: u32, generation: u32) -> Self {
        Self((u64::from(generation) << 32) | u64::from(slot))
    }

    /// Arena slot of the instance.
    pub fn slot(self) -> u32 {
        (self.0 & 0xFFFF_FFFF) as u32
    }

    /// Generation of the slot when the handle was issued.
    pub fn generation(self) -> u32 {
        (self.0 >> 32) as u32
    }

    /// Raw 64-bit value.
    pub fn as_u64(self) -> u64 {
        self.0
    }

    pub fn is_nil(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Debug for InstanceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "InstanceHandle({}@{})", self.slot(), self.generation())
    }
}

impl fmt::Display for InstanceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.slot(), self.generation())
    }
}

/// Lifecycle of an instance as seen by one endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceLifecycle {
    /// At least one writer is registered and the instance is not disposed.
    Alive,
    /// Disposed by a writer.
    Disposed,
    /// Unregistered by every writer that had registered it.
    NoWriters,
}

/// Deadline bookkeeping of one instance.
#[derive(Debug, Clone)]
pub(crate) struct DeadlineSlot {
    pub(crate) timer: Option<TimerId>,
    pub(crate) last_refresh: Timestamp,
    /// Next expiry; authoritative over the scheduler's copy.
    pub(crate) expiry: Timestamp,
    pub(crate) supervising: bool,
}

impl Default for DeadlineSlot {
    fn default() -> Self {
        Self {
            timer: None,
            last_refresh: Timestamp::INVALID,
            expiry: Timestamp::NEVER,
            supervising: false,
        }
    }
}

/// Mutable state of one instance, guarded by the instance mutex.
#[derive(Debug)]
pub struct InstanceState {
    pub(crate) handle: InstanceHandle,
    pub(crate) key: KeyHash,
    pub(crate) lifecycle: InstanceLifecycle,
    /// Stored entries in storage (acceptance) order.
    pub(crate) samples: VecDeque<SampleEntry>,
    /// Number of `Data` entries in `samples`.
    pub(crate) data_count: usize,
    pub(crate) baseline: Option<OrderBaseline>,
    pub(crate) filter: TimeBasedFilterChecker,
    pub(crate) writers: BTreeSet<GUID>,
    pub(crate) deadline: DeadlineSlot,
    /// Set once the instance left the index; late stores become no-ops.
    pub(crate) removed: bool,
}

impl InstanceState {
    fn new(handle: InstanceHandle, key: KeyHash, filter: TimeBasedFilter) -> Self {
        Self {
            handle,
            key,
            lifecycle: InstanceLifecycle::Alive,
            samples: VecDeque::new(),
            data_count: 0,
            baseline: None,
            filter: TimeBasedFilterChecker::new(filter),
            writers: BTreeSet::new(),
            deadline: DeadlineSlot::default(),
            removed: false,
        }
    }

    pub fn handle(&self) -> InstanceHandle {
        self.handle
    }

    pub fn key(&self) -> KeyHash {
        self.key
    }

    pub fn lifecycle(&self) -> InstanceLifecycle {
        self.lifecycle
    }

    /// Number of stored entries (data and markers).
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Current destination-order baseline.
    pub fn baseline(&self) -> Option<OrderBaseline> {
        self.baseline
    }

    /// Whether the instance may leave the index: every writer unregistered
    /// and nothing left to read.
    pub(crate) fn is_reclaimable(&self) -> bool {
        self.lifecycle != InstanceLifecycle::Alive
            && self.writers.is_empty()
            && self.samples.is_empty()
    }
}

/// Shared reference to an instance.
pub(crate) type InstanceRef = Arc<Mutex<InstanceState>>;

struct Slot {
    generation: u32,
    entry: Option<InstanceRef>,
}

#[derive(Default)]
struct IndexInner {
    slots: Vec<Slot>,
    free: Vec<u32>,
    by_key: HashMap<KeyHash, InstanceHandle>,
}

/// Arena-backed key index of one reader or writer.
pub struct InstanceIndex {
    inner: RwLock<IndexInner>,
    max_instances: usize,
    filter: TimeBasedFilter,
}

impl InstanceIndex {
    /// Create an index bounded to `max_instances` live instances.
    pub fn new(max_instances: usize, filter: TimeBasedFilter) -> Self {
        Self {
            inner: RwLock::new(IndexInner::default()),
            max_instances,
            filter,
        }
    }

    /// Handle of the instance with `key`, if it is live.
    pub fn lookup(&self, key: &KeyHash) -> Option<InstanceHandle> {
        self.inner.read().by_key.get(key).copied()
    }

    pub(crate) fn get(&self, handle: InstanceHandle) -> Option<InstanceRef> {
        let inner = self.inner.read();
        let slot = inner.slots.get(handle.slot() as usize)?;
        if slot.generation != handle.generation() {
            return None;
        }
        slot.entry.clone()
    }

    /// Resolve `key`, allocating a new instance on first use.
    ///
    /// Fails with `OutOfResources` once `max_instances` are live.
    pub(crate) fn get_or_create(&self, key: KeyHash) -> Result<InstanceRef> {
        {
            let inner = self.inner.read();
            if let Some(handle) = inner.by_key.get(&key) {
                if let Some(entry) = &inner.slots[handle.slot() as usize].entry {
                    return Ok(entry.clone());
                }
            }
        }

        let mut inner = self.inner.write();
        if let Some(handle) = inner.by_key.get(&key).copied() {
            if let Some(entry) = &inner.slots[handle.slot() as usize].entry {
                return Ok(entry.clone());
            }
        }

        if inner.by_key.len() >= self.max_instances {
            return Err(Error::OutOfResources(format!(
                "max_instances ({}) reached",
                self.max_instances
            )));
        }

        let slot_id = match inner.free.pop() {
            Some(id) => id,
            None => {
                let id = u32::try_from(inner.slots.len()).map_err(|_| {
                    Error::OutOfResources("instance arena exhausted".to_string())
                })?;
                // Generation 0 is reserved so that no handle equals NIL.
                inner.slots.push(Slot {
                    generation: 0,
                    entry: None,
                });
                id
            }
        };

        let slot = &mut inner.slots[slot_id as usize];
        slot.generation = slot.generation.wrapping_add(1).max(1);
        let handle = InstanceHandle::new(slot_id, slot.generation);
        let entry = Arc::new(Mutex::new(InstanceState::new(handle, key, self.filter)));
        slot.entry = Some(entry.clone());
        inner.by_key.insert(key, handle);

        log::trace!("[instance] created {:?} for {:?}", handle, key);
        Ok(entry)
    }

    /// Remove an instance from the index.
    ///
    /// The caller marks the state as removed; this only frees the slot.
    pub(crate) fn remove(&self, handle: InstanceHandle, key: &KeyHash) -> Option<InstanceRef> {
        let mut inner = self.inner.write();
        let slot_id = handle.slot();
        let slot = inner.slots.get_mut(slot_id as usize)?;
        if slot.generation != handle.generation() {
            return None;
        }
        let entry = slot.entry.take()?;
        inner.free.push(slot_id);
        if inner.by_key.get(key) == Some(&handle) {
            inner.by_key.remove(key);
        }
        Some(entry)
    }

    /// Live instances in handle (slot) order.
    pub(crate) fn snapshot(&self) -> Vec<InstanceRef> {
        self.inner
            .read()
            .slots
            .iter()
            .filter_map(|slot| slot.entry.clone())
            .collect()
    }

    /// Remove every instance (owning entity is being deleted).
    pub(crate) fn drain(&self) -> Vec<InstanceRef> {
        let mut inner = self.inner.write();
        inner.by_key.clear();
        inner.free.clear();
        let drained: Vec<InstanceRef> = inner
            .slots
            .iter_mut()
            .filter_map(|slot| slot.entry.take())
            .collect();
        let slot_count = inner.slots.len() as u32;
        inner.free.extend((0..slot_count).rev());
        drained
    }

    /// Number of live instances.
    pub fn len(&self) -> usize {
        self.inner.read().by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::qos::LENGTH_UNLIMITED;

    fn key(n: u8) -> KeyHash {
        KeyHash::from_key_bytes(&[n])
    }

    #[test]
    fn test_handle_encoding() {
        let h = InstanceHandle::new(42, 7);
        assert_eq!(h.slot(), 42);
        assert_eq!(h.generation(), 7);
        assert!(!h.is_nil());
    }

    #[test]
    fn test_get_or_create_is_idempotent() {
        let index = InstanceIndex::new(LENGTH_UNLIMITED, TimeBasedFilter::zero());
        let a = index.get_or_create(key(1)).expect("create");
        let b = index.get_or_create(key(1)).expect("lookup");
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(index.len(), 1);
        assert_eq!(index.lookup(&key(1)), Some(a.lock().handle()));
    }

    #[test]
    fn test_max_instances() {
        let index = InstanceIndex::new(2, TimeBasedFilter::zero());
        index.get_or_create(key(1)).expect("first");
        index.get_or_create(key(2)).expect("second");
        assert!(matches!(
            index.get_or_create(key(3)),
            Err(Error::OutOfResources(_))
        ));
        // Existing keys still resolve.
        assert!(index.get_or_create(key(1)).is_ok());
    }

    #[test]
    fn test_stale_handle_after_reuse() {
        let index = InstanceIndex::new(LENGTH_UNLIMITED, TimeBasedFilter::zero());
        let first = index.get_or_create(key(1)).expect("create");
        let old = first.lock().handle();
        assert!(index.remove(old, &key(1)).is_some());
        assert!(index.lookup(&key(1)).is_none());

        let second = index.get_or_create(key(2)).expect("create");
        let new = second.lock().handle();
        assert_eq!(new.slot(), old.slot());
        assert_ne!(new, old);
        assert!(index.get(old).is_none());
        assert!(index.get(new).is_some());
    }

    #[test]
    fn test_snapshot_in_slot_order() {
        let index = InstanceIndex::new(LENGTH_UNLIMITED, TimeBasedFilter::zero());
        for n in 0..4 {
            index.get_or_create(key(n)).expect("create");
        }
        let slots: Vec<u32> = index
            .snapshot()
            .iter()
            .map(|i| i.lock().handle().slot())
            .collect();
        assert_eq!(slots, vec![0, 1, 2, 3]);

        assert_eq!(index.drain().len(), 4);
        assert!(index.is_empty());
    }
}
