// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! History cache with QoS-driven admission.
//!
//! Every reader and writer owns one cache. A store runs the admission
//! pipeline under the target instance's lock:
//!
//! ```text
//! destination order --reject--> Rejected (baseline untouched)
//!        |
//! time-based filter --suppress-> Rejected (reader data only)
//!        |
//! resource limits ----full-----> Err(OutOfResources)
//!        |
//! commit baseline, append, keep-last eviction, lifecycle, deadline refresh
//! ```
//!
//! Keep-last evicts the oldest data entry by storage order. Dispose and
//! unregister markers are appended next to the data without counting
//! toward the depth; under keep-last any new entry supersedes the older
//! markers, so an instance holds at most `depth` data entries plus one
//! marker.
//!
//! Writer caches only hold a sample while it is being published:
//! [`HistoryCache::release`] drops it once delivery was attempted.

mod sample;

pub use sample::{Sample, SampleEntry, SampleInfo, SampleKind, SampleState};

use crate::deadline::DeadlineSupervisor;
use crate::error::{Error, Result};
use crate::guid::GUID;
use crate::instance::{
    InstanceHandle, InstanceIndex, InstanceLifecycle, InstanceRef, InstanceState, KeyHash,
};
use crate::qos::{Admission, FilterDecision, History, OrderKey, QoS, TimeBasedFilter};
use crate::scheduler::TimerId;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Side of the endpoint owning the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheRole {
    /// DataReader: the time-based filter applies.
    Reader,
    /// DataWriter
    Writer,
}

/// Why a candidate was not stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// Older than the instance baseline (BY_SOURCE_TIMESTAMP).
    DestinationOrder,
    /// Arrived within the minimum separation.
    TimeBasedFilter,
}

/// Result of a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOutcome {
    /// Appended to the instance history.
    ///
    /// `sample_lost` is set when the sample was kept but could not take
    /// part in ordering (invalid source timestamp under BY_SOURCE_TIMESTAMP).
    Stored {
        handle: InstanceHandle,
        sample_lost: bool,
    },
    /// Refused by a policy; never an error.
    Rejected {
        handle: InstanceHandle,
        reason: RejectReason,
    },
    /// Instance was deleted concurrently; nothing happened.
    Dropped,
}

impl StoreOutcome {
    pub fn is_stored(&self) -> bool {
        matches!(self, StoreOutcome::Stored { .. })
    }

    /// Whether the outcome counts as a lost sample for the reader.
    pub fn is_sample_lost(&self) -> bool {
        match self {
            StoreOutcome::Stored { sample_lost, .. } => *sample_lost,
            StoreOutcome::Rejected { .. } => true,
            StoreOutcome::Dropped => false,
        }
    }
}

/// Per-endpoint history cache.
pub struct HistoryCache {
    qos: QoS,
    role: CacheRole,
    index: InstanceIndex,
    /// Stored entries across all instances (data and markers).
    total_samples: AtomicUsize,
    next_sequence: AtomicU64,
    deadline: Option<DeadlineSupervisor>,
}

impl HistoryCache {
    /// Create a cache for an endpoint with a validated `qos`.
    pub fn new(qos: QoS, role: CacheRole, deadline: Option<DeadlineSupervisor>) -> Self {
        let filter = match role {
            CacheRole::Reader => qos.time_based_filter,
            CacheRole::Writer => TimeBasedFilter::zero(),
        };
        Self {
            index: InstanceIndex::new(qos.resource_limits.max_instances, filter),
            qos,
            role,
            total_samples: AtomicUsize::new(0),
            next_sequence: AtomicU64::new(0),
            deadline,
        }
    }

    pub fn qos(&self) -> &QoS {
        &self.qos
    }

    fn tag(&self) -> &'static str {
        match self.role {
            CacheRole::Reader => "reader",
            CacheRole::Writer => "writer",
        }
    }

    /// Run the admission pipeline for `entry` on the instance `key`.
    ///
    /// Policy refusals come back as [`StoreOutcome::Rejected`]; only
    /// resource exhaustion is an error.
    pub fn store(&self, key: KeyHash, mut entry: SampleEntry) -> Result<StoreOutcome> {
        let instance = self.index.get_or_create(key)?;
        let mut guard = instance.lock();
        let state = &mut *guard;
        if state.removed {
            log::debug!("[history] store on deleted {:?} ignored", state.handle);
            return Ok(StoreOutcome::Dropped);
        }
        let handle = state.handle;

        let order = self.qos.destination_order;
        let order_key = OrderKey::new(
            entry.source_timestamp,
            entry.reception_timestamp,
            entry.writer,
        );
        let unordered = order.orders_by_invalid(&order_key);
        if !unordered && order.admit(&order_key, state.baseline.as_ref()) == Admission::Reject {
            log::debug!(
                "[history] {:?} {:?} from {} rejected by destination order (ts={}, baseline={:?})",
                handle,
                entry.kind,
                entry.writer,
                entry.source_timestamp,
                state.baseline
            );
            return Ok(StoreOutcome::Rejected {
                handle,
                reason: RejectReason::DestinationOrder,
            });
        }

        let filtered = self.role == CacheRole::Reader && entry.kind.is_data();
        if filtered && state.filter.check(entry.source_timestamp) == FilterDecision::Suppress {
            log::debug!(
                "[history] {:?} sample at {} suppressed by time-based filter (last={:?})",
                handle,
                entry.source_timestamp,
                state.filter.last_delivered()
            );
            return Ok(StoreOutcome::Rejected {
                handle,
                reason: RejectReason::TimeBasedFilter,
            });
        }

        let is_data = entry.kind.is_data();
        let (evict, stale_markers) = match self.qos.history {
            History::KeepLast(depth) => (
                is_data && state.data_count >= depth as usize,
                state.samples.len() - state.data_count,
            ),
            History::KeepAll => (false, 0),
        };
        if is_data && !evict && state.data_count >= self.qos.resource_limits.max_samples_per_instance
        {
            return Err(Error::OutOfResources(format!(
                "max_samples_per_instance ({}) reached on {:?}",
                self.qos.resource_limits.max_samples_per_instance, handle
            )));
        }
        let freed = usize::from(evict) + stale_markers;
        if freed == 0 {
            self.reserve_sample()?;
        }

        // Commit: nothing below can fail.
        if unordered {
            log::warn!(
                "[history] {:?} sample from {} has an invalid source timestamp, stored unordered",
                handle,
                entry.writer
            );
        } else {
            state.baseline = Some(order.baseline_for(&order_key));
        }
        if filtered {
            state.filter.mark_delivered(entry.source_timestamp);
        }

        if stale_markers > 0 {
            state.samples.retain(|e| e.kind.is_data());
            log::trace!("[history] {:?} dropped {} superseded marker(s)", handle, stale_markers);
        }
        if evict {
            if let Some(old) = state.samples.pop_front() {
                state.data_count -= 1;
                log::trace!("[history] {:?} evicted seq {}", handle, old.sequence);
            }
        }
        if freed > 1 {
            self.total_samples.fetch_sub(freed - 1, Ordering::AcqRel);
        }

        entry.sequence = self.next_sequence.fetch_add(1, Ordering::Relaxed) + 1;
        entry.state = SampleState::NotRead;
        let kind = entry.kind;
        let writer = entry.writer;
        if is_data {
            state.data_count += 1;
        }
        state.samples.push_back(entry);

        self.apply_lifecycle(&instance, state, kind, writer);

        Ok(StoreOutcome::Stored {
            handle,
            sample_lost: unordered,
        })
    }

    fn apply_lifecycle(
        &self,
        instance: &InstanceRef,
        state: &mut InstanceState,
        kind: SampleKind,
        writer: GUID,
    ) {
        match kind {
            SampleKind::Data => {
                state.writers.insert(writer);
                state.lifecycle = InstanceLifecycle::Alive;
                if let Some(deadline) = &self.deadline {
                    deadline.refresh(instance, state);
                }
            }
            SampleKind::Dispose => {
                state.writers.insert(writer);
                state.lifecycle = InstanceLifecycle::Disposed;
                if let Some(deadline) = &self.deadline {
                    deadline.refresh(instance, state);
                }
            }
            SampleKind::Unregister => {
                state.writers.remove(&writer);
                self.on_writer_left(state);
            }
        }
    }

    fn on_writer_left(&self, state: &mut InstanceState) {
        if !state.writers.is_empty() {
            return;
        }
        if state.lifecycle == InstanceLifecycle::Alive {
            state.lifecycle = InstanceLifecycle::NoWriters;
        }
        if let Some(deadline) = &self.deadline {
            deadline.on_unregistered(state);
        }
    }

    fn reserve_sample(&self) -> Result<()> {
        let max = self.qos.resource_limits.max_samples;
        self.total_samples
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n < max).then_some(n + 1)
            })
            .map(|_| ())
            .map_err(|n| Error::OutOfResources(format!("max_samples ({}) reached", n)))
    }

    /// Register `writer` on the instance `key` without storing a sample.
    pub fn register(&self, key: KeyHash, writer: GUID) -> Result<InstanceHandle> {
        let instance = self.index.get_or_create(key)?;
        let mut state = instance.lock();
        state.writers.insert(writer);
        if state.lifecycle == InstanceLifecycle::NoWriters {
            state.lifecycle = InstanceLifecycle::Alive;
        }
        Ok(state.handle)
    }

    /// Forget `writer` on every instance (the writer was deleted).
    pub fn unregister_writer(&self, writer: &GUID) {
        let mut detached = Vec::new();
        for instance in self.index.snapshot() {
            let mut guard = instance.lock();
            let state = &mut *guard;
            if state.removed || !state.writers.remove(writer) {
                continue;
            }
            self.on_writer_left(state);
            if state.is_reclaimable() {
                detached.extend(self.reclaim(state));
            }
        }
        self.cancel_timers(detached);
    }

    /// Drop every stored entry of `handle` once it has been handed to the
    /// readers and the transport (writer caches).
    ///
    /// The ordering baseline, lifecycle and deadline state stay. An
    /// instance left without writers is reclaimed.
    pub fn release(&self, handle: InstanceHandle) {
        let Some(instance) = self.index.get(handle) else {
            return;
        };
        let mut detached = None;
        {
            let mut guard = instance.lock();
            let state = &mut *guard;
            if state.removed {
                return;
            }
            let n = state.samples.len();
            state.samples.clear();
            state.data_count = 0;
            self.total_samples.fetch_sub(n, Ordering::AcqRel);
            if state.is_reclaimable() {
                detached = self.reclaim(state);
            }
        }
        self.cancel_timers(detached.into_iter().collect());
    }

    /// Remove a drained instance from the index. Instance lock held.
    fn reclaim(&self, state: &mut InstanceState) -> Option<TimerId> {
        state.removed = true;
        self.index.remove(state.handle, &state.key);
        log::debug!("[history] {:?} reclaimed", state.handle);
        self.deadline.as_ref().and_then(|d| d.detach(state))
    }

    fn cancel_timers(&self, ids: Vec<TimerId>) {
        if let Some(deadline) = &self.deadline {
            for id in ids {
                deadline.cancel_sync(id);
            }
        }
    }

    /// Peek up to `max_samples` samples, marking them READ.
    pub fn read(&self, max_samples: usize) -> Result<Vec<Sample>> {
        self.collect(None, max_samples, false)
    }

    /// Remove and return up to `max_samples` samples.
    pub fn take(&self, max_samples: usize) -> Result<Vec<Sample>> {
        self.collect(None, max_samples, true)
    }

    /// `read` restricted to one instance.
    pub fn read_instance(&self, handle: InstanceHandle, max_samples: usize) -> Result<Vec<Sample>> {
        self.collect(Some(handle), max_samples, false)
    }

    /// `take` restricted to one instance.
    pub fn take_instance(&self, handle: InstanceHandle, max_samples: usize) -> Result<Vec<Sample>> {
        self.collect(Some(handle), max_samples, true)
    }

    fn collect(
        &self,
        only: Option<InstanceHandle>,
        max_samples: usize,
        take: bool,
    ) -> Result<Vec<Sample>> {
        if max_samples == 0 {
            return Err(Error::PreconditionNotMet(
                "max_samples must be > 0".to_string(),
            ));
        }

        let instances = match only {
            Some(handle) => vec![self
                .index
                .get(handle)
                .ok_or_else(|| Error::NotFound(format!("instance {:?}", handle)))?],
            None => self.index.snapshot(),
        };

        let mut out = Vec::new();
        let mut detached = Vec::new();
        for instance in instances {
            if out.len() >= max_samples {
                break;
            }
            let mut guard = instance.lock();
            let state = &mut *guard;
            if state.removed {
                continue;
            }
            let room = max_samples - out.len();
            let (handle, lifecycle) = (state.handle, state.lifecycle);

            if take {
                let n = room.min(state.samples.len());
                for entry in state.samples.drain(..n) {
                    if entry.kind.is_data() {
                        state.data_count -= 1;
                    }
                    out.push(to_sample(&entry, handle, lifecycle));
                }
                self.total_samples.fetch_sub(n, Ordering::AcqRel);
                if state.is_reclaimable() {
                    detached.extend(self.reclaim(state));
                }
            } else {
                for entry in state.samples.iter_mut().take(room) {
                    out.push(to_sample(entry, handle, lifecycle));
                    entry.state = SampleState::Read;
                }
            }
        }

        self.cancel_timers(detached);
        log::trace!(
            "[{}] {} returned {} sample(s)",
            self.tag(),
            if take { "take" } else { "read" },
            out.len()
        );
        Ok(out)
    }

    /// Remove every instance and cancel their deadline timers.
    ///
    /// Returns once no deadline callback of this cache can still run.
    pub fn clear(&self) {
        let mut detached = Vec::new();
        for instance in self.index.drain() {
            let mut guard = instance.lock();
            let state = &mut *guard;
            state.removed = true;
            self.total_samples.fetch_sub(state.samples.len(), Ordering::AcqRel);
            state.samples.clear();
            state.data_count = 0;
            if let Some(deadline) = &self.deadline {
                detached.extend(deadline.detach(state));
            }
        }
        self.cancel_timers(detached);
    }

    /// Handle of the live instance with `key`.
    pub fn lookup(&self, key: &KeyHash) -> Option<InstanceHandle> {
        self.index.lookup(key)
    }

    /// Lifecycle of a live instance.
    pub fn lifecycle(&self, handle: InstanceHandle) -> Option<InstanceLifecycle> {
        self.index.get(handle).map(|i| i.lock().lifecycle)
    }

    /// Stored entries of a live instance.
    pub fn instance_len(&self, handle: InstanceHandle) -> Option<usize> {
        self.index.get(handle).map(|i| i.lock().len())
    }

    pub fn instance_count(&self) -> usize {
        self.index.len()
    }

    /// Stored entries across all instances.
    pub fn sample_count(&self) -> usize {
        self.total_samples.load(Ordering::Acquire)
    }
}

fn to_sample(entry: &SampleEntry, handle: InstanceHandle, lifecycle: InstanceLifecycle) -> Sample {
    Sample {
        data: entry.payload.clone(),
        info: SampleInfo {
            kind: entry.kind,
            valid_data: entry.kind.is_data(),
            sample_state: entry.state,
            instance_state: lifecycle,
            source_timestamp: entry.source_timestamp,
            reception_timestamp: entry.reception_timestamp,
            writer: entry.writer,
            instance_handle: handle,
        },
    }
}

#[cfg(test)]
mod tests;
