// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Domain timer scheduler.
//!
//! A priority queue of absolute-time events shared by every reader and
//! writer of a domain. Time comes from an injectable [`Clock`], so tests
//! drive expirations with a `ManualClock` and [`TimerScheduler::fire_due`]
//! while production domains run a dispatcher thread.
//!
//! # Queue discipline
//!
//! ```text
//! heap:  (expiry, seq, id)  min-heap, may hold stale entries
//! armed: id -> (expiry, seq) authoritative
//! ```
//!
//! Rescheduling never mutates a heap entry in place: the timer is re-armed
//! with a fresh sequence number and the old heap entry is skipped when it
//! surfaces. An entry is due once `expiry < now`.
//!
//! Callbacks run outside the queue lock, one at a time. A callback returns
//! its next expiry (or `None` to stay disarmed).

mod dispatcher;

pub use dispatcher::DispatcherHandle;

use crate::error::{Error, Result};
use crate::time::{Clock, Timestamp};
use parking_lot::{Condvar, Mutex};
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;

/// Identifier of a registered timer.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

impl fmt::Debug for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TimerId({})", self.0)
    }
}

/// Callback invoked when a timer expires.
pub trait TimerTarget: Send + Sync {
    /// Handle the expiry scheduled at `scheduled`, observed at `now`.
    ///
    /// Returns the next expiry, or `None` to leave the timer disarmed.
    fn fire(&self, id: TimerId, scheduled: Timestamp, now: Timestamp) -> Option<Timestamp>;
}

#[derive(Debug, PartialEq, Eq)]
struct QueueEntry {
    expiry: Timestamp,
    seq: u64,
    id: TimerId,
}

// Reversed so that BinaryHeap pops the earliest expiry first.
impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .expiry
            .cmp(&self.expiry)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

struct Queue {
    heap: BinaryHeap<QueueEntry>,
    armed: HashMap<TimerId, (Timestamp, u64)>,
    targets: HashMap<TimerId, Arc<dyn TimerTarget>>,
    next_seq: u64,
    executing: Option<TimerId>,
    stopped: bool,
}

impl Queue {
    fn arm(&mut self, id: TimerId, expiry: Timestamp) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.armed.insert(id, (expiry, seq));
        self.heap.push(QueueEntry { expiry, seq, id });

        if self.heap.len() > 2 * self.armed.len() + 64 {
            self.compact();
        }
    }

    fn compact(&mut self) {
        let before = self.heap.len();
        self.heap = self
            .armed
            .iter()
            .map(|(&id, &(expiry, seq))| QueueEntry { expiry, seq, id })
            .collect();
        log::trace!(
            "[scheduler] compacted queue {} -> {} entries",
            before,
            self.heap.len()
        );
    }

    fn is_current(&self, entry: &QueueEntry) -> bool {
        self.armed.get(&entry.id) == Some(&(entry.expiry, entry.seq))
    }

    /// Earliest live expiry, dropping stale heap entries on the way.
    fn peek_expiry(&mut self) -> Option<Timestamp> {
        while let Some(top) = self.heap.peek() {
            if self.is_current(top) {
                return Some(top.expiry);
            }
            self.heap.pop();
        }
        None
    }

    fn pop_due(&mut self, now: Timestamp) -> Option<(TimerId, Timestamp, Arc<dyn TimerTarget>)> {
        loop {
            let expiry = self.peek_expiry()?;
            if expiry >= now {
                return None;
            }
            let entry = self.heap.pop()?;
            self.armed.remove(&entry.id);
            if let Some(target) = self.targets.get(&entry.id) {
                self.executing = Some(entry.id);
                return Some((entry.id, entry.expiry, target.clone()));
            }
        }
    }
}

/// Priority queue of absolute-time callbacks with an injectable clock.
pub struct TimerScheduler {
    clock: Arc<dyn Clock>,
    queue: Mutex<Queue>,
    /// Serializes callback execution between the dispatcher and pollers.
    dispatch: Mutex<()>,
    /// Signalled when the earliest expiry may have changed.
    wakeup: Condvar,
    /// Signalled when a callback finished executing.
    idle: Condvar,
    next_id: AtomicU64,
}

impl TimerScheduler {
    pub fn new(clock: Arc<dyn Clock>) -> Arc<Self> {
        Arc::new(Self {
            clock,
            queue: Mutex::new(Queue {
                heap: BinaryHeap::new(),
                armed: HashMap::new(),
                targets: HashMap::new(),
                next_seq: 0,
                executing: None,
                stopped: false,
            }),
            dispatch: Mutex::new(()),
            wakeup: Condvar::new(),
            idle: Condvar::new(),
            next_id: AtomicU64::new(1),
        })
    }

    /// Current time of the scheduler clock.
    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Register `target` and arm it at `expiry`.
    ///
    /// Fails with `PreconditionNotMet` once the scheduler is stopped.
    pub fn schedule(&self, expiry: Timestamp, target: Arc<dyn TimerTarget>) -> Result<TimerId> {
        let id = TimerId(self.next_id.fetch_add(1, AtomicOrdering::Relaxed));
        let mut queue = self.queue.lock();
        if queue.stopped {
            return Err(Error::PreconditionNotMet("timer scheduler stopped".to_string()));
        }
        queue.targets.insert(id, target);
        queue.arm(id, expiry);
        drop(queue);
        self.wakeup.notify_one();
        Ok(id)
    }

    /// Move an existing timer to `expiry` (cancel-then-reinsert).
    pub fn reschedule(&self, id: TimerId, expiry: Timestamp) -> Result<()> {
        let mut queue = self.queue.lock();
        if queue.stopped {
            return Err(Error::PreconditionNotMet("timer scheduler stopped".to_string()));
        }
        if !queue.targets.contains_key(&id) {
            return Err(Error::NotFound(format!("{:?}", id)));
        }
        queue.arm(id, expiry);
        drop(queue);
        self.wakeup.notify_one();
        Ok(())
    }

    /// Disarm a timer but keep it registered for a later `reschedule`.
    pub fn disarm(&self, id: TimerId) {
        self.queue.lock().armed.remove(&id);
    }

    /// Unregister a timer. A callback already running is not waited for.
    pub fn cancel(&self, id: TimerId) -> bool {
        let mut queue = self.queue.lock();
        queue.armed.remove(&id);
        queue.targets.remove(&id).is_some()
    }

    /// Unregister a timer and wait until its callback is not running.
    ///
    /// Only a callback of this very timer is waited for. Must not be called
    /// from inside a timer callback.
    pub fn cancel_sync(&self, id: TimerId) -> bool {
        let mut queue = self.queue.lock();
        queue.armed.remove(&id);
        let registered = queue.targets.remove(&id).is_some();
        while queue.executing == Some(id) {
            self.idle.wait(&mut queue);
        }
        registered
    }

    pub fn is_armed(&self, id: TimerId) -> bool {
        self.queue.lock().armed.contains_key(&id)
    }

    /// Number of armed timers.
    pub fn armed_count(&self) -> usize {
        self.queue.lock().armed.len()
    }

    /// Earliest armed expiry.
    pub fn next_expiry(&self) -> Option<Timestamp> {
        self.queue.lock().peek_expiry()
    }

    /// Run every callback whose expiry is strictly before the clock.
    ///
    /// Returns the number of callbacks executed. Entries that became due
    /// while a slow callback ran are processed in the same call.
    pub fn fire_due(&self) -> usize {
        let _dispatch = self.dispatch.lock();
        let mut fired = 0;

        loop {
            let now = self.clock.now();
            let Some((id, scheduled, target)) = self.queue.lock().pop_due(now) else {
                break;
            };

            let next = target.fire(id, scheduled, now);
            fired += 1;

            let mut queue = self.queue.lock();
            queue.executing = None;
            if let Some(next) = next {
                // Skip if cancelled or re-armed while the callback ran.
                if queue.targets.contains_key(&id) && !queue.armed.contains_key(&id) {
                    queue.arm(id, next);
                }
            }
            drop(queue);
            self.idle.notify_all();
        }

        if fired > 0 {
            log::trace!("[scheduler] fired {} timer(s)", fired);
        }
        fired
    }

    /// Refuse new timers and wake the dispatcher so it can exit.
    pub fn shutdown(&self) {
        self.queue.lock().stopped = true;
        self.wakeup.notify_all();
    }

    pub fn is_stopped(&self) -> bool {
        self.queue.lock().stopped
    }
}
