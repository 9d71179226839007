// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Status-changed notification.
//!
//! Each reader and writer owns a [`StatusCondition`]. The entity raises a
//! [`StatusMask`] bit whenever the matching status changes; callers either
//! poll [`StatusCondition::get_trigger_value`] or block in
//! [`StatusCondition::wait`]. Reading a status clears its bit.

use parking_lot::{Condvar, Mutex};
use std::time::{Duration, Instant};

/// Status mask bits for StatusCondition
///
/// Per DDS v1.4 spec section 2.2.4.1 - Communication Status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusMask(u32);

impl StatusMask {
    /// No status enabled
    pub const NONE: StatusMask = StatusMask(0);

    /// All statuses enabled
    pub const ALL: StatusMask = StatusMask(0xFFFF_FFFF);

    /// Data available to read (DataReader)
    pub const DATA_AVAILABLE: StatusMask = StatusMask(1 << 0);

    /// Sample lost (DataReader)
    pub const SAMPLE_LOST: StatusMask = StatusMask(1 << 1);

    /// Requested deadline missed (DataReader)
    pub const REQUESTED_DEADLINE_MISSED: StatusMask = StatusMask(1 << 4);

    /// Offered deadline missed (DataWriter)
    pub const OFFERED_DEADLINE_MISSED: StatusMask = StatusMask(1 << 8);

    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        StatusMask(bits)
    }

    #[must_use]
    pub const fn bits(&self) -> u32 {
        self.0
    }

    /// Check if this mask contains every bit of `other`
    #[must_use]
    pub const fn contains(&self, other: StatusMask) -> bool {
        (self.0 & other.0) == other.0
    }

    /// Check if this mask shares at least one bit with `other`
    #[must_use]
    pub const fn intersects(&self, other: StatusMask) -> bool {
        (self.0 & other.0) != 0
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }
}

impl std::ops::BitOr for StatusMask {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        StatusMask(self.0 | rhs.0)
    }
}

impl std::ops::BitAnd for StatusMask {
    type Output = Self;
    fn bitand(self, rhs: Self) -> Self {
        StatusMask(self.0 & rhs.0)
    }
}

#[derive(Debug)]
struct ConditionState {
    enabled: StatusMask,
    active: StatusMask,
}

/// Condition triggered by the communication statuses of one entity.
///
/// Trigger value is `active & enabled != 0`. All statuses are enabled by
/// default.
#[derive(Debug)]
pub struct StatusCondition {
    state: Mutex<ConditionState>,
    changed: Condvar,
}

impl StatusCondition {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ConditionState {
                enabled: StatusMask::ALL,
                active: StatusMask::NONE,
            }),
            changed: Condvar::new(),
        }
    }

    /// Set which statuses this condition should monitor
    pub fn set_enabled_statuses(&self, mask: StatusMask) {
        let mut state = self.state.lock();
        state.enabled = mask;
        if state.active.intersects(mask) {
            self.changed.notify_all();
        }
    }

    pub fn get_enabled_statuses(&self) -> StatusMask {
        self.state.lock().enabled
    }

    /// Statuses that changed since they were last read.
    pub fn get_active_statuses(&self) -> StatusMask {
        self.state.lock().active
    }

    pub fn get_trigger_value(&self) -> bool {
        let state = self.state.lock();
        state.active.intersects(state.enabled)
    }

    /// Raise `mask` and wake blocked waiters.
    pub(crate) fn trigger(&self, mask: StatusMask) {
        let mut state = self.state.lock();
        state.active = state.active | mask;
        if state.active.intersects(state.enabled) {
            self.changed.notify_all();
        }
    }

    /// Clear `mask` (status was read).
    pub(crate) fn clear(&self, mask: StatusMask) {
        let mut state = self.state.lock();
        state.active = StatusMask(state.active.0 & !mask.0);
    }

    /// Block until an enabled status is active or `timeout` elapses.
    ///
    /// Returns the active enabled statuses, or `None` on timeout.
    pub fn wait(&self, timeout: Duration) -> Option<StatusMask> {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock();
        loop {
            let triggered = state.active & state.enabled;
            if !triggered.is_empty() {
                return Some(triggered);
            }
            if self.changed.wait_until(&mut state, deadline).timed_out() {
                let triggered = state.active & state.enabled;
                return (!triggered.is_empty()).then_some(triggered);
            }
        }
    }
}

impl Default for StatusCondition {
    fn default() -> Self {
        Self::new()
    }
}
