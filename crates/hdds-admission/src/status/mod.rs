// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Communication status counters.
//!
//! A [`StatusCounter`] keeps the monotonic `total_count`, the
//! `total_count_change` accumulated since the last read and the instance
//! responsible for the last change. Increments and snapshot-and-reset take
//! the same lock, so an increment racing a status read lands either in the
//! returned delta or in the next one, never in neither.

mod condition;

pub use condition::{StatusCondition, StatusMask};

use crate::instance::InstanceHandle;
use parking_lot::Mutex;

#[derive(Debug, Default, Clone, Copy)]
struct CounterState {
    total_count: u32,
    total_count_change: i32,
    last_instance_handle: Option<InstanceHandle>,
}

/// Cumulative counter with delta-since-last-read semantics.
#[derive(Debug, Default)]
pub struct StatusCounter {
    state: Mutex<CounterState>,
}

impl StatusCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `n` events, optionally attributed to `handle`.
    pub fn increment(&self, n: u32, handle: Option<InstanceHandle>) {
        if n == 0 {
            return;
        }
        let mut state = self.state.lock();
        state.total_count = state.total_count.saturating_add(n);
        state.total_count_change = state
            .total_count_change
            .saturating_add(i32::try_from(n).unwrap_or(i32::MAX));
        if handle.is_some() {
            state.last_instance_handle = handle;
        }
    }

    /// Current values; resets the change delta to zero.
    fn snapshot_and_reset(&self) -> CounterState {
        let mut state = self.state.lock();
        let snapshot = *state;
        state.total_count_change = 0;
        snapshot
    }

    /// Cumulative count without touching the delta.
    pub fn total_count(&self) -> u32 {
        self.state.lock().total_count
    }

    pub fn requested_deadline_missed(&self) -> RequestedDeadlineMissedStatus {
        let s = self.snapshot_and_reset();
        RequestedDeadlineMissedStatus {
            total_count: s.total_count,
            total_count_change: s.total_count_change,
            last_instance_handle: s.last_instance_handle,
        }
    }

    pub fn offered_deadline_missed(&self) -> OfferedDeadlineMissedStatus {
        let s = self.snapshot_and_reset();
        OfferedDeadlineMissedStatus {
            total_count: s.total_count,
            total_count_change: s.total_count_change,
            last_instance_handle: s.last_instance_handle,
        }
    }

    pub fn sample_lost(&self) -> SampleLostStatus {
        let s = self.snapshot_and_reset();
        SampleLostStatus {
            total_count: s.total_count,
            total_count_change: s.total_count_change,
        }
    }
}

/// Status information for requested (reader-side) deadline missed events.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequestedDeadlineMissedStatus {
    /// Total cumulative count of missed deadlines.
    pub total_count: u32,
    /// Change in total_count since the status was last read.
    pub total_count_change: i32,
    /// Handle of the instance that missed the deadline most recently.
    pub last_instance_handle: Option<InstanceHandle>,
}

/// Status information for offered (writer-side) deadline missed events.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OfferedDeadlineMissedStatus {
    /// Total cumulative count of missed deadlines.
    pub total_count: u32,
    /// Change in total_count since the status was last read.
    pub total_count_change: i32,
    /// Handle of the instance that missed the deadline most recently.
    pub last_instance_handle: Option<InstanceHandle>,
}

/// Status information for sample lost events.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SampleLostStatus {
    /// Total cumulative count of lost samples.
    pub total_count: u32,
    /// Change in total_count since the status was last read.
    pub total_count_change: i32,
}
