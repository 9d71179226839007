// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! DEADLINE supervision (DDS v1.4 Sec.2.2.3.7).
//!
//! One supervisor per reader or writer with a finite deadline. Each
//! instance gets its own timer on the domain [`TimerScheduler`]:
//!
//! ```text
//! Armed --(refresh)--> Armed          expiry = now + period
//! Armed --(fire)-----> Armed          expiry = expiry + missed * period
//! ```
//!
//! A fire observed at `now` counts every expiry `expiry + k * period`
//! strictly before `now`, so a delayed dispatcher catches up in one burst
//! instead of dropping periods. The next expiry is derived from the
//! missed expiry, not from `now`, so the schedule never drifts.
//!
//! Disposed instances are counted once more and then left alone.
//! Instances unregistered by all writers keep counting unless the domain
//! is configured otherwise.

use crate::instance::{InstanceLifecycle, InstanceRef, InstanceState};
use crate::scheduler::{TimerId, TimerScheduler, TimerTarget};
use crate::status::{StatusCondition, StatusCounter, StatusMask};
use crate::time::Timestamp;
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use std::time::Duration;

/// Which side of the contract is supervised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeadlineSide {
    /// DataReader: REQUESTED_DEADLINE_MISSED
    Requested,
    /// DataWriter: OFFERED_DEADLINE_MISSED
    Offered,
}

impl DeadlineSide {
    fn mask(self) -> StatusMask {
        match self {
            DeadlineSide::Requested => StatusMask::REQUESTED_DEADLINE_MISSED,
            DeadlineSide::Offered => StatusMask::OFFERED_DEADLINE_MISSED,
        }
    }

    fn tag(self) -> &'static str {
        match self {
            DeadlineSide::Requested => "reader",
            DeadlineSide::Offered => "writer",
        }
    }
}

struct DeadlineShared {
    period: Duration,
    side: DeadlineSide,
    missed: Arc<StatusCounter>,
    condition: Arc<StatusCondition>,
    count_unregistered: bool,
}

/// Per-endpoint deadline supervisor.
pub struct DeadlineSupervisor {
    scheduler: Arc<TimerScheduler>,
    shared: Arc<DeadlineShared>,
}

impl DeadlineSupervisor {
    pub fn new(
        scheduler: Arc<TimerScheduler>,
        period: Duration,
        side: DeadlineSide,
        missed: Arc<StatusCounter>,
        condition: Arc<StatusCondition>,
        count_unregistered: bool,
    ) -> Self {
        Self {
            scheduler,
            shared: Arc::new(DeadlineShared {
                period,
                side,
                missed,
                condition,
                count_unregistered,
            }),
        }
    }

    pub fn period(&self) -> Duration {
        self.shared.period
    }

    /// Restart the deadline cycle of an instance at the current time.
    ///
    /// Called with the instance lock held, right after an accepted store.
    pub(crate) fn refresh(&self, instance: &InstanceRef, state: &mut InstanceState) {
        let now = self.scheduler.now();
        let expiry = now.saturating_add(self.shared.period);
        let slot = &mut state.deadline;
        slot.last_refresh = now;
        slot.expiry = expiry;
        slot.supervising = true;

        let rearmed = match slot.timer {
            Some(id) => self.scheduler.reschedule(id, expiry).is_ok(),
            None => false,
        };
        if rearmed {
            return;
        }

        let target = Arc::new(DeadlineTimer {
            instance: Arc::downgrade(instance),
            shared: self.shared.clone(),
        });
        match self.scheduler.schedule(expiry, target) {
            Ok(id) => slot.timer = Some(id),
            Err(e) => {
                log::warn!(
                    "[{}] deadline tracking stopped for {:?}: {}",
                    self.shared.side.tag(),
                    state.handle,
                    e
                );
                state.deadline.timer = None;
                state.deadline.supervising = false;
            }
        }
    }

    /// Every writer unregistered the instance.
    pub(crate) fn on_unregistered(&self, state: &mut InstanceState) {
        if !self.shared.count_unregistered {
            self.suspend(state);
        }
    }

    /// Stop counting for an instance until its next refresh.
    pub(crate) fn suspend(&self, state: &mut InstanceState) {
        state.deadline.supervising = false;
        if let Some(id) = state.deadline.timer {
            self.scheduler.disarm(id);
        }
    }

    /// Detach the timer of an instance leaving the index.
    ///
    /// The returned id must be cancelled once the instance lock is released.
    pub(crate) fn detach(&self, state: &mut InstanceState) -> Option<TimerId> {
        state.deadline.supervising = false;
        state.deadline.timer.take()
    }

    /// Cancel a detached timer, waiting for a running callback of it.
    pub(crate) fn cancel_sync(&self, id: TimerId) {
        self.scheduler.cancel_sync(id);
    }
}

/// Timer callback of one instance.
struct DeadlineTimer {
    instance: Weak<Mutex<InstanceState>>,
    shared: Arc<DeadlineShared>,
}

/// Number of expiries `expiry + k * period` (k >= 0) strictly before `now`.
fn missed_periods(expiry: Timestamp, now: Timestamp, period: Duration) -> i128 {
    let elapsed = i128::from(now.as_nanos()) - i128::from(expiry.as_nanos());
    if elapsed <= 0 {
        return 0;
    }
    let period = i128::try_from(period.as_nanos()).unwrap_or(i128::MAX).max(1);
    elapsed / period + i128::from(elapsed % period != 0)
}

impl TimerTarget for DeadlineTimer {
    fn fire(&self, id: TimerId, _scheduled: Timestamp, now: Timestamp) -> Option<Timestamp> {
        let instance = self.instance.upgrade()?;
        let mut state = instance.lock();
        if state.removed || state.deadline.timer != Some(id) || !state.deadline.supervising {
            return None;
        }

        let expiry = state.deadline.expiry;
        let missed = missed_periods(expiry, now, self.shared.period);
        if missed == 0 {
            // Refreshed while this fire was queued.
            return Some(expiry);
        }

        let tag = self.shared.side.tag();
        let handle = state.handle;
        match state.lifecycle {
            InstanceLifecycle::Disposed => {
                self.count(1, &state);
                state.deadline.supervising = false;
                log::debug!("[{}] deadline missed on disposed {:?}, supervision stopped", tag, handle);
                None
            }
            InstanceLifecycle::NoWriters if !self.shared.count_unregistered => {
                state.deadline.supervising = false;
                None
            }
            _ => {
                let counted = u32::try_from(missed).unwrap_or(u32::MAX);
                self.count(counted, &state);

                let period = i128::try_from(self.shared.period.as_nanos()).unwrap_or(i128::MAX);
                let next = i128::from(expiry.as_nanos()).saturating_add(missed.saturating_mul(period));
                let next = Timestamp::from_nanos(i64::try_from(next).unwrap_or(i64::MAX));
                state.deadline.expiry = next;

                log::debug!(
                    "[{}] deadline missed x{} on {:?} (last refresh {}, next expiry {})",
                    tag,
                    counted,
                    handle,
                    state.deadline.last_refresh,
                    next
                );
                Some(next)
            }
        }
    }
}

impl DeadlineTimer {
    // Runs under the instance lock so a concurrent delete either sees the
    // count or suppresses it.
    fn count(&self, n: u32, state: &InstanceState) {
        self.shared.missed.increment(n, Some(state.handle));
        self.shared.condition.trigger(self.shared.side.mask());
    }
}
