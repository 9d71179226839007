// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Timestamps and injectable clocks.
//!
//! Source timestamps, reception timestamps and timer expiries all use the
//! same [`Timestamp`] representation (signed nanoseconds since the UNIX
//! epoch). A dedicated [`Timestamp::INVALID`] value models the transport's
//! "invalid timestamp" flag.
//!
//! Every component that needs "now" asks a [`Clock`]. Production code uses
//! [`SystemClock`]; tests inject a [`ManualClock`] and advance it explicitly
//! so deadline expirations become fully deterministic.

use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Point in time, nanoseconds since the UNIX epoch.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Marker for samples whose source timestamp is not usable.
    pub const INVALID: Timestamp = Timestamp(i64::MIN);

    /// The UNIX epoch.
    pub const ZERO: Timestamp = Timestamp(0);

    /// Latest representable timestamp (used as "never").
    pub const NEVER: Timestamp = Timestamp(i64::MAX);

    /// Create a timestamp from nanoseconds since the epoch.
    #[must_use]
    pub const fn from_nanos(ns: i64) -> Self {
        Self(ns)
    }

    /// Create a timestamp from milliseconds since the epoch.
    #[must_use]
    pub const fn from_millis(ms: i64) -> Self {
        Self(ms.saturating_mul(1_000_000))
    }

    /// Create a timestamp from seconds since the epoch.
    #[must_use]
    pub const fn from_secs(secs: i64) -> Self {
        Self(secs.saturating_mul(1_000_000_000))
    }

    /// Raw nanoseconds since the epoch.
    #[must_use]
    pub const fn as_nanos(self) -> i64 {
        self.0
    }

    /// Whether this timestamp carries a usable value.
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 != i64::MIN
    }

    /// Add a duration, saturating at [`Timestamp::NEVER`].
    ///
    /// Infinite deadline periods (`Duration::from_secs(u64::MAX)`) map to
    /// `NEVER` instead of wrapping.
    #[must_use]
    pub fn saturating_add(self, d: Duration) -> Self {
        let ns = i64::try_from(d.as_nanos()).unwrap_or(i64::MAX);
        Self(self.0.saturating_add(ns))
    }

    /// Duration elapsed since `earlier`, or zero if `earlier` is later.
    #[must_use]
    pub fn saturating_since(self, earlier: Timestamp) -> Duration {
        let delta = self.0.saturating_sub(earlier.0);
        if delta <= 0 {
            Duration::ZERO
        } else {
            Duration::from_nanos(delta as u64)
        }
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "Timestamp({}ns)", self.0)
        } else {
            write!(f, "Timestamp(INVALID)")
        }
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.is_valid() {
            return write!(f, "invalid");
        }
        let secs = self.0.div_euclid(1_000_000_000);
        let nanos = self.0.rem_euclid(1_000_000_000);
        write!(f, "{}.{:09}", secs, nanos)
    }
}

/// Time source used by the scheduler, readers and writers.
pub trait Clock: Send + Sync {
    /// Current time.
    fn now(&self) -> Timestamp;
}

/// Wall clock backed by `SystemTime`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        match SystemTime::now().duration_since(UNIX_EPOCH) {
            Ok(d) => Timestamp(i64::try_from(d.as_nanos()).unwrap_or(i64::MAX)),
            // Clock set before 1970: report the epoch rather than a bogus value.
            Err(_) => Timestamp::ZERO,
        }
    }
}

/// Manually driven clock for deterministic tests.
///
/// # Example
///
/// ```
/// use hdds_admission::time::{Clock, ManualClock, Timestamp};
/// use std::time::Duration;
///
/// let clock = ManualClock::new(Timestamp::ZERO);
/// clock.advance(Duration::from_millis(75));
/// assert_eq!(clock.now(), Timestamp::from_millis(75));
/// ```
#[derive(Debug)]
pub struct ManualClock {
    now_ns: AtomicI64,
}

impl ManualClock {
    /// Create a clock frozen at `start`.
    #[must_use]
    pub fn new(start: Timestamp) -> Self {
        Self {
            now_ns: AtomicI64::new(start.as_nanos()),
        }
    }

    /// Jump to an absolute time.
    pub fn set(&self, t: Timestamp) {
        self.now_ns.store(t.as_nanos(), Ordering::Release);
    }

    /// Move the clock forward.
    pub fn advance(&self, d: Duration) {
        let ns = i64::try_from(d.as_nanos()).unwrap_or(i64::MAX);
        let _ = self
            .now_ns
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |cur| {
                Some(cur.saturating_add(ns))
            });
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(Timestamp::ZERO)
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        Timestamp(self.now_ns.load(Ordering::Acquire))
    }
}
