// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! DEADLINE QoS policy (DDS v1.4 Sec.2.2.3.7)
//!
//! Specifies the maximum interval between two samples of the same instance.
//! When no fresh sample is accepted within the period, the endpoint raises a
//! deadline-missed event (requested on readers, offered on writers).
//!
//! # QoS Compatibility (Request vs Offered)
//!
//! **Rule:** Writer offers <= Reader requests (RxO semantics)
//!
//! Example:
//! - Writer offers 100ms deadline -> Reader requests 200ms -> Compatible \[OK\]
//! - Writer offers 200ms deadline -> Reader requests 100ms -> Incompatible \[X\]
//!
//! # Examples
//!
//! ```
//! use hdds_admission::qos::Deadline;
//! use std::time::Duration;
//!
//! let writer_deadline = Deadline::new(Duration::from_millis(100));
//! let reader_deadline = Deadline::new(Duration::from_millis(200));
//! assert!(writer_deadline.is_compatible_with(&reader_deadline));
//! ```

use crate::time::Timestamp;
use std::time::Duration;

/// DEADLINE QoS policy
///
/// Default: Infinite (no deadline enforcement).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    /// Maximum time between samples
    pub period: Duration,
}

impl Default for Deadline {
    /// Default: Infinite deadline (no enforcement)
    fn default() -> Self {
        Self {
            period: Duration::from_secs(u64::MAX),
        }
    }
}

impl Deadline {
    /// Create new deadline policy with specified period
    pub fn new(period: Duration) -> Self {
        Self { period }
    }

    /// Create deadline with infinite period (no enforcement)
    pub fn infinite() -> Self {
        Self::default()
    }

    /// Check if deadline is infinite (no enforcement)
    pub fn is_infinite(&self) -> bool {
        self.period == Duration::from_secs(u64::MAX)
    }

    /// Create deadline from milliseconds
    ///
    /// # Examples
    ///
    /// ```
    /// use hdds_admission::qos::Deadline;
    ///
    /// let deadline = Deadline::from_millis(50);
    /// assert_eq!(deadline.period.as_millis(), 50);
    /// ```
    pub fn from_millis(ms: u64) -> Self {
        Self {
            period: Duration::from_millis(ms),
        }
    }

    /// Create deadline from seconds
    pub fn from_secs(secs: u64) -> Self {
        Self {
            period: Duration::from_secs(secs),
        }
    }

    /// Expiry of a deadline cycle that started at `last_refresh`.
    ///
    /// Infinite deadlines never expire ([`Timestamp::NEVER`]).
    pub fn expiry_after(&self, last_refresh: Timestamp) -> Timestamp {
        if self.is_infinite() {
            Timestamp::NEVER
        } else {
            last_refresh.saturating_add(self.period)
        }
    }

    /// Check QoS compatibility between offered (writer) and requested (reader)
    ///
    /// **Rule (RxO):** Writer offers <= Reader requests
    pub fn is_compatible_with(&self, requested: &Deadline) -> bool {
        self.period <= requested.period
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deadline_default() {
        let deadline = Deadline::default();
        assert_eq!(deadline.period, Duration::from_secs(u64::MAX));
        assert!(deadline.is_infinite());
    }

    #[test]
    fn test_deadline_new() {
        let deadline = Deadline::new(Duration::from_millis(100));
        assert_eq!(deadline.period, Duration::from_millis(100));
        assert!(!deadline.is_infinite());
    }

    #[test]
    fn test_compatibility_writer_faster() {
        let writer = Deadline::new(Duration::from_millis(100));
        let reader = Deadline::new(Duration::from_millis(200));
        assert!(writer.is_compatible_with(&reader));
        assert!(!reader.is_compatible_with(&writer));
    }

    #[test]
    fn test_compatibility_infinite() {
        let infinite = Deadline::infinite();
        let finite = Deadline::from_millis(100);

        assert!(!infinite.is_compatible_with(&finite));
        assert!(infinite.is_compatible_with(&infinite));
        assert!(finite.is_compatible_with(&infinite));
    }

    #[test]
    fn test_expiry_after() {
        let deadline = Deadline::from_millis(50);
        assert_eq!(
            deadline.expiry_after(Timestamp::from_millis(10)),
            Timestamp::from_millis(60)
        );
        assert_eq!(
            Deadline::infinite().expiry_after(Timestamp::from_millis(10)),
            Timestamp::NEVER
        );
    }
}
