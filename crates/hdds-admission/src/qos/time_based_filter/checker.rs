// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use super::TimeBasedFilter;
use crate::time::Timestamp;

/// Verdict of the time-based filter for one candidate sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterDecision {
    /// Deliver (and store) the sample.
    Allow,
    /// Drop the sample and count it as lost.
    Suppress,
}

/// Per-instance state that enforces a [`TimeBasedFilter`].
///
/// Separation is measured on *source* timestamps, so the outcome does not
/// depend on transport jitter or on when the reader happens to run.
#[derive(Debug, Clone)]
pub struct TimeBasedFilterChecker {
    filter: TimeBasedFilter,
    last_delivered: Option<Timestamp>,
}

impl TimeBasedFilterChecker {
    /// Create a checker for the provided filter policy.
    #[must_use]
    pub fn new(filter: TimeBasedFilter) -> Self {
        Self {
            filter,
            last_delivered: None,
        }
    }

    /// Decide whether a sample stamped `candidate` may be delivered.
    ///
    /// The first sample of an instance and samples with an invalid
    /// timestamp always pass.
    #[must_use]
    pub fn check(&self, candidate: Timestamp) -> FilterDecision {
        if self.filter.is_disabled() || !candidate.is_valid() {
            return FilterDecision::Allow;
        }

        let Some(last) = self.last_delivered else {
            return FilterDecision::Allow;
        };

        let separation = i128::from(candidate.as_nanos()) - i128::from(last.as_nanos());
        let minimum = i128::try_from(self.filter.minimum_separation.as_nanos()).unwrap_or(i128::MAX);
        if separation >= minimum {
            FilterDecision::Allow
        } else {
            FilterDecision::Suppress
        }
    }

    /// Record that a sample stamped `delivered` was delivered.
    ///
    /// Invalid timestamps do not move the reference point.
    pub fn mark_delivered(&mut self, delivered: Timestamp) {
        if delivered.is_valid() {
            self.last_delivered = Some(delivered);
        }
    }

    /// Clears the internal state so the next sample is accepted.
    pub fn reset(&mut self) {
        self.last_delivered = None;
    }

    /// Source timestamp of the last delivered sample.
    #[must_use]
    pub fn last_delivered(&self) -> Option<Timestamp> {
        self.last_delivered
    }
}
