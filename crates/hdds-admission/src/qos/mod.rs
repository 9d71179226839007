// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! QoS contract of a reader or writer.
//!
//! Only the policies that drive admission and retention live here:
//! HISTORY, RESOURCE_LIMITS, DESTINATION_ORDER, DEADLINE and
//! TIME_BASED_FILTER. A [`QoS`] is validated when the endpoint is created
//! and is immutable afterwards.
//!
//! # Examples
//!
//! ```
//! use hdds_admission::QoS;
//!
//! let qos = QoS::default()
//!     .keep_last(4)
//!     .destination_order_by_source()
//!     .deadline_millis(50)
//!     .time_based_filter_millis(10);
//! assert!(qos.validate().is_ok());
//! ```

pub mod deadline;
pub mod destination_order;
pub mod history;
#[cfg(feature = "qos-loaders")]
pub mod loaders;
pub mod time_based_filter;

pub use deadline::Deadline;
pub use destination_order::{
    Admission, DestinationOrder, DestinationOrderKind, OrderBaseline, OrderKey,
};
pub use history::{History, ResourceLimits, LENGTH_UNLIMITED};
pub use time_based_filter::{FilterDecision, TimeBasedFilter, TimeBasedFilterChecker};

use crate::error::{Error, Result};
use std::time::Duration;

/// Admission/retention QoS of one endpoint.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct QoS {
    /// History policy (KeepLast or KeepAll)
    pub history: History,
    /// Resource limits (sample and instance bounds)
    pub resource_limits: ResourceLimits,
    /// Destination order (conflict resolution between updates)
    pub destination_order: DestinationOrder,
    /// Deadline period (infinite = no supervision)
    pub deadline: Deadline,
    /// Time-based filter (reader side only)
    pub time_based_filter: TimeBasedFilter,
}

impl QoS {
    /// Set history policy.
    pub fn history(mut self, history: History) -> Self {
        self.history = history;
        self
    }

    /// Keep the last `depth` samples per instance.
    pub fn keep_last(mut self, depth: u32) -> Self {
        self.history = History::KeepLast(depth);
        self
    }

    /// Keep all samples (bounded by resource limits).
    pub fn keep_all(mut self) -> Self {
        self.history = History::KeepAll;
        self
    }

    /// Set resource limits.
    pub fn resource_limits(mut self, limits: ResourceLimits) -> Self {
        self.resource_limits = limits;
        self
    }

    /// Set destination order policy.
    pub fn destination_order(mut self, order: DestinationOrder) -> Self {
        self.destination_order = order;
        self
    }

    /// Order updates by source timestamp (lower GUID wins ties).
    pub fn destination_order_by_source(mut self) -> Self {
        self.destination_order = DestinationOrder::by_source_timestamp();
        self
    }

    /// Order updates by reception timestamp.
    pub fn destination_order_by_reception(mut self) -> Self {
        self.destination_order = DestinationOrder::by_reception_timestamp();
        self
    }

    /// Set deadline period.
    ///
    /// # Examples
    ///
    /// ```
    /// use hdds_admission::QoS;
    ///
    /// // Expect samples every 100ms
    /// let qos = QoS::default().deadline_millis(100);
    /// assert!(!qos.deadline.is_infinite());
    /// ```
    pub fn deadline(mut self, deadline: Deadline) -> Self {
        self.deadline = deadline;
        self
    }

    /// Set deadline from milliseconds.
    pub fn deadline_millis(mut self, ms: u64) -> Self {
        self.deadline = Deadline::from_millis(ms);
        self
    }

    /// Set time-based filter.
    pub fn time_based_filter(mut self, filter: TimeBasedFilter) -> Self {
        self.time_based_filter = filter;
        self
    }

    /// Set time-based filter from milliseconds.
    pub fn time_based_filter_millis(mut self, ms: u64) -> Self {
        self.time_based_filter = TimeBasedFilter::from_millis(ms);
        self
    }

    /// Validate the policy combination.
    ///
    /// # Validation Rules
    ///
    /// - History::KeepLast(n) where n > 0 and n <= max_samples_per_instance
    /// - History::KeepAll requires max_samples_per_instance > 0
    /// - max_samples and max_instances > 0
    /// - Deadline period > 0
    /// - Time-based filter separation <= deadline period
    ///
    /// # Examples
    ///
    /// ```
    /// use hdds_admission::QoS;
    ///
    /// assert!(QoS::default().validate().is_ok());
    /// assert!(QoS::default().keep_last(0).validate().is_err());
    /// ```
    pub fn validate(&self) -> Result<()> {
        let rl = &self.resource_limits;

        match self.history {
            History::KeepLast(0) => {
                return Err(Error::InvalidArgument(
                    "History::KeepLast(n) requires n > 0".to_string(),
                ));
            }
            History::KeepLast(depth) => {
                if depth as usize > rl.max_samples_per_instance {
                    return Err(Error::InvalidArgument(format!(
                        "History::KeepLast({}) exceeds max_samples_per_instance ({})",
                        depth, rl.max_samples_per_instance
                    )));
                }
            }
            History::KeepAll => {
                if rl.max_samples_per_instance == 0 {
                    return Err(Error::InvalidArgument(
                        "History::KeepAll requires max_samples_per_instance > 0".to_string(),
                    ));
                }
            }
        }

        if rl.max_samples == 0 || rl.max_instances == 0 {
            return Err(Error::InvalidArgument(format!(
                "max_samples ({}) and max_instances ({}) must be > 0",
                rl.max_samples, rl.max_instances
            )));
        }

        if self.deadline.period == Duration::ZERO {
            return Err(Error::InvalidArgument(
                "Deadline period must be > 0".to_string(),
            ));
        }

        if self.time_based_filter.minimum_separation > self.deadline.period {
            return Err(Error::InvalidArgument(format!(
                "time_based_filter ({:?}) exceeds deadline period ({:?})",
                self.time_based_filter.minimum_separation, self.deadline.period
            )));
        }

        Ok(())
    }

    /// Check whether this offered (writer) QoS satisfies a requested
    /// (reader) QoS.
    pub fn is_compatible_with(&self, requested: &QoS) -> bool {
        self.deadline.is_compatible_with(&requested.deadline)
            && self
                .destination_order
                .is_compatible_with(&requested.destination_order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qos_default() {
        let qos = QoS::default();
        assert_eq!(qos.history, History::KeepLast(1));
        assert!(qos.deadline.is_infinite());
        assert!(qos.time_based_filter.is_disabled());
        assert!(qos.destination_order.uses_reception_timestamp());
        assert!(qos.validate().is_ok());
    }

    #[test]
    fn test_qos_builder_chain() {
        let qos = QoS::default()
            .keep_all()
            .destination_order_by_source()
            .deadline_millis(100)
            .time_based_filter_millis(20);

        assert_eq!(qos.history, History::KeepAll);
        assert!(qos.destination_order.uses_source_timestamp());
        assert_eq!(qos.deadline.period, Duration::from_millis(100));
        assert_eq!(qos.time_based_filter.minimum_separation, Duration::from_millis(20));
        assert!(qos.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_depth() {
        assert!(matches!(
            QoS::default().keep_last(0).validate(),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_validate_rejects_depth_above_per_instance_limit() {
        let qos = QoS::default().keep_last(8).resource_limits(ResourceLimits {
            max_samples_per_instance: 4,
            ..Default::default()
        });
        assert!(matches!(qos.validate(), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn test_validate_rejects_filter_longer_than_deadline() {
        let qos = QoS::default()
            .deadline_millis(10)
            .time_based_filter_millis(50);
        assert!(matches!(qos.validate(), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn test_validate_rejects_zero_deadline() {
        let qos = QoS::default().deadline(Deadline::new(Duration::ZERO));
        assert!(matches!(qos.validate(), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn test_validate_rejects_keep_all_without_room() {
        let qos = QoS::default().keep_all().resource_limits(ResourceLimits {
            max_samples_per_instance: 0,
            ..Default::default()
        });
        assert!(matches!(qos.validate(), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn test_offered_requested_compatibility() {
        let offered = QoS::default().destination_order_by_source().deadline_millis(50);
        let requested = QoS::default().deadline_millis(100);
        assert!(offered.is_compatible_with(&requested));
        assert!(!requested.is_compatible_with(&offered));
    }
}
