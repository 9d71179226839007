// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! DESTINATION_ORDER QoS policy (DDS v1.4 Sec.2.2.3.8) and its resolver.
//!
//! The policy decides which of several updates to the same instance wins:
//!
//! - **BY_RECEPTION_TIMESTAMP** (default): the most recently *received*
//!   sample always wins. Reception is sequential per instance, so every
//!   candidate is admitted.
//! - **BY_SOURCE_TIMESTAMP**: a candidate is admitted only if its source
//!   timestamp is later than the instance's baseline, or equal to it and
//!   written by a numerically lower GUID.
//!
//! Admission only gates *new* entries. Entries already resident in a
//! history deeper than one are never rewritten.
//!
//! # QoS Compatibility (Request vs Offered)
//!
//! - Writer BY_SOURCE_TIMESTAMP -> Reader BY_SOURCE_TIMESTAMP \[OK\]
//! - Writer BY_SOURCE_TIMESTAMP -> Reader BY_RECEPTION_TIMESTAMP \[OK\]
//! - Writer BY_RECEPTION_TIMESTAMP -> Reader BY_RECEPTION_TIMESTAMP \[OK\]
//! - Writer BY_RECEPTION_TIMESTAMP -> Reader BY_SOURCE_TIMESTAMP \[X\]
//!
//! # Examples
//!
//! ```
//! use hdds_admission::qos::{Admission, DestinationOrder, OrderKey};
//! use hdds_admission::{Timestamp, GUID};
//!
//! let order = DestinationOrder::by_source_timestamp();
//! let w = GUID::from_entity_key([0; 12], 1);
//! let y = GUID::from_entity_key([0; 12], 3);
//!
//! let current = order.baseline_for(&OrderKey::new(Timestamp::from_secs(1), Timestamp::from_secs(1), y));
//! let candidate = OrderKey::new(Timestamp::from_secs(1), Timestamp::from_secs(2), w);
//! assert_eq!(order.admit(&candidate, Some(&current)), Admission::Accept);
//! ```

use crate::guid::GUID;
use crate::time::Timestamp;

/// DESTINATION_ORDER kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum DestinationOrderKind {
    /// Order samples by reception timestamp (default).
    #[default]
    ByReceptionTimestamp = 0,

    /// Order samples by source timestamp, lower GUID breaking ties.
    BySourceTimestamp = 1,
}

/// DESTINATION_ORDER QoS policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DestinationOrder {
    /// Ordering criterion
    pub kind: DestinationOrderKind,
}

/// Outcome of destination-order resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Candidate supersedes the current instance state.
    Accept,
    /// Candidate is older than (or loses the tie-break against) the baseline.
    Reject,
}

/// Ordering-relevant metadata of a sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderKey {
    /// Timestamp assigned by the writer.
    pub source_timestamp: Timestamp,
    /// Timestamp assigned on arrival.
    pub reception_timestamp: Timestamp,
    /// Writer that produced the sample.
    pub writer: GUID,
}

impl OrderKey {
    pub fn new(source_timestamp: Timestamp, reception_timestamp: Timestamp, writer: GUID) -> Self {
        Self {
            source_timestamp,
            reception_timestamp,
            writer,
        }
    }
}

/// Comparison baseline kept per instance.
///
/// Only updated on `Accept`; a rejected candidate leaves it untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderBaseline {
    /// Timestamp of the last accepted sample (source or reception, per kind).
    pub timestamp: Timestamp,
    /// Writer of the last accepted sample.
    pub writer: GUID,
}

impl DestinationOrder {
    /// Create BY_RECEPTION_TIMESTAMP policy (default)
    pub fn by_reception_timestamp() -> Self {
        Self {
            kind: DestinationOrderKind::ByReceptionTimestamp,
        }
    }

    /// Create BY_SOURCE_TIMESTAMP policy
    pub fn by_source_timestamp() -> Self {
        Self {
            kind: DestinationOrderKind::BySourceTimestamp,
        }
    }

    /// Check if this writer policy is compatible with a reader policy (RxO)
    pub fn is_compatible_with(&self, requested: &DestinationOrder) -> bool {
        self.kind >= requested.kind
    }

    /// Check if policy uses source timestamps
    pub fn uses_source_timestamp(&self) -> bool {
        self.kind == DestinationOrderKind::BySourceTimestamp
    }

    /// Check if policy uses reception timestamps
    pub fn uses_reception_timestamp(&self) -> bool {
        self.kind == DestinationOrderKind::ByReceptionTimestamp
    }

    /// Decide whether `candidate` may supersede the instance baseline.
    ///
    /// `current` is `None` for an instance that has not accepted anything
    /// yet, in which case every candidate is admitted. Under
    /// BY_SOURCE_TIMESTAMP a candidate with an invalid source timestamp
    /// cannot be ordered; callers handle that case before asking (see
    /// [`DestinationOrder::orders_by_invalid`]).
    pub fn admit(&self, candidate: &OrderKey, current: Option<&OrderBaseline>) -> Admission {
        let Some(current) = current else {
            return Admission::Accept;
        };

        match self.kind {
            DestinationOrderKind::ByReceptionTimestamp => Admission::Accept,
            DestinationOrderKind::BySourceTimestamp => {
                let ts = candidate.source_timestamp;
                if ts > current.timestamp
                    || (ts == current.timestamp && candidate.writer < current.writer)
                {
                    Admission::Accept
                } else {
                    Admission::Reject
                }
            }
        }
    }

    /// Baseline that results from accepting `candidate`.
    pub fn baseline_for(&self, candidate: &OrderKey) -> OrderBaseline {
        let timestamp = match self.kind {
            DestinationOrderKind::ByReceptionTimestamp => candidate.reception_timestamp,
            DestinationOrderKind::BySourceTimestamp => candidate.source_timestamp,
        };
        OrderBaseline {
            timestamp,
            writer: candidate.writer,
        }
    }

    /// Whether `candidate` carries a timestamp this policy cannot order by.
    pub fn orders_by_invalid(&self, candidate: &OrderKey) -> bool {
        self.uses_source_timestamp() && !candidate.source_timestamp.is_valid()
    }
}
