// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! HISTORY and RESOURCE_LIMITS QoS policies.

/// Special value meaning "no limit".
/// Corresponds to DDS LENGTH_UNLIMITED (-1 as i32).
pub const LENGTH_UNLIMITED: usize = usize::MAX;

/// History policy
///
/// Determines how many samples to keep per instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum History {
    /// Keep last N samples per instance (bounded queue, drops oldest by
    /// storage order).
    KeepLast(u32),
    /// Keep all samples within resource limits.
    ///
    /// Bounded by `ResourceLimits::max_samples_per_instance`; stores fail
    /// with `OutOfResources` once the bound is reached.
    KeepAll,
}

impl Default for History {
    fn default() -> Self {
        Self::KeepLast(1)
    }
}

impl History {
    /// Depth bound for KEEP_LAST, `None` for KEEP_ALL.
    pub fn depth(&self) -> Option<usize> {
        match self {
            History::KeepLast(n) => Some(*n as usize),
            History::KeepAll => None,
        }
    }
}

/// Resource limits for Writer/Reader
///
/// Controls sample and instance bounds of a history cache.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResourceLimits {
    /// Maximum total samples across all instances
    pub max_samples: usize,
    /// Maximum number of live instances
    pub max_instances: usize,
    /// Maximum samples retained per instance
    pub max_samples_per_instance: usize,
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            max_samples: LENGTH_UNLIMITED,
            max_instances: LENGTH_UNLIMITED,
            max_samples_per_instance: LENGTH_UNLIMITED,
        }
    }
}

impl ResourceLimits {
    /// Convert a DDS-style signed limit (-1 = unlimited) into a `usize`.
    pub fn limit_from_i32(value: i32) -> usize {
        usize::try_from(value).unwrap_or(LENGTH_UNLIMITED)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_depth() {
        assert_eq!(History::KeepLast(3).depth(), Some(3));
        assert_eq!(History::KeepAll.depth(), None);
        assert_eq!(History::default(), History::KeepLast(1));
    }

    #[test]
    fn test_limit_from_i32() {
        assert_eq!(ResourceLimits::limit_from_i32(-1), LENGTH_UNLIMITED);
        assert_eq!(ResourceLimits::limit_from_i32(16), 16);
    }
}
