// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Domain configuration.
//!
//! # Example
//!
//! ```
//! use hdds_admission::DomainConfig;
//!
//! // Deterministic test setup: no dispatcher thread, timers driven by hand.
//! let config = DomainConfig::new(0)
//!     .spawn_dispatcher(false)
//!     .count_unregistered_deadlines(false);
//! assert!(config.validate().is_ok());
//! ```

use crate::error::{Error, Result};
use std::sync::atomic::{AtomicU32, Ordering};

/// Maximum domain ID per DDS specification (RTPS v2.3 Sec.9.6.1.1)
pub const MAX_DOMAIN_ID: u32 = 232;

/// Default name of the deadline dispatcher thread.
pub const DEFAULT_DISPATCHER_THREAD_NAME: &str = "hdds-deadline";

/// Distinguishes domains created by the same process.
static DOMAIN_COUNTER: AtomicU32 = AtomicU32::new(0);

/// Runtime configuration of a [`Domain`](crate::Domain).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainConfig {
    pub domain_id: u32,
    /// Prefix of every endpoint GUID created in the domain.
    pub guid_prefix: [u8; 12],
    /// Run deadline timers on a background thread. When `false`, callers
    /// drive them with `Domain::process_timers()`.
    pub spawn_dispatcher: bool,
    pub dispatcher_thread_name: String,
    /// Whether instances unregistered by every writer keep raising
    /// deadline-missed events.
    pub count_unregistered_deadlines: bool,
}

impl DomainConfig {
    /// Defaults for `domain_id` with a process-unique GUID prefix.
    pub fn new(domain_id: u32) -> Self {
        Self {
            domain_id,
            guid_prefix: default_guid_prefix(domain_id),
            spawn_dispatcher: true,
            dispatcher_thread_name: DEFAULT_DISPATCHER_THREAD_NAME.to_string(),
            count_unregistered_deadlines: true,
        }
    }

    pub fn guid_prefix(mut self, prefix: [u8; 12]) -> Self {
        self.guid_prefix = prefix;
        self
    }

    pub fn spawn_dispatcher(mut self, spawn: bool) -> Self {
        self.spawn_dispatcher = spawn;
        self
    }

    pub fn dispatcher_thread_name(mut self, name: impl Into<String>) -> Self {
        self.dispatcher_thread_name = name.into();
        self
    }

    pub fn count_unregistered_deadlines(mut self, count: bool) -> Self {
        self.count_unregistered_deadlines = count;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.domain_id > MAX_DOMAIN_ID {
            return Err(Error::InvalidArgument(format!(
                "domain_id {} exceeds {}",
                self.domain_id, MAX_DOMAIN_ID
            )));
        }
        if self.spawn_dispatcher && self.dispatcher_thread_name.is_empty() {
            return Err(Error::InvalidArgument(
                "dispatcher_thread_name must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for DomainConfig {
    fn default() -> Self {
        Self::new(0)
    }
}

/// Prefix layout: domain id | process id | per-process counter (big-endian).
fn default_guid_prefix(domain_id: u32) -> [u8; 12] {
    let mut prefix = [0u8; 12];
    prefix[0..4].copy_from_slice(&domain_id.to_be_bytes());
    prefix[4..8].copy_from_slice(&std::process::id().to_be_bytes());
    let n = DOMAIN_COUNTER.fetch_add(1, Ordering::Relaxed);
    prefix[8..12].copy_from_slice(&n.to_be_bytes());
    prefix
}
