// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Stored sample entries and the metadata handed back by read/take.

use crate::guid::GUID;
use crate::instance::{InstanceHandle, InstanceLifecycle};
use crate::time::Timestamp;
use std::sync::Arc;

/// What a stored entry represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleKind {
    /// Regular data sample.
    Data,
    /// Instance disposed by a writer (marker, no valid data).
    Dispose,
    /// Instance unregistered by a writer (marker, no valid data).
    Unregister,
}

impl SampleKind {
    /// Whether this entry carries application data.
    pub fn is_data(self) -> bool {
        self == SampleKind::Data
    }
}

/// Sample state per DDS (NOT_READ vs READ).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleState {
    /// Sample has not been returned by `read()` yet.
    NotRead,
    /// Sample has been accessed via `read()`.
    Read,
}

/// Entry owned by a history cache slot.
///
/// Entries are never mutated after admission except for their read state.
#[derive(Debug, Clone)]
pub struct SampleEntry {
    pub kind: SampleKind,
    pub payload: Arc<[u8]>,
    pub source_timestamp: Timestamp,
    pub reception_timestamp: Timestamp,
    pub writer: GUID,
    /// Storage sequence number, assigned on admission.
    pub(crate) sequence: u64,
    pub(crate) state: SampleState,
}

impl SampleEntry {
    /// Build an entry awaiting admission.
    pub fn new(
        kind: SampleKind,
        payload: Arc<[u8]>,
        source_timestamp: Timestamp,
        reception_timestamp: Timestamp,
        writer: GUID,
    ) -> Self {
        Self {
            kind,
            payload,
            source_timestamp,
            reception_timestamp,
            writer,
            sequence: 0,
            state: SampleState::NotRead,
        }
    }

    /// Storage sequence number (0 until stored).
    pub fn sequence(&self) -> u64 {
        self.sequence
    }
}

/// Metadata returned alongside each sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleInfo {
    pub kind: SampleKind,
    /// `false` for dispose/unregister markers.
    pub valid_data: bool,
    pub sample_state: SampleState,
    pub instance_state: InstanceLifecycle,
    pub source_timestamp: Timestamp,
    pub reception_timestamp: Timestamp,
    pub writer: GUID,
    pub instance_handle: InstanceHandle,
}

/// Sample returned by read/take.
#[derive(Debug, Clone)]
pub struct Sample {
    pub data: Arc<[u8]>,
    pub info: SampleInfo,
}
