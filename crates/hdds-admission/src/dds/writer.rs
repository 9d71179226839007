// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! DataWriter: write/dispose/unregister and the offered deadline.

use super::topic::TopicInner;
use crate::error::{Error, Result};
use crate::guid::GUID;
use crate::history::{HistoryCache, SampleEntry, SampleKind, StoreOutcome};
use crate::instance::InstanceHandle;
use crate::qos::QoS;
use crate::status::{OfferedDeadlineMissedStatus, StatusCondition, StatusCounter, StatusMask};
use crate::time::{Clock, Timestamp};
use crate::transport::{Transport, WireSample};
use parking_lot::{RwLock, RwLockReadGuard};
use std::fmt;
use std::sync::Arc;

pub(crate) struct WriterInner {
    pub(crate) guid: GUID,
    pub(crate) qos: QoS,
    pub(crate) topic: Arc<TopicInner>,
    pub(crate) cache: HistoryCache,
    pub(crate) deadline_missed: Arc<StatusCounter>,
    pub(crate) condition: Arc<StatusCondition>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) alive: RwLock<bool>,
}

impl WriterInner {
    fn enter(&self) -> Result<RwLockReadGuard<'_, bool>> {
        let alive = self.alive.read();
        if !*alive {
            return Err(Error::NotFound(format!("DataWriter {}", self.guid)));
        }
        Ok(alive)
    }

    fn publish(&self, kind: SampleKind, data: &[u8], timestamp: Timestamp) -> Result<InstanceHandle> {
        let _alive = self.enter()?;
        if !timestamp.is_valid() {
            return Err(Error::InvalidArgument(
                "source timestamp is invalid".to_string(),
            ));
        }

        let key = self.topic.type_support.key_hash(data)?;
        if !kind.is_data() && self.cache.lookup(&key).is_none() {
            return Err(Error::NotFound(format!(
                "{:?} of unknown instance {:?}",
                kind, key
            )));
        }

        let now = self.clock.now();
        let payload: Arc<[u8]> = Arc::from(data);
        let entry = SampleEntry::new(kind, payload.clone(), timestamp, now, self.guid);
        let handle = match self.cache.store(key, entry)? {
            StoreOutcome::Stored { handle, .. } => handle,
            StoreOutcome::Rejected { handle, reason } => {
                log::debug!(
                    "[writer] {} {:?} at {} not published: {:?}",
                    self.guid,
                    kind,
                    timestamp,
                    reason
                );
                return Ok(handle);
            }
            StoreOutcome::Dropped => {
                return Err(Error::NotFound(format!("instance {:?} deleted", key)));
            }
        };

        let wire = WireSample {
            kind,
            payload,
            source_timestamp: timestamp,
            writer: self.guid,
        };

        let mut first_error = None;
        let readers = self.topic.readers.read().clone();
        for reader in readers.iter() {
            if !self.qos.is_compatible_with(&reader.qos) {
                log::trace!("[writer] {} skips incompatible reader {}", self.guid, reader.guid);
                continue;
            }
            match reader.ingest(&wire) {
                Ok(_) => {}
                // Reader deleted while we were delivering.
                Err(Error::NotFound(_)) => {}
                Err(e) => {
                    log::warn!("[writer] {} delivery to {} failed: {}", self.guid, reader.guid, e);
                    first_error.get_or_insert(e);
                }
            }
        }

        if let Err(e) = self.transport.publish(&self.topic.name, &wire) {
            log::warn!(
                "[writer] {} transport '{}' failed: {}",
                self.guid,
                self.transport.name(),
                e
            );
            first_error.get_or_insert(e);
        }

        // Nothing is retransmitted, so the writer keeps no copy.
        self.cache.release(handle);

        match first_error {
            Some(e) => Err(e),
            None => Ok(handle),
        }
    }
}

/// Type-agnostic DataWriter.
///
/// Samples are serialized bytes; instance keys come from the topic's
/// [`TypeSupport`](crate::instance::TypeSupport).
#[derive(Clone)]
pub struct DataWriter {
    pub(crate) inner: Arc<WriterInner>,
}

impl DataWriter {
    pub fn guid(&self) -> GUID {
        self.inner.guid
    }

    pub fn qos(&self) -> &QoS {
        &self.inner.qos
    }

    pub fn topic_name(&self) -> &str {
        &self.inner.topic.name
    }

    /// Write a sample stamped with the domain clock.
    pub fn write(&self, data: &[u8]) -> Result<InstanceHandle> {
        self.write_w_timestamp(data, self.inner.clock.now())
    }

    /// Write a sample with an explicit source timestamp.
    ///
    /// `Timestamp::INVALID` is refused with `InvalidArgument`. Resource
    /// exhaustion in this writer or in any matched reader fails the write.
    pub fn write_w_timestamp(&self, data: &[u8], timestamp: Timestamp) -> Result<InstanceHandle> {
        self.inner.publish(SampleKind::Data, data, timestamp)
    }

    /// Dispose the instance `key_sample` belongs to.
    pub fn dispose(&self, key_sample: &[u8]) -> Result<()> {
        self.dispose_w_timestamp(key_sample, self.inner.clock.now())
    }

    pub fn dispose_w_timestamp(&self, key_sample: &[u8], timestamp: Timestamp) -> Result<()> {
        self.inner
            .publish(SampleKind::Dispose, key_sample, timestamp)
            .map(|_| ())
    }

    /// Unregister this writer from the instance `key_sample` belongs to.
    pub fn unregister_instance(&self, key_sample: &[u8]) -> Result<()> {
        self.unregister_instance_w_timestamp(key_sample, self.inner.clock.now())
    }

    pub fn unregister_instance_w_timestamp(
        &self,
        key_sample: &[u8],
        timestamp: Timestamp,
    ) -> Result<()> {
        self.inner
            .publish(SampleKind::Unregister, key_sample, timestamp)
            .map(|_| ())
    }

    /// Pre-register an instance without writing data.
    pub fn register_instance(&self, key_sample: &[u8]) -> Result<InstanceHandle> {
        let _alive = self.inner.enter()?;
        let key = self.inner.topic.type_support.key_hash(key_sample)?;
        self.inner.cache.register(key, self.inner.guid)
    }

    pub fn lookup_instance(&self, key_sample: &[u8]) -> Result<Option<InstanceHandle>> {
        let _alive = self.inner.enter()?;
        let key = self.inner.topic.type_support.key_hash(key_sample)?;
        Ok(self.inner.cache.lookup(&key))
    }

    pub fn get_offered_deadline_missed_status(&self) -> Result<OfferedDeadlineMissedStatus> {
        let _alive = self.inner.enter()?;
        let status = self.inner.deadline_missed.offered_deadline_missed();
        self.inner.condition.clear(StatusMask::OFFERED_DEADLINE_MISSED);
        Ok(status)
    }

    pub fn status_condition(&self) -> Arc<StatusCondition> {
        self.inner.condition.clone()
    }
}

impl fmt::Debug for DataWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataWriter")
            .field("guid", &self.inner.guid)
            .field("topic", &self.inner.topic.name)
            .finish()
    }
}
