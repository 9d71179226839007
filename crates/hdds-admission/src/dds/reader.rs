// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! DataReader: ingress, read/take and reader-side statuses.

use super::topic::TopicInner;
use crate::error::{Error, Result};
use crate::guid::GUID;
use crate::history::{HistoryCache, Sample, SampleEntry, StoreOutcome};
use crate::instance::{InstanceHandle, InstanceLifecycle};
use crate::qos::QoS;
use crate::status::{
    RequestedDeadlineMissedStatus, SampleLostStatus, StatusCondition, StatusCounter, StatusMask,
};
use crate::time::Clock;
use crate::transport::WireSample;
use parking_lot::{RwLock, RwLockReadGuard};
use std::fmt;
use std::sync::Arc;

pub(crate) struct ReaderInner {
    pub(crate) guid: GUID,
    pub(crate) qos: QoS,
    pub(crate) topic: Arc<TopicInner>,
    pub(crate) cache: HistoryCache,
    pub(crate) deadline_missed: Arc<StatusCounter>,
    pub(crate) sample_lost: StatusCounter,
    pub(crate) condition: Arc<StatusCondition>,
    /// Stamps reception time on ingress.
    pub(crate) clock: Arc<dyn Clock>,
    /// `false` once deleted. Held shared for the duration of an operation
    /// so deletion waits for in-flight stores.
    pub(crate) alive: RwLock<bool>,
}

impl ReaderInner {
    fn enter(&self) -> Result<RwLockReadGuard<'_, bool>> {
        let alive = self.alive.read();
        if !*alive {
            return Err(Error::NotFound(format!("DataReader {}", self.guid)));
        }
        Ok(alive)
    }

    /// Admission pipeline entry for one incoming sample. The reception
    /// timestamp comes from this reader's clock.
    pub(crate) fn ingest(&self, sample: &WireSample) -> Result<StoreOutcome> {
        let _alive = self.enter()?;

        let key = self.topic.type_support.key_hash(&sample.payload)?;
        let entry = SampleEntry::new(
            sample.kind,
            sample.payload.clone(),
            sample.source_timestamp,
            self.clock.now(),
            sample.writer,
        );
        let outcome = self.cache.store(key, entry)?;

        if outcome.is_sample_lost() {
            self.sample_lost.increment(1, None);
            self.condition.trigger(StatusMask::SAMPLE_LOST);
        }
        if outcome.is_stored() {
            self.condition.trigger(StatusMask::DATA_AVAILABLE);
        }
        log::trace!(
            "[reader] {} {:?} from {} -> {:?}",
            self.guid,
            sample.kind,
            sample.writer,
            outcome
        );
        Ok(outcome)
    }
}

/// Type-agnostic DataReader.
///
/// Created by [`Domain::create_reader`](crate::Domain::create_reader); every
/// operation fails with `NotFound` once the reader is deleted.
#[derive(Clone)]
pub struct DataReader {
    pub(crate) inner: Arc<ReaderInner>,
}

impl DataReader {
    pub fn guid(&self) -> GUID {
        self.inner.guid
    }

    pub fn qos(&self) -> &QoS {
        &self.inner.qos
    }

    pub fn topic_name(&self) -> &str {
        &self.inner.topic.name
    }

    /// Ingest a sample received from a transport.
    ///
    /// Rejections by destination order or the time-based filter are
    /// reported in the outcome and the sample-lost status, not as errors.
    pub fn deliver(&self, sample: &WireSample) -> Result<StoreOutcome> {
        self.inner.ingest(sample)
    }

    /// Return up to `max_samples` samples without removing them.
    pub fn read(&self, max_samples: usize) -> Result<Vec<Sample>> {
        let _alive = self.inner.enter()?;
        let samples = self.inner.cache.read(max_samples)?;
        self.inner.condition.clear(StatusMask::DATA_AVAILABLE);
        Ok(samples)
    }

    /// Remove and return up to `max_samples` samples.
    ///
    /// # Examples
    ///
    /// ```
    /// use hdds_admission::{Domain, DomainConfig, KeylessType, QoS};
    /// use std::sync::Arc;
    ///
    /// let domain = Domain::builder(0)
    ///     .config(DomainConfig::new(0).spawn_dispatcher(false))
    ///     .build()
    ///     .unwrap();
    /// let topic = domain
    ///     .create_topic("Chatter", Arc::new(KeylessType::new("String")))
    ///     .unwrap();
    /// let writer = domain.create_writer(&topic, QoS::default()).unwrap();
    /// let reader = domain.create_reader(&topic, QoS::default()).unwrap();
    ///
    /// writer.write(b"hello").unwrap();
    /// let samples = reader.take(8).unwrap();
    /// assert_eq!(&*samples[0].data, b"hello");
    /// ```
    pub fn take(&self, max_samples: usize) -> Result<Vec<Sample>> {
        let _alive = self.inner.enter()?;
        let samples = self.inner.cache.take(max_samples)?;
        self.inner.condition.clear(StatusMask::DATA_AVAILABLE);
        Ok(samples)
    }

    pub fn read_instance(&self, handle: InstanceHandle, max_samples: usize) -> Result<Vec<Sample>> {
        let _alive = self.inner.enter()?;
        self.inner.cache.read_instance(handle, max_samples)
    }

    pub fn take_instance(&self, handle: InstanceHandle, max_samples: usize) -> Result<Vec<Sample>> {
        let _alive = self.inner.enter()?;
        self.inner.cache.take_instance(handle, max_samples)
    }

    /// Handle of the instance `key_sample` belongs to, if known.
    pub fn lookup_instance(&self, key_sample: &[u8]) -> Result<Option<InstanceHandle>> {
        let _alive = self.inner.enter()?;
        let key = self.inner.topic.type_support.key_hash(key_sample)?;
        Ok(self.inner.cache.lookup(&key))
    }

    pub fn instance_state(&self, handle: InstanceHandle) -> Result<InstanceLifecycle> {
        let _alive = self.inner.enter()?;
        self.inner
            .cache
            .lifecycle(handle)
            .ok_or_else(|| Error::NotFound(format!("instance {:?}", handle)))
    }

    pub fn get_requested_deadline_missed_status(&self) -> Result<RequestedDeadlineMissedStatus> {
        let _alive = self.inner.enter()?;
        let status = self.inner.deadline_missed.requested_deadline_missed();
        self.inner
            .condition
            .clear(StatusMask::REQUESTED_DEADLINE_MISSED);
        Ok(status)
    }

    pub fn get_sample_lost_status(&self) -> Result<SampleLostStatus> {
        let _alive = self.inner.enter()?;
        let status = self.inner.sample_lost.sample_lost();
        self.inner.condition.clear(StatusMask::SAMPLE_LOST);
        Ok(status)
    }

    pub fn status_condition(&self) -> Arc<StatusCondition> {
        self.inner.condition.clone()
    }
}

impl fmt::Debug for DataReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataReader")
            .field("guid", &self.inner.guid)
            .field("topic", &self.inner.topic.name)
            .finish()
    }
}
