// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Domain: entity lifecycle, matching and the shared timer scheduler.

use super::reader::{DataReader, ReaderInner};
use super::topic::{Topic, TopicInner};
use super::writer::{DataWriter, WriterInner};
use crate::config::DomainConfig;
use crate::deadline::{DeadlineSide, DeadlineSupervisor};
use crate::error::{Error, Result};
use crate::guid::GUID;
use crate::history::{CacheRole, HistoryCache};
use crate::instance::TypeSupport;
use crate::qos::QoS;
use crate::scheduler::{DispatcherHandle, TimerScheduler};
use crate::status::{StatusCondition, StatusCounter};
use crate::time::{Clock, SystemClock, Timestamp};
use crate::transport::{LoopbackTransport, Transport};
use dashmap::DashMap;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// Builder for [`Domain`].
pub struct DomainBuilder {
    config: DomainConfig,
    clock: Option<Arc<dyn Clock>>,
    transport: Option<Arc<dyn Transport>>,
}

impl DomainBuilder {
    /// Replace the whole configuration.
    pub fn config(mut self, config: DomainConfig) -> Self {
        self.config = config;
        self
    }

    /// Time source for timestamps and deadlines (default: `SystemClock`).
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Transport backend (default: `LoopbackTransport`).
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn build(self) -> Result<Domain> {
        self.config.validate()?;

        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let transport = self
            .transport
            .unwrap_or_else(|| Arc::new(LoopbackTransport));
        let scheduler = TimerScheduler::new(clock.clone());
        let dispatcher = if self.config.spawn_dispatcher {
            Some(scheduler.spawn_dispatcher(&self.config.dispatcher_thread_name)?)
        } else {
            None
        };

        log::debug!(
            "[domain] Domain {} up (transport={}, dispatcher={})",
            self.config.domain_id,
            transport.name(),
            dispatcher.is_some()
        );

        Ok(Domain {
            inner: Arc::new(DomainInner {
                config: self.config,
                clock,
                scheduler,
                transport,
                topics: DashMap::new(),
                readers: DashMap::new(),
                writers: DashMap::new(),
                next_entity: AtomicU32::new(0),
            }),
            dispatcher,
        })
    }
}

struct DomainInner {
    config: DomainConfig,
    clock: Arc<dyn Clock>,
    scheduler: Arc<TimerScheduler>,
    transport: Arc<dyn Transport>,
    topics: DashMap<String, Arc<TopicInner>>,
    readers: DashMap<GUID, Arc<ReaderInner>>,
    writers: DashMap<GUID, Arc<WriterInner>>,
    next_entity: AtomicU32,
}

/// A data-distribution domain.
///
/// Owns the timer scheduler shared by every reader and writer it creates.
/// Dropping the domain deletes its entities and stops the dispatcher.
pub struct Domain {
    inner: Arc<DomainInner>,
    dispatcher: Option<DispatcherHandle>,
}

impl Domain {
    /// Domain with default configuration, system clock and loopback transport.
    pub fn new(domain_id: u32) -> Result<Self> {
        Self::builder(domain_id).build()
    }

    pub fn builder(domain_id: u32) -> DomainBuilder {
        DomainBuilder {
            config: DomainConfig::new(domain_id),
            clock: None,
            transport: None,
        }
    }

    pub fn config(&self) -> &DomainConfig {
        &self.inner.config
    }

    pub fn domain_id(&self) -> u32 {
        self.inner.config.domain_id
    }

    /// Current domain time.
    pub fn now(&self) -> Timestamp {
        self.inner.clock.now()
    }

    /// Fire every deadline timer that is due.
    ///
    /// Meant for domains built with `spawn_dispatcher(false)`; safe to call
    /// alongside a dispatcher thread (callbacks never overlap).
    pub fn process_timers(&self) -> usize {
        self.inner.scheduler.fire_due()
    }

    /// Earliest pending deadline expiry.
    pub fn next_timer_expiry(&self) -> Option<Timestamp> {
        self.inner.scheduler.next_expiry()
    }

    /// Create a topic, or return the existing one of the same name.
    ///
    /// Fails with `InvalidArgument` if the name is bound to another type.
    pub fn create_topic(&self, name: &str, type_support: Arc<dyn TypeSupport>) -> Result<Topic> {
        if name.is_empty() {
            return Err(Error::InvalidArgument("topic name must not be empty".to_string()));
        }
        let entry = self
            .inner
            .topics
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(TopicInner::new(name, type_support.clone())));
        let existing = entry.value().clone();
        drop(entry);

        if existing.type_support.type_name() != type_support.type_name() {
            return Err(Error::InvalidArgument(format!(
                "topic '{}' already bound to type '{}'",
                name,
                existing.type_support.type_name()
            )));
        }
        Ok(Topic { inner: existing })
    }

    pub fn find_topic(&self, name: &str) -> Option<Topic> {
        self.inner
            .topics
            .get(name)
            .map(|t| Topic { inner: t.value().clone() })
    }

    /// Delete a topic that has no readers or writers left.
    pub fn delete_topic(&self, topic: &Topic) -> Result<()> {
        self.check_topic(topic)?;
        if topic.inner.has_endpoints() {
            return Err(Error::PreconditionNotMet(format!(
                "topic '{}' still has readers or writers",
                topic.name()
            )));
        }
        self.inner.topics.remove(topic.name());
        Ok(())
    }

    fn check_topic(&self, topic: &Topic) -> Result<()> {
        match self.inner.topics.get(topic.name()) {
            Some(t) if Arc::ptr_eq(t.value(), &topic.inner) => Ok(()),
            _ => Err(Error::NotFound(format!("topic '{}'", topic.name()))),
        }
    }

    fn next_guid(&self) -> GUID {
        let key = self.inner.next_entity.fetch_add(1, Ordering::Relaxed) + 1;
        GUID::from_entity_key(self.inner.config.guid_prefix, key)
    }

    fn supervisor(
        &self,
        qos: &QoS,
        side: DeadlineSide,
        missed: &Arc<StatusCounter>,
        condition: &Arc<StatusCondition>,
    ) -> Option<DeadlineSupervisor> {
        if qos.deadline.is_infinite() {
            return None;
        }
        Some(DeadlineSupervisor::new(
            self.inner.scheduler.clone(),
            qos.deadline.period,
            side,
            missed.clone(),
            condition.clone(),
            self.inner.config.count_unregistered_deadlines,
        ))
    }

    /// Create a writer on `topic`. The QoS is validated and then frozen.
    pub fn create_writer(&self, topic: &Topic, qos: QoS) -> Result<DataWriter> {
        self.check_topic(topic)?;
        qos.validate()?;

        let guid = self.next_guid();
        let deadline_missed = Arc::new(StatusCounter::new());
        let condition = Arc::new(StatusCondition::new());
        let supervisor = self.supervisor(&qos, DeadlineSide::Offered, &deadline_missed, &condition);

        let inner = Arc::new(WriterInner {
            guid,
            qos,
            topic: topic.inner.clone(),
            cache: HistoryCache::new(qos, CacheRole::Writer, supervisor),
            deadline_missed,
            condition,
            clock: self.inner.clock.clone(),
            transport: self.inner.transport.clone(),
            alive: RwLock::new(true),
        });
        topic.inner.writer_count.fetch_add(1, Ordering::AcqRel);
        self.inner.writers.insert(guid, inner.clone());

        log::debug!("[writer] {} created on '{}'", guid, topic.name());
        Ok(DataWriter { inner })
    }

    /// Create a reader on `topic`. The QoS is validated and then frozen.
    pub fn create_reader(&self, topic: &Topic, qos: QoS) -> Result<DataReader> {
        self.check_topic(topic)?;
        qos.validate()?;

        let guid = self.next_guid();
        let deadline_missed = Arc::new(StatusCounter::new());
        let condition = Arc::new(StatusCondition::new());
        let supervisor =
            self.supervisor(&qos, DeadlineSide::Requested, &deadline_missed, &condition);

        let inner = Arc::new(ReaderInner {
            guid,
            qos,
            topic: topic.inner.clone(),
            cache: HistoryCache::new(qos, CacheRole::Reader, supervisor),
            deadline_missed,
            sample_lost: StatusCounter::new(),
            condition,
            clock: self.inner.clock.clone(),
            alive: RwLock::new(true),
        });
        topic.inner.readers.write().push(inner.clone());
        self.inner.readers.insert(guid, inner.clone());

        log::debug!("[reader] {} created on '{}'", guid, topic.name());
        Ok(DataReader { inner })
    }

    /// Delete a writer.
    ///
    /// Cancels its deadline timers (no callback of it runs after return)
    /// and unregisters it from every reader of the topic.
    pub fn delete_writer(&self, writer: &DataWriter) -> Result<()> {
        let (guid, inner) = self
            .inner
            .writers
            .remove(&writer.inner.guid)
            .ok_or_else(|| Error::NotFound(format!("DataWriter {}", writer.inner.guid)))?;

        *inner.alive.write() = false;
        inner.topic.writer_count.fetch_sub(1, Ordering::AcqRel);
        inner.cache.clear();

        let readers = inner.topic.readers.read().clone();
        for reader in readers {
            let alive = reader.alive.read();
            if *alive {
                reader.cache.unregister_writer(&guid);
            }
        }

        log::debug!("[writer] {} deleted", guid);
        Ok(())
    }

    /// Delete a reader, cancelling its deadline timers synchronously.
    pub fn delete_reader(&self, reader: &DataReader) -> Result<()> {
        let (guid, inner) = self
            .inner
            .readers
            .remove(&reader.inner.guid)
            .ok_or_else(|| Error::NotFound(format!("DataReader {}", reader.inner.guid)))?;

        *inner.alive.write() = false;
        inner
            .topic
            .readers
            .write()
            .retain(|r| !Arc::ptr_eq(r, &inner));
        inner.cache.clear();

        log::debug!("[reader] {} deleted", guid);
        Ok(())
    }

    pub fn reader_count(&self) -> usize {
        self.inner.readers.len()
    }

    pub fn writer_count(&self) -> usize {
        self.inner.writers.len()
    }

    pub fn topic_count(&self) -> usize {
        self.inner.topics.len()
    }
}

impl Drop for Domain {
    fn drop(&mut self) {
        let writers: Vec<DataWriter> = self
            .inner
            .writers
            .iter()
            .map(|w| DataWriter { inner: w.value().clone() })
            .collect();
        for writer in &writers {
            let _ = self.delete_writer(writer);
        }

        let readers: Vec<DataReader> = self
            .inner
            .readers
            .iter()
            .map(|r| DataReader { inner: r.value().clone() })
            .collect();
        for reader in &readers {
            let _ = self.delete_reader(reader);
        }

        // Stops and joins the dispatcher thread.
        self.dispatcher.take();
        log::debug!("[domain] Domain {} down", self.inner.config.domain_id);
    }
}
