// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # HDDS Admission - QoS-driven sample admission and history retention
//!
//! The engine that decides, for every sample written or received, whether
//! it is accepted, how long it is retained, in what order it becomes
//! visible and when deadline contracts are violated.
//!
//! ## Quick Start
//!
//! ```rust
//! use hdds_admission::time::ManualClock;
//! use hdds_admission::{Domain, DomainConfig, FieldKey, QoS, Result, Timestamp};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! fn main() -> Result<()> {
//!     let clock = Arc::new(ManualClock::new(Timestamp::ZERO));
//!     let domain = Domain::builder(0)
//!         .config(DomainConfig::new(0).spawn_dispatcher(false))
//!         .clock(clock.clone())
//!         .build()?;
//!
//!     // First byte is the instance key
//!     let topic = domain.create_topic("Sensor", Arc::new(FieldKey::new("Reading", vec![0..1])))?;
//!     let qos = QoS::default().keep_last(1).deadline_millis(50);
//!     let writer = domain.create_writer(&topic, qos)?;
//!     let reader = domain.create_reader(&topic, qos)?;
//!
//!     writer.write(&[1, 42])?;
//!     clock.advance(Duration::from_millis(75));
//!     domain.process_timers();
//!
//!     let status = reader.get_requested_deadline_missed_status()?;
//!     assert_eq!(status.total_count, 1);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! DataWriter::write
//!     |
//!     v
//! writer HistoryCache --(Stored)--> matched DataReaders --> Transport
//!                                        |
//!                                        v
//!                 destination order -> time-based filter -> keep-last/keep-all
//!                                        |
//!                                        v
//!                    DeadlineSupervisor (TimerScheduler) -> status counters
//! ```
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Domain`] | Owns entities and the deadline timer scheduler |
//! | [`DataWriter`] | Writes, disposes and unregisters instances |
//! | [`DataReader`] | Reads/takes admitted samples, exposes statuses |
//! | [`QoS`] | History, resource limits, destination order, deadline, time-based filter |
//! | [`HistoryCache`] | Per-endpoint admission pipeline and retention store |

pub mod config;
pub mod dds;
pub mod deadline;
pub mod error;
pub mod guid;
pub mod history;
pub mod instance;
pub mod qos;
pub mod scheduler;
pub mod status;
pub mod time;
pub mod transport;

pub use config::DomainConfig;
pub use dds::{DataReader, DataWriter, Domain, DomainBuilder, Topic};
pub use error::{Error, Result};
pub use guid::GUID;
pub use history::{
    CacheRole, HistoryCache, RejectReason, Sample, SampleInfo, SampleKind, SampleState,
    StoreOutcome,
};
pub use instance::{FieldKey, InstanceHandle, InstanceLifecycle, KeyHash, KeylessType, TypeSupport};
pub use qos::{
    Deadline, DestinationOrder, DestinationOrderKind, History, QoS, ResourceLimits,
    TimeBasedFilter, LENGTH_UNLIMITED,
};
pub use status::{
    OfferedDeadlineMissedStatus, RequestedDeadlineMissedStatus, SampleLostStatus,
    StatusCondition, StatusMask,
};
pub use time::{Clock, ManualClock, SystemClock, Timestamp};
pub use transport::{ChannelTransport, LoopbackTransport, Transport, WireSample};
