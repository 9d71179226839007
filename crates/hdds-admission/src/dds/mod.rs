// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Entity layer: domain, topics, readers and writers.
//!
//! Entities are thin shells around a [`HistoryCache`](crate::history::HistoryCache)
//! each. A write runs the writer's own admission pipeline, then delivers
//! the sample to every matched reader of the topic and finally hands it to
//! the domain transport.

mod domain;
mod reader;
mod topic;
mod writer;

pub use domain::{Domain, DomainBuilder};
pub use reader::DataReader;
pub use topic::Topic;
pub use writer::DataWriter;
