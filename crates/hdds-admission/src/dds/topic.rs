// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Topic: a name bound to a type descriptor.

use super::reader::ReaderInner;
use crate::instance::TypeSupport;
use parking_lot::RwLock;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub(crate) struct TopicInner {
    pub(crate) name: String,
    pub(crate) type_support: Arc<dyn TypeSupport>,
    /// Live readers, in creation order.
    pub(crate) readers: RwLock<Vec<Arc<ReaderInner>>>,
    pub(crate) writer_count: AtomicUsize,
}

impl TopicInner {
    pub(crate) fn new(name: &str, type_support: Arc<dyn TypeSupport>) -> Self {
        Self {
            name: name.to_string(),
            type_support,
            readers: RwLock::new(Vec::new()),
            writer_count: AtomicUsize::new(0),
        }
    }

    pub(crate) fn has_endpoints(&self) -> bool {
        !self.readers.read().is_empty() || self.writer_count.load(Ordering::Acquire) > 0
    }
}

/// Handle to a topic created by a [`Domain`](crate::Domain).
#[derive(Clone)]
pub struct Topic {
    pub(crate) inner: Arc<TopicInner>,
}

impl Topic {
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn type_name(&self) -> &str {
        self.inner.type_support.type_name()
    }

    pub fn type_support(&self) -> &Arc<dyn TypeSupport> {
        &self.inner.type_support
    }
}

impl fmt::Debug for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Topic")
            .field("name", &self.inner.name)
            .field("type_name", &self.type_name())
            .finish()
    }
}
