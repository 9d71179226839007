// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Transport capability.
//!
//! The admission engine never performs network I/O. Writers hand every
//! accepted sample to the domain's [`Transport`] after local delivery, and
//! samples coming from elsewhere enter a reader through
//! `DataReader::deliver` as a [`WireSample`].
//!
//! The backend is chosen when the domain is built:
//!
//! - [`LoopbackTransport`]: in-domain delivery only (default)
//! - [`ChannelTransport`]: forwards `(topic, WireSample)` to a crossbeam
//!   channel, e.g. to feed another domain in the same process

use crate::error::{Error, Result};
use crate::guid::GUID;
use crate::history::SampleKind;
use crate::time::Timestamp;
use crossbeam::channel::{self, Receiver, Sender, TrySendError};
use std::sync::Arc;

/// Sample as exchanged with a transport.
#[derive(Debug, Clone)]
pub struct WireSample {
    pub kind: SampleKind,
    /// Serialized sample (key fields only for dispose/unregister).
    pub payload: Arc<[u8]>,
    /// Writer-assigned timestamp, possibly [`Timestamp::INVALID`].
    pub source_timestamp: Timestamp,
    pub writer: GUID,
}

/// Pluggable transport backend.
pub trait Transport: Send + Sync {
    /// Backend name for logs.
    fn name(&self) -> &str;

    /// Forward a sample written on `topic`.
    fn publish(&self, topic: &str, sample: &WireSample) -> Result<()>;
}

/// Transport that keeps samples inside the domain.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoopbackTransport;

impl Transport for LoopbackTransport {
    fn name(&self) -> &str {
        "loopback"
    }

    fn publish(&self, _topic: &str, _sample: &WireSample) -> Result<()> {
        Ok(())
    }
}

/// Transport pushing samples into a crossbeam channel.
pub struct ChannelTransport {
    sender: Sender<(String, WireSample)>,
}

impl ChannelTransport {
    /// Bounded channel; a full channel fails the write with `OutOfResources`.
    pub fn bounded(capacity: usize) -> (Self, Receiver<(String, WireSample)>) {
        let (sender, receiver) = channel::bounded(capacity);
        (Self { sender }, receiver)
    }

    pub fn unbounded() -> (Self, Receiver<(String, WireSample)>) {
        let (sender, receiver) = channel::unbounded();
        (Self { sender }, receiver)
    }
}

impl Transport for ChannelTransport {
    fn name(&self) -> &str {
        "channel"
    }

    fn publish(&self, topic: &str, sample: &WireSample) -> Result<()> {
        match self.sender.try_send((topic.to_string(), sample.clone())) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(Error::OutOfResources(
                "transport channel full".to_string(),
            )),
            Err(TrySendError::Disconnected(_)) => Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "transport channel disconnected",
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> WireSample {
        WireSample {
            kind: SampleKind::Data,
            payload: Arc::from(&b"abc"[..]),
            source_timestamp: Timestamp::from_millis(1),
            writer: GUID::from_entity_key([1; 12], 1),
        }
    }

    #[test]
    fn test_channel_forwards() {
        let (transport, rx) = ChannelTransport::unbounded();
        transport.publish("Sensor", &sample()).expect("publish");
        let (topic, got) = rx.try_recv().expect("forwarded");
        assert_eq!(topic, "Sensor");
        assert_eq!(&*got.payload, b"abc");
    }

    #[test]
    fn test_channel_full_and_closed() {
        let (transport, rx) = ChannelTransport::bounded(1);
        transport.publish("t", &sample()).expect("first fits");
        assert!(matches!(
            transport.publish("t", &sample()),
            Err(Error::OutOfResources(_))
        ));

        drop(rx);
        assert!(matches!(transport.publish("t", &sample()), Err(Error::Io(_))));
    }

    #[test]
    fn test_loopback_accepts() {
        assert!(LoopbackTransport.publish("t", &sample()).is_ok());
        assert_eq!(LoopbackTransport.name(), "loopback");
    }
}
