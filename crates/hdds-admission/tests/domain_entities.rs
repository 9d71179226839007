// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![allow(clippy::uninlined_format_args)] // Test/bench code readability over pedantic

//! Domain entity management and transport integration tests
//!
//! Validates topic/endpoint lifecycles and forwarding of accepted samples
//! through a channel transport into a second domain.

use hdds_admission::{
    ChannelTransport, Domain, DomainConfig, Error, FieldKey, KeylessType, ManualClock, QoS,
    Timestamp,
};
use std::sync::Arc;

fn manual_domain(domain_id: u32) -> Domain {
    let clock = Arc::new(ManualClock::new(Timestamp::from_secs(1)));
    Domain::builder(domain_id)
        .config(DomainConfig::new(domain_id).spawn_dispatcher(false))
        .clock(clock)
        .build()
        .expect("domain")
}

#[test]
fn test_topic_registry() {
    let domain = manual_domain(0);
    let keyed = Arc::new(FieldKey::new("Pose", vec![0..4]));

    let topic = domain.create_topic("Pose", keyed.clone()).expect("topic");
    assert_eq!(topic.type_name(), "Pose");

    // Same name and type: same topic.
    let again = domain.create_topic("Pose", keyed).expect("topic");
    assert_eq!(again.name(), topic.name());
    assert_eq!(domain.topic_count(), 1);

    assert!(matches!(
        domain.create_topic("Pose", Arc::new(KeylessType::new("Other"))),
        Err(Error::InvalidArgument(_))
    ));
    assert!(matches!(
        domain.create_topic("", Arc::new(KeylessType::new("Other"))),
        Err(Error::InvalidArgument(_))
    ));
    assert!(domain.find_topic("Pose").is_some());
    assert!(domain.find_topic("Twist").is_none());
}

#[test]
fn test_delete_topic_requires_no_endpoints() {
    let domain = manual_domain(0);
    let topic = domain
        .create_topic("Log", Arc::new(KeylessType::new("Line")))
        .expect("topic");
    let writer = domain.create_writer(&topic, QoS::default()).expect("writer");
    let reader = domain.create_reader(&topic, QoS::default()).expect("reader");
    assert_eq!((domain.writer_count(), domain.reader_count()), (1, 1));

    assert!(matches!(
        domain.delete_topic(&topic),
        Err(Error::PreconditionNotMet(_))
    ));

    domain.delete_writer(&writer).expect("delete writer");
    domain.delete_reader(&reader).expect("delete reader");
    domain.delete_topic(&topic).expect("delete topic");
    assert_eq!(domain.topic_count(), 0);

    // Endpoints cannot be created on a deleted topic.
    assert!(matches!(
        domain.create_writer(&topic, QoS::default()),
        Err(Error::NotFound(_))
    ));
}

#[test]
fn test_invalid_qos_refused_at_creation() {
    let domain = manual_domain(0);
    let topic = domain
        .create_topic("Log", Arc::new(KeylessType::new("Line")))
        .expect("topic");

    assert!(matches!(
        domain.create_writer(&topic, QoS::default().keep_last(0)),
        Err(Error::InvalidArgument(_))
    ));
    assert_eq!(domain.writer_count(), 0);
}

#[test]
fn test_invalid_domain_id() {
    assert!(matches!(
        Domain::builder(500)
            .config(DomainConfig::new(500).spawn_dispatcher(false))
            .build(),
        Err(Error::InvalidArgument(_))
    ));
}

#[test]
fn test_writer_guids_follow_creation_order() {
    let domain = manual_domain(0);
    let topic = domain
        .create_topic("Log", Arc::new(KeylessType::new("Line")))
        .expect("topic");

    let guids: Vec<_> = (0..5)
        .map(|_| domain.create_writer(&topic, QoS::default()).expect("writer").guid())
        .collect();
    assert!(guids.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn test_channel_transport_feeds_remote_domain() {
    let (transport, receiver) = ChannelTransport::unbounded();
    let clock = Arc::new(ManualClock::new(Timestamp::from_secs(1)));
    let local = Domain::builder(1)
        .config(DomainConfig::new(1).spawn_dispatcher(false))
        .clock(clock)
        .transport(Arc::new(transport))
        .build()
        .expect("local");
    let remote = manual_domain(2);

    let key = Arc::new(FieldKey::new("Track", vec![0..1]));
    let local_topic = local.create_topic("Tracks", key.clone()).expect("topic");
    let remote_topic = remote.create_topic("Tracks", key).expect("topic");

    let qos = QoS::default().keep_all().destination_order_by_source();
    let writer = local.create_writer(&local_topic, qos).expect("writer");
    let reader = remote.create_reader(&remote_topic, qos).expect("reader");

    writer
        .write_w_timestamp(&[7, 1], Timestamp::from_secs(5))
        .expect("write");
    // Rejected by the writer's own ordering: never reaches the transport.
    writer
        .write_w_timestamp(&[7, 2], Timestamp::from_secs(4))
        .expect("write");
    writer
        .write_w_timestamp(&[7, 3], Timestamp::from_secs(6))
        .expect("write");

    let forwarded: Vec<_> = receiver.try_iter().collect();
    assert_eq!(forwarded.len(), 2);
    for (topic, sample) in &forwarded {
        assert_eq!(topic, "Tracks");
        assert_eq!(sample.writer, writer.guid());
        reader.deliver(sample).expect("deliver");
    }

    let samples = reader.take(8).expect("take");
    let values: Vec<u8> = samples.iter().map(|s| s.data[1]).collect();
    assert_eq!(values, vec![1, 3]);
}

#[test]
fn test_remote_reception_uses_receiver_clock() {
    let (transport, receiver) = ChannelTransport::unbounded();
    let local = Domain::builder(1)
        .config(DomainConfig::new(1).spawn_dispatcher(false))
        .clock(Arc::new(ManualClock::new(Timestamp::from_secs(1))))
        .transport(Arc::new(transport))
        .build()
        .expect("local");
    let remote_clock = Arc::new(ManualClock::new(Timestamp::from_secs(50)));
    let remote = Domain::builder(2)
        .config(DomainConfig::new(2).spawn_dispatcher(false))
        .clock(remote_clock.clone())
        .build()
        .expect("remote");

    let key = Arc::new(KeylessType::new("Beacon"));
    let local_topic = local.create_topic("Beacons", key.clone()).expect("topic");
    let remote_topic = remote.create_topic("Beacons", key).expect("topic");
    let writer = local
        .create_writer(&local_topic, QoS::default())
        .expect("writer");
    let reader = remote
        .create_reader(&remote_topic, QoS::default())
        .expect("reader");

    writer.write(b"ping").expect("write");
    let (_, sample) = receiver.try_recv().expect("forwarded");
    remote_clock.set(Timestamp::from_secs(52));
    reader.deliver(&sample).expect("deliver");

    let samples = reader.take(1).expect("take");
    assert_eq!(samples[0].info.source_timestamp, Timestamp::from_secs(1));
    assert_eq!(samples[0].info.reception_timestamp, Timestamp::from_secs(52));
}

#[test]
fn test_full_channel_fails_write() {
    let (transport, _receiver) = ChannelTransport::bounded(1);
    let local = Domain::builder(0)
        .config(DomainConfig::new(0).spawn_dispatcher(false))
        .transport(Arc::new(transport))
        .build()
        .expect("domain");
    let topic = local
        .create_topic("Log", Arc::new(KeylessType::new("Line")))
        .expect("topic");
    let writer = local.create_writer(&topic, QoS::default()).expect("writer");
    let reader = local.create_reader(&topic, QoS::default()).expect("reader");

    writer.write(b"one").expect("write");
    assert!(matches!(writer.write(b"two"), Err(Error::OutOfResources(_))));

    // Local delivery happened before the transport failed.
    let samples = reader.take(8).expect("take");
    assert_eq!(&*samples[0].data, b"two");
}
