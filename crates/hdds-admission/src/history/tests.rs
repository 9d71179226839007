// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use super::*;
use crate::qos::ResourceLimits;
use crate::time::Timestamp;
use std::sync::Arc;

fn guid(n: u32) -> GUID {
    GUID::from_entity_key([0x11; 12], n)
}

fn key(n: u8) -> KeyHash {
    KeyHash::from_key_bytes(&[n])
}

fn entry(kind: SampleKind, payload: &[u8], src_ms: i64, writer: u32) -> SampleEntry {
    SampleEntry::new(
        kind,
        Arc::from(payload),
        Timestamp::from_millis(src_ms),
        Timestamp::from_millis(src_ms),
        guid(writer),
    )
}

fn data(payload: &[u8], src_ms: i64, writer: u32) -> SampleEntry {
    entry(SampleKind::Data, payload, src_ms, writer)
}

fn reader(qos: QoS) -> HistoryCache {
    HistoryCache::new(qos, CacheRole::Reader, None)
}

fn payloads(samples: &[Sample]) -> Vec<Vec<u8>> {
    samples.iter().map(|s| s.data.to_vec()).collect()
}

#[test]
fn test_keep_last_evicts_oldest_by_storage_order() {
    let cache = reader(QoS::default().keep_last(2));
    for (i, p) in [b"a", b"b", b"c"].iter().enumerate() {
        let outcome = cache.store(key(1), data(*p, i as i64, 1)).expect("store");
        assert!(outcome.is_stored());
    }
    assert_eq!(cache.sample_count(), 2);
    let samples = cache.take(10).expect("take");
    assert_eq!(payloads(&samples), vec![b"b".to_vec(), b"c".to_vec()]);
    assert_eq!(cache.sample_count(), 0);
}

#[test]
fn test_keep_all_bounded_by_per_instance_limit() {
    let cache = reader(QoS::default().keep_all().resource_limits(ResourceLimits {
        max_samples_per_instance: 3,
        ..Default::default()
    }));
    for i in 0..3 {
        cache.store(key(1), data(b"x", i, 1)).expect("store");
    }
    assert!(matches!(
        cache.store(key(1), data(b"x", 10, 1)),
        Err(Error::OutOfResources(_))
    ));
    // Other instances are unaffected.
    assert!(cache.store(key(2), data(b"y", 10, 1)).expect("store").is_stored());
}

#[test]
fn test_max_samples_across_instances() {
    let cache = reader(QoS::default().keep_all().resource_limits(ResourceLimits {
        max_samples: 2,
        ..Default::default()
    }));
    cache.store(key(1), data(b"a", 1, 1)).expect("store");
    cache.store(key(2), data(b"b", 1, 1)).expect("store");
    assert!(matches!(
        cache.store(key(3), data(b"c", 1, 1)),
        Err(Error::OutOfResources(_))
    ));

    cache.take(1).expect("take");
    assert!(cache.store(key(3), data(b"c", 2, 1)).expect("store").is_stored());
}

#[test]
fn test_by_source_rejection_keeps_baseline() {
    let cache = reader(QoS::default().destination_order_by_source());
    cache.store(key(1), data(b"new", 10, 5)).expect("store");

    let outcome = cache.store(key(1), data(b"old", 9, 1)).expect("store");
    assert!(matches!(
        outcome,
        StoreOutcome::Rejected {
            reason: RejectReason::DestinationOrder,
            ..
        }
    ));
    assert!(outcome.is_sample_lost());

    // Baseline is still (10, writer 5): an equal timestamp from a higher
    // GUID is refused, from a lower GUID accepted.
    assert!(!cache.store(key(1), data(b"hi", 10, 6)).expect("store").is_stored());
    assert!(cache.store(key(1), data(b"lo", 10, 4)).expect("store").is_stored());

    let samples = cache.take(10).expect("take");
    assert_eq!(payloads(&samples), vec![b"lo".to_vec()]);
}

#[test]
fn test_by_reception_accepts_everything() {
    let cache = reader(QoS::default());
    cache.store(key(1), data(b"late", 100, 1)).expect("store");
    let outcome = cache.store(key(1), data(b"early", 1, 9)).expect("store");
    assert!(outcome.is_stored());
    assert_eq!(payloads(&cache.take(1).expect("take")), vec![b"early".to_vec()]);
}

#[test]
fn test_invalid_source_timestamp_under_by_source() {
    let cache = reader(QoS::default().keep_all().destination_order_by_source());
    cache.store(key(1), data(b"a", 10, 1)).expect("store");

    let mut bad = data(b"b", 0, 2);
    bad.source_timestamp = Timestamp::INVALID;
    let outcome = cache.store(key(1), bad).expect("store");
    assert!(matches!(outcome, StoreOutcome::Stored { sample_lost: true, .. }));

    // Baseline did not move: 11 is still accepted, 9 is not.
    assert!(cache.store(key(1), data(b"c", 11, 1)).expect("store").is_stored());
    assert!(!cache.store(key(1), data(b"d", 9, 1)).expect("store").is_stored());
    assert_eq!(cache.sample_count(), 3);
}

#[test]
fn test_time_based_filter_reader_only() {
    let qos = QoS::default().keep_all().time_based_filter_millis(10);

    let cache = reader(qos);
    assert!(cache.store(key(1), data(b"a", 0, 1)).expect("store").is_stored());
    let outcome = cache.store(key(1), data(b"b", 5, 1)).expect("store");
    assert!(matches!(
        outcome,
        StoreOutcome::Rejected {
            reason: RejectReason::TimeBasedFilter,
            ..
        }
    ));
    assert!(cache.store(key(1), data(b"c", 10, 1)).expect("store").is_stored());

    let writer = HistoryCache::new(qos, CacheRole::Writer, None);
    writer.store(key(1), data(b"a", 0, 1)).expect("store");
    assert!(writer.store(key(1), data(b"b", 5, 1)).expect("store").is_stored());
}

#[test]
fn test_markers_do_not_count_toward_depth() {
    let cache = reader(QoS::default().keep_last(1));
    cache.store(key(1), data(b"v", 1, 1)).expect("store");
    cache
        .store(key(1), entry(SampleKind::Dispose, b"k", 2, 1))
        .expect("store");

    let handle = cache.lookup(&key(1)).expect("instance");
    assert_eq!(cache.instance_len(handle), Some(2));
    assert_eq!(cache.lifecycle(handle), Some(InstanceLifecycle::Disposed));

    let samples = cache.read(10).expect("read");
    assert!(samples[0].info.valid_data);
    assert!(!samples[1].info.valid_data);
    assert_eq!(samples[1].info.kind, SampleKind::Dispose);
    assert_eq!(samples[1].info.instance_state, InstanceLifecycle::Disposed);
}

#[test]
fn test_keep_last_markers_superseded() {
    let cache = reader(QoS::default().keep_last(1));
    for i in 0..100 {
        cache.store(key(1), data(&[i as u8], 2 * i, 1)).expect("data");
        cache
            .store(key(1), entry(SampleKind::Dispose, b"k", 2 * i + 1, 1))
            .expect("dispose");
        let handle = cache.lookup(&key(1)).expect("instance");
        assert!(cache.instance_len(handle).expect("len") <= 2);
    }
    assert_eq!(cache.sample_count(), 2);

    let samples = cache.take(10).expect("take");
    assert_eq!(payloads(&samples)[0], vec![99]);
    assert_eq!(samples[1].info.kind, SampleKind::Dispose);
    assert_eq!(cache.sample_count(), 0);
}

#[test]
fn test_superseded_markers_free_max_samples() {
    let cache = reader(QoS::default().keep_last(1).resource_limits(ResourceLimits {
        max_samples: 2,
        ..Default::default()
    }));
    cache.store(key(1), data(b"a", 1, 1)).expect("store");
    cache
        .store(key(1), entry(SampleKind::Dispose, b"k", 2, 1))
        .expect("store");
    // Full, but the new dispose replaces the old one.
    cache
        .store(key(1), entry(SampleKind::Dispose, b"k", 3, 1))
        .expect("store");
    cache.store(key(1), data(b"b", 4, 1)).expect("store");
    assert_eq!(cache.sample_count(), 1);
}

#[test]
fn test_keep_all_keeps_every_marker() {
    let cache = reader(QoS::default().keep_all());
    for i in 0..3 {
        cache.store(key(1), data(b"v", 2 * i, 1)).expect("data");
        cache
            .store(key(1), entry(SampleKind::Dispose, b"k", 2 * i + 1, 1))
            .expect("dispose");
    }
    assert_eq!(cache.sample_count(), 6);
}

#[test]
fn test_release_keeps_baseline() {
    let qos = QoS::default()
        .keep_all()
        .destination_order_by_source()
        .resource_limits(ResourceLimits {
            max_samples: 1,
            ..Default::default()
        });
    let writer = HistoryCache::new(qos, CacheRole::Writer, None);
    for i in 1..=5 {
        let outcome = writer.store(key(1), data(b"v", 10 * i, 1)).expect("store");
        let StoreOutcome::Stored { handle, .. } = outcome else {
            panic!("not stored: {:?}", outcome);
        };
        writer.release(handle);
        assert_eq!(writer.sample_count(), 0);
    }
    let outcome = writer.store(key(1), data(b"old", 5, 1)).expect("store");
    assert!(matches!(
        outcome,
        StoreOutcome::Rejected {
            reason: RejectReason::DestinationOrder,
            ..
        }
    ));
}

#[test]
fn test_release_reclaims_unregistered_instance() {
    let writer = HistoryCache::new(QoS::default(), CacheRole::Writer, None);
    writer.store(key(1), data(b"v", 1, 1)).expect("store");
    let outcome = writer
        .store(key(1), entry(SampleKind::Unregister, b"k", 2, 1))
        .expect("store");
    let StoreOutcome::Stored { handle, .. } = outcome else {
        panic!("not stored: {:?}", outcome);
    };
    writer.release(handle);
    assert_eq!(writer.instance_count(), 0);
    // Stale handle is a no-op.
    writer.release(handle);
}

#[test]
fn test_read_marks_samples_read() {
    let cache = reader(QoS::default().keep_last(4));
    cache.store(key(1), data(b"a", 1, 1)).expect("store");

    let first = cache.read(10).expect("read");
    assert_eq!(first[0].info.sample_state, SampleState::NotRead);
    let second = cache.read(10).expect("read");
    assert_eq!(second[0].info.sample_state, SampleState::Read);
    assert_eq!(cache.sample_count(), 1);
}

#[test]
fn test_read_order_instances_then_storage() {
    let cache = reader(QoS::default().keep_last(4));
    cache.store(key(2), data(b"b1", 1, 1)).expect("store");
    cache.store(key(1), data(b"a1", 2, 1)).expect("store");
    cache.store(key(2), data(b"b2", 3, 1)).expect("store");

    let samples = cache.take(10).expect("take");
    assert_eq!(
        payloads(&samples),
        vec![b"b1".to_vec(), b"b2".to_vec(), b"a1".to_vec()]
    );
}

#[test]
fn test_take_respects_max_samples() {
    let cache = reader(QoS::default().keep_last(4));
    for i in 0..4 {
        cache.store(key(1), data(&[i as u8], i, 1)).expect("store");
    }
    assert_eq!(cache.take(3).expect("take").len(), 3);
    assert_eq!(cache.take(3).expect("take").len(), 1);
    assert!(matches!(cache.take(0), Err(Error::PreconditionNotMet(_))));
}

#[test]
fn test_instance_access() {
    let cache = reader(QoS::default().keep_last(4));
    cache.store(key(1), data(b"a", 1, 1)).expect("store");
    cache.store(key(2), data(b"b", 1, 1)).expect("store");

    let h2 = cache.lookup(&key(2)).expect("instance");
    let samples = cache.take_instance(h2, 10).expect("take");
    assert_eq!(payloads(&samples), vec![b"b".to_vec()]);
    assert_eq!(samples[0].info.instance_handle, h2);

    assert!(matches!(
        cache.read_instance(InstanceHandle::NIL, 1),
        Err(Error::NotFound(_))
    ));
}

#[test]
fn test_unregistered_and_drained_instance_is_reclaimed() {
    let cache = reader(QoS::default().keep_last(4));
    cache.store(key(1), data(b"a", 1, 1)).expect("store");
    cache.store(key(1), data(b"b", 2, 2)).expect("store");
    cache
        .store(key(1), entry(SampleKind::Unregister, b"k", 3, 1))
        .expect("store");

    let handle = cache.lookup(&key(1)).expect("instance");
    assert_eq!(cache.lifecycle(handle), Some(InstanceLifecycle::Alive));

    cache
        .store(key(1), entry(SampleKind::Unregister, b"k", 4, 2))
        .expect("store");
    assert_eq!(cache.lifecycle(handle), Some(InstanceLifecycle::NoWriters));

    // The second unregister superseded the first.
    let samples = cache.take(10).expect("take");
    assert_eq!(samples.len(), 3);
    assert_eq!(samples[2].info.kind, SampleKind::Unregister);
    assert_eq!(samples[2].info.writer, guid(2));
    assert_eq!(samples[2].info.instance_state, InstanceLifecycle::NoWriters);
    assert_eq!(cache.instance_count(), 0);
    assert!(cache.lookup(&key(1)).is_none());
}

#[test]
fn test_unregister_writer_marks_no_writers() {
    let cache = reader(QoS::default().keep_last(1));
    cache.store(key(1), data(b"a", 1, 1)).expect("store");
    cache.store(key(2), data(b"b", 1, 2)).expect("store");

    cache.unregister_writer(&guid(1));
    let h1 = cache.lookup(&key(1)).expect("instance");
    let h2 = cache.lookup(&key(2)).expect("instance");
    assert_eq!(cache.lifecycle(h1), Some(InstanceLifecycle::NoWriters));
    assert_eq!(cache.lifecycle(h2), Some(InstanceLifecycle::Alive));
}

#[test]
fn test_max_instances() {
    let cache = reader(QoS::default().resource_limits(ResourceLimits {
        max_instances: 1,
        ..Default::default()
    }));
    cache.store(key(1), data(b"a", 1, 1)).expect("store");
    assert!(matches!(
        cache.store(key(2), data(b"b", 1, 1)),
        Err(Error::OutOfResources(_))
    ));
}

#[test]
fn test_clear_drops_everything() {
    let cache = reader(QoS::default().keep_last(4));
    cache.store(key(1), data(b"a", 1, 1)).expect("store");
    cache.store(key(2), data(b"b", 1, 1)).expect("store");
    cache.clear();
    assert_eq!(cache.instance_count(), 0);
    assert_eq!(cache.sample_count(), 0);
    assert!(cache.take(1).expect("take").is_empty());
}

#[test]
fn test_register_without_sample() {
    let cache = HistoryCache::new(QoS::default(), CacheRole::Writer, None);
    let handle = cache.register(key(9), guid(1)).expect("register");
    assert_eq!(cache.lookup(&key(9)), Some(handle));
    assert_eq!(cache.instance_len(handle), Some(0));
}
