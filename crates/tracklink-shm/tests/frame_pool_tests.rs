// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Producer/consumer behaviour of shared frame buffers

use tracklink_config::FramesConfig;
use tracklink_shm::{FrameBufferPool, FrameStore, PoolConfig, ShmError};

fn producer(dir: &std::path::Path, capacity: usize) -> FrameBufferPool {
    FrameBufferPool::new(
        PoolConfig::default()
            .with_dir(dir)
            .with_capacity(capacity)
            .with_id_prefix("buf"),
    )
    .unwrap()
}

#[test]
fn test_consumer_sees_producer_pixels() {
    let dir = tempfile::tempdir().unwrap();
    let mut pool = producer(dir.path(), 2);

    let pattern: Vec<u8> = (0..64 * 48 * 4).map(|i| (i % 251) as u8).collect();
    let buffer = pool.allocate_with_id("buf-7", 64, 48, 4).unwrap();
    buffer.write_pixels(&pattern).unwrap();

    let store = FrameStore::new(dir.path());
    let view = store.map_read_only("buf-7", 64, 48, 4).unwrap();
    assert_eq!(view.len(), 12288);
    assert!(!view.is_owned());
    assert_eq!(view.owner_pid(), None);
    assert_eq!(view.as_slice(), &pattern[..]);
}

#[test]
fn test_only_recent_history_is_mappable() {
    let dir = tempfile::tempdir().unwrap();
    let mut pool = producer(dir.path(), 2);
    let store = pool.store();

    let mut ids = Vec::new();
    for _ in 0..6 {
        ids.push(pool.allocate(8, 8, 4).unwrap().id().to_string());
    }

    for (i, id) in ids.iter().enumerate() {
        let result = store.map_read_only(id, 8, 8, 4);
        if i >= ids.len() - 2 {
            assert!(result.is_ok(), "{} should still be live", id);
        } else {
            assert!(
                matches!(result, Err(ShmError::TransientMiss(_))),
                "{} should have been recycled",
                id
            );
        }
    }
}

#[test]
fn test_third_allocation_recycles_first() {
    let dir = tempfile::tempdir().unwrap();
    let mut pool = producer(dir.path(), 2);
    let store = pool.store();

    let first = pool.allocate(4, 4, 4).unwrap().id().to_string();
    pool.allocate(4, 4, 4).unwrap();
    assert!(store.map_read_only(&first, 4, 4, 4).is_ok());

    pool.allocate(4, 4, 4).unwrap();
    let err = store.map_read_only(&first, 4, 4, 4).unwrap_err();
    assert!(err.is_transient());
}

#[test]
fn test_mapped_view_rejects_writes() {
    let dir = tempfile::tempdir().unwrap();
    let mut pool = producer(dir.path(), 2);
    pool.allocate_with_id("buf-1", 4, 4, 1).unwrap();

    let mut view = FrameStore::new(dir.path())
        .map_read_only("buf-1", 4, 4, 1)
        .unwrap();
    assert!(matches!(view.as_mut_slice(), Err(ShmError::ReadOnly(_))));
    assert!(matches!(
        view.write_pixels(&[0u8; 16]),
        Err(ShmError::ReadOnly(_))
    ));
}

#[test]
fn test_dropping_view_keeps_region() {
    let dir = tempfile::tempdir().unwrap();
    let mut pool = producer(dir.path(), 2);
    pool.allocate_with_id("buf-1", 4, 4, 1)
        .unwrap()
        .write_pixels(&[9u8; 16])
        .unwrap();

    let store = FrameStore::new(dir.path());
    drop(store.map_read_only("buf-1", 4, 4, 1).unwrap());

    let again = store.map_read_only("buf-1", 4, 4, 1).unwrap();
    assert_eq!(again.as_slice(), &[9u8; 16]);
}

#[test]
fn test_view_outlives_eviction() {
    let dir = tempfile::tempdir().unwrap();
    let mut pool = producer(dir.path(), 1);
    pool.allocate_with_id("buf-1", 2, 2, 1)
        .unwrap()
        .write_pixels(&[1, 2, 3, 4])
        .unwrap();

    let view = pool.store().map_read_only("buf-1", 2, 2, 1).unwrap();
    pool.allocate(2, 2, 1).unwrap();

    assert!(!dir.path().join("buf-1").exists());
    assert_eq!(view.as_slice(), &[1, 2, 3, 4]);
}

#[test]
fn test_wrong_geometry_is_size_mismatch() {
    let dir = tempfile::tempdir().unwrap();
    let mut pool = producer(dir.path(), 2);
    pool.allocate_with_id("buf-1", 64, 48, 4).unwrap();

    let err = pool.store().map_read_only("buf-1", 64, 48, 3).unwrap_err();
    assert!(matches!(err, ShmError::SizeMismatch { .. }));
}

#[test]
fn test_invalid_ids_rejected_on_both_sides() {
    let dir = tempfile::tempdir().unwrap();
    let mut pool = producer(dir.path(), 2);
    assert!(matches!(
        pool.allocate_with_id("../escape", 2, 2, 1),
        Err(ShmError::InvalidId(_))
    ));
    assert!(matches!(
        FrameStore::new(dir.path()).map_read_only("a/b", 2, 2, 1),
        Err(ShmError::InvalidId(_))
    ));
}

#[test]
fn test_zero_geometry_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let mut pool = producer(dir.path(), 2);
    assert!(matches!(
        pool.allocate(0, 48, 4),
        Err(ShmError::InvalidDimensions { .. })
    ));
    assert!(pool.is_empty());
}

#[test]
fn test_pool_drop_cleans_up() {
    let dir = tempfile::tempdir().unwrap();
    let store = FrameStore::new(dir.path());
    {
        let mut pool = producer(dir.path(), 3);
        for _ in 0..3 {
            pool.allocate(2, 2, 1).unwrap();
        }
        assert!(store.map_read_only("buf-3", 2, 2, 1).is_ok());
    }
    assert!(store.map_read_only("buf-3", 2, 2, 1).unwrap_err().is_transient());
}

#[test]
fn test_configured_history_keeps_three_frames() {
    let dir = tempfile::tempdir().unwrap();
    let frames = FramesConfig {
        history_capacity: 3,
        shm_dir: Some(dir.path().to_path_buf()),
        ..FramesConfig::default()
    };
    let mut pool = FrameBufferPool::new(PoolConfig::from_config(&frames)).unwrap();

    let ids: Vec<String> = (0..4)
        .map(|_| pool.allocate(8, 8, 4).unwrap().id().to_string())
        .collect();

    let store = FrameStore::new(dir.path());
    assert!(store.map_read_only(&ids[0], 8, 8, 4).unwrap_err().is_transient());
    for id in &ids[1..] {
        assert_eq!(store.map_read_only(id, 8, 8, 4).unwrap().len(), 256);
    }
}

#[test]
fn test_generated_ids_avoid_caller_ids() {
    let dir = tempfile::tempdir().unwrap();
    let mut pool = producer(dir.path(), 3);

    pool.allocate_with_id("buf-2", 2, 2, 1).unwrap();
    let first = pool.allocate(2, 2, 1).unwrap().id().to_string();
    let second = pool.allocate(2, 2, 1).unwrap().id().to_string();

    assert_eq!(first, "buf-1");
    assert_eq!(second, "buf-3");
    for id in ["buf-1", "buf-2", "buf-3"] {
        assert!(pool.store().map_read_only(id, 2, 2, 1).is_ok());
    }
}
