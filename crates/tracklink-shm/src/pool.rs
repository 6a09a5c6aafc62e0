// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Producer-side frame allocation with bounded history

use memmap2::MmapMut;
use std::collections::VecDeque;
use std::fs::OpenOptions;
use std::io::ErrorKind;
#[cfg(unix)]
use std::os::unix::fs::OpenOptionsExt;
use std::path::PathBuf;
use tracing::{debug, info};

use tracklink_config::FramesConfig;

use crate::buffer::{FrameBuffer, FrameGeometry};
use crate::error::{ShmError, ShmResult};
use crate::store::{default_shm_dir, FrameStore};

pub const DEFAULT_HISTORY_CAPACITY: usize = 2;

/// Generated ids tried per `allocate` before giving up
const MAX_ID_ATTEMPTS: usize = 1024;

#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Directory holding the regions
    pub dir: PathBuf,
    /// Recent buffers kept alive for lagging consumers (at least 1)
    pub capacity: usize,
    /// Prefix of generated ids: `<prefix>-<sequence>`
    pub id_prefix: String,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            dir: default_shm_dir(),
            capacity: DEFAULT_HISTORY_CAPACITY,
            id_prefix: format!("tracklink-{}", uuid::Uuid::now_v7().simple()),
        }
    }
}

impl PoolConfig {
    /// Capacity and directory from the `[frames]` section; the id prefix stays generated
    pub fn from_config(frames: &FramesConfig) -> Self {
        Self {
            dir: frames.shm_dir.clone().unwrap_or_else(default_shm_dir),
            capacity: frames.history_capacity,
            ..Self::default()
        }
    }

    pub fn with_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dir = dir.into();
        self
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn with_id_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.id_prefix = prefix.into();
        self
    }
}

/// Owns every region this process created that is still in history
///
/// Dropping the pool destroys whatever it still holds.
pub struct FrameBufferPool {
    config: PoolConfig,
    history: VecDeque<FrameBuffer>,
    next_sequence: u64,
    allocated: u64,
    evicted: u64,
}

impl FrameBufferPool {
    pub fn new(config: PoolConfig) -> ShmResult<Self> {
        crate::store::validate_buffer_id(&config.id_prefix)?;
        if config.capacity == 0 {
            return Err(ShmError::InvalidCapacity(config.capacity));
        }
        std::fs::create_dir_all(&config.dir)?;

        info!(
            "[SHM] Frame pool in {} (history {}, prefix {})",
            config.dir.display(),
            config.capacity,
            config.id_prefix
        );

        Ok(Self {
            history: VecDeque::with_capacity(config.capacity + 1),
            config,
            next_sequence: 1,
            allocated: 0,
            evicted: 0,
        })
    }

    /// Allocate a region with a fresh id
    ///
    /// Sequence numbers already taken, by a caller-chosen id or by a stale
    /// file in the directory, are skipped.
    pub fn allocate(
        &mut self,
        width: u32,
        height: u32,
        bytes_per_pixel: usize,
    ) -> ShmResult<&mut FrameBuffer> {
        let mut attempts = 0;
        loop {
            let id = format!("{}-{}", self.config.id_prefix, self.next_sequence);
            self.next_sequence += 1;
            attempts += 1;
            if self.get(&id).is_some() {
                continue;
            }
            match self.create(id, width, height, bytes_per_pixel) {
                Ok(()) => break,
                Err(ShmError::AlreadyExists(id)) if attempts < MAX_ID_ATTEMPTS => {
                    debug!("[SHM] {} already exists, skipping", id);
                }
                Err(e) => return Err(e),
            }
        }
        self.newest_mut()
    }

    /// Allocate a region under a caller-chosen id
    ///
    /// The new buffer enters the history; if that pushes the history past its
    /// capacity the oldest buffer is destroyed.
    pub fn allocate_with_id(
        &mut self,
        id: impl Into<String>,
        width: u32,
        height: u32,
        bytes_per_pixel: usize,
    ) -> ShmResult<&mut FrameBuffer> {
        self.create(id.into(), width, height, bytes_per_pixel)?;
        self.newest_mut()
    }

    fn create(
        &mut self,
        id: String,
        width: u32,
        height: u32,
        bytes_per_pixel: usize,
    ) -> ShmResult<()> {
        let geometry = FrameGeometry::new(width, height, bytes_per_pixel);
        let len = geometry.byte_len()?;
        let path = FrameStore::new(&self.config.dir).path_for(&id)?;

        let mut options = OpenOptions::new();
        options.read(true).write(true).create_new(true);
        #[cfg(unix)]
        options.mode(0o644);

        let file = options.open(&path).map_err(|e| match e.kind() {
            ErrorKind::AlreadyExists => ShmError::AlreadyExists(id.clone()),
            _ => ShmError::Io(e),
        })?;
        let map_result = file.set_len(len as u64).and_then(|()| {
            // SAFETY: the file was just created by us with exactly `len` bytes
            unsafe { MmapMut::map_mut(&file) }
        });
        let map = match map_result {
            Ok(map) => map,
            Err(e) => {
                let _ = std::fs::remove_file(&path);
                return Err(e.into());
            }
        };

        debug!("[SHM] Allocated {} ({} bytes)", id, len);
        self.history.push_back(FrameBuffer::owned(id, geometry, path, map));
        self.allocated += 1;
        self.evict_overflow();
        Ok(())
    }

    fn newest_mut(&mut self) -> ShmResult<&mut FrameBuffer> {
        self.history
            .back_mut()
            .ok_or_else(|| ShmError::Io(std::io::Error::other("frame history is empty")))
    }

    fn evict_overflow(&mut self) {
        while self.history.len() > self.config.capacity {
            if let Some(oldest) = self.history.pop_front() {
                debug!("[SHM] Evicting {}", oldest.id());
                self.evicted += 1;
                drop(oldest);
            }
        }
    }

    /// Retune the history; shrinking evicts immediately
    pub fn set_capacity(&mut self, capacity: usize) {
        self.config.capacity = capacity.max(1);
        self.evict_overflow();
    }

    pub fn capacity(&self) -> usize {
        self.config.capacity
    }

    pub fn get(&self, id: &str) -> Option<&FrameBuffer> {
        self.history.iter().find(|b| b.id() == id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut FrameBuffer> {
        self.history.iter_mut().find(|b| b.id() == id)
    }

    pub fn latest(&self) -> Option<&FrameBuffer> {
        self.history.back()
    }

    /// Ids still alive, oldest first
    pub fn ids(&self) -> Vec<String> {
        self.history.iter().map(|b| b.id().to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    /// `(allocated, evicted)` since creation
    pub fn stats(&self) -> (u64, u64) {
        (self.allocated, self.evicted)
    }

    /// Reader over the same directory
    pub fn store(&self) -> FrameStore {
        FrameStore::new(&self.config.dir)
    }
}

impl Drop for FrameBufferPool {
    fn drop(&mut self) {
        debug!(
            "[SHM] Dropping frame pool: {} live, {} allocated, {} evicted",
            self.history.len(),
            self.allocated,
            self.evicted
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool_in(dir: &std::path::Path, capacity: usize) -> FrameBufferPool {
        FrameBufferPool::new(
            PoolConfig::default()
                .with_dir(dir)
                .with_capacity(capacity)
                .with_id_prefix("buf"),
        )
        .unwrap()
    }

    #[test]
    fn test_allocate_sizes_region_exactly() {
        let dir = tempfile::tempdir().unwrap();
        let mut pool = pool_in(dir.path(), 2);

        let buffer = pool.allocate(64, 48, 4).unwrap();
        assert_eq!(buffer.id(), "buf-1");
        assert_eq!(buffer.len(), 12288);
        assert!(buffer.is_owned());
        assert_eq!(buffer.owner_pid(), Some(std::process::id()));
        assert_eq!(std::fs::metadata(dir.path().join("buf-1")).unwrap().len(), 12288);
    }

    #[test]
    fn test_history_evicts_oldest() {
        let dir = tempfile::tempdir().unwrap();
        let mut pool = pool_in(dir.path(), 2);

        for _ in 0..3 {
            pool.allocate(4, 4, 3).unwrap();
        }

        assert_eq!(pool.ids(), vec!["buf-2", "buf-3"]);
        assert!(!dir.path().join("buf-1").exists());
        assert_eq!(pool.stats(), (3, 1));
    }

    #[test]
    fn test_shrinking_capacity_evicts() {
        let dir = tempfile::tempdir().unwrap();
        let mut pool = pool_in(dir.path(), 4);
        for _ in 0..4 {
            pool.allocate(2, 2, 1).unwrap();
        }

        pool.set_capacity(1);
        assert_eq!(pool.ids(), vec!["buf-4"]);

        pool.set_capacity(0);
        assert_eq!(pool.capacity(), 1);
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let result = FrameBufferPool::new(PoolConfig::default().with_dir(dir.path()).with_capacity(0));
        assert!(matches!(result, Err(ShmError::InvalidCapacity(0))));
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut pool = pool_in(dir.path(), 2);
        pool.allocate_with_id("buf-7", 2, 2, 1).unwrap();
        let err = pool.allocate_with_id("buf-7", 2, 2, 1).unwrap_err();
        assert!(matches!(err, ShmError::AlreadyExists(_)));
    }

    #[test]
    fn test_allocate_skips_ids_taken_by_caller() {
        let dir = tempfile::tempdir().unwrap();
        let mut pool = pool_in(dir.path(), 3);

        pool.allocate_with_id("buf-2", 2, 2, 1).unwrap();
        assert_eq!(pool.allocate(2, 2, 1).unwrap().id(), "buf-1");
        assert_eq!(pool.allocate(2, 2, 1).unwrap().id(), "buf-3");
        assert_eq!(pool.ids(), vec!["buf-2", "buf-1", "buf-3"]);
    }

    #[test]
    fn test_allocate_skips_stale_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("buf-1"), [0u8; 4]).unwrap();
        let mut pool = pool_in(dir.path(), 2);

        assert_eq!(pool.allocate(2, 2, 1).unwrap().id(), "buf-2");
        assert_eq!(pool.stats(), (1, 0));
    }

    #[test]
    fn test_config_from_frames_section() {
        let dir = tempfile::tempdir().unwrap();
        let frames = FramesConfig {
            history_capacity: 5,
            shm_dir: Some(dir.path().to_path_buf()),
            ..FramesConfig::default()
        };

        let config = PoolConfig::from_config(&frames);
        assert_eq!(config.capacity, 5);
        assert_eq!(config.dir, dir.path());
        assert!(config.id_prefix.starts_with("tracklink-"));
    }

    #[test]
    fn test_pool_drop_destroys_regions() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut pool = pool_in(dir.path(), 2);
            pool.allocate(2, 2, 1).unwrap();
            pool.allocate(2, 2, 1).unwrap();
        }
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_generated_prefix_is_unique() {
        let a = PoolConfig::default();
        let b = PoolConfig::default();
        assert_ne!(a.id_prefix, b.id_prefix);
    }
}
