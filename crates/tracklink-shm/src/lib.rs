// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # tracklink-shm
//!
//! Raw frame pixels travel between processes through shared memory, referenced
//! on the bus by buffer id instead of being copied into messages.
//!
//! Ownership rule:
//! - Exactly one process, the producer, creates and destroys a region. It
//!   keeps a bounded history of recent buffers ([`FrameBufferPool`]); the
//!   oldest is destroyed once the history exceeds its capacity.
//! - Every other process maps regions read-only through [`FrameStore`].
//!   Mapped buffers are flagged as not owned, so dropping them never destroys
//!   the region.
//! - There is no cross-process locking. A consumer that falls more than the
//!   history capacity behind gets [`ShmError::TransientMiss`] and should skip
//!   the frame.
//!
//! Regions are plain files in a memory-backed directory (`/dev/shm` on Linux)
//! mapped with `memmap2`.

pub mod buffer;
pub mod error;
pub mod pool;
pub mod store;

pub use buffer::{FrameBuffer, FrameGeometry};
pub use error::{ShmError, ShmResult};
pub use pool::{FrameBufferPool, PoolConfig, DEFAULT_HISTORY_CAPACITY};
pub use store::{default_shm_dir, validate_buffer_id, FrameStore};
