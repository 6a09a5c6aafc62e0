// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Consumer-side access to frame regions

use memmap2::Mmap;
use std::fs::File;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::buffer::{FrameBuffer, FrameGeometry};
use crate::error::{ShmError, ShmResult};

/// `/dev/shm` when it exists, the OS temp dir otherwise
pub fn default_shm_dir() -> PathBuf {
    let dev_shm = Path::new("/dev/shm");
    if dev_shm.is_dir() {
        dev_shm.to_path_buf()
    } else {
        std::env::temp_dir()
    }
}

/// Buffer ids become file names; reject anything that could escape the directory
pub fn validate_buffer_id(id: &str) -> ShmResult<()> {
    let bad = id.is_empty()
        || id.len() > 200
        || id == "."
        || id.contains("..")
        || id.contains('/')
        || id.contains('\\')
        || id.contains('\0');
    if bad {
        return Err(ShmError::InvalidId(id.to_string()));
    }
    Ok(())
}

/// Read-only view of a shared-memory directory
#[derive(Debug, Clone)]
pub struct FrameStore {
    dir: PathBuf,
}

impl Default for FrameStore {
    fn default() -> Self {
        Self::new(default_shm_dir())
    }
}

impl FrameStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, id: &str) -> ShmResult<PathBuf> {
        validate_buffer_id(id)?;
        Ok(self.dir.join(id))
    }

    /// Map an existing region without taking ownership of it
    ///
    /// The view is backed by a `PROT_READ` mapping of a file opened read-only;
    /// it cannot be written and dropping it leaves the region in place.
    ///
    /// # Errors
    ///
    /// [`ShmError::TransientMiss`] when the id no longer resolves, which is
    /// expected when this consumer lags the producer's history.
    pub fn map_read_only(
        &self,
        id: &str,
        width: u32,
        height: u32,
        bytes_per_pixel: usize,
    ) -> ShmResult<FrameBuffer> {
        let geometry = FrameGeometry::new(width, height, bytes_per_pixel);
        let expected = geometry.byte_len()?;
        let path = self.path_for(id)?;

        let file = match File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("[SHM] {} already recycled", id);
                return Err(ShmError::TransientMiss(id.to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        // The open handle keeps the region alive even if the producer
        // unlinks it before we are done
        let actual = file.metadata()?.len();
        if actual != expected as u64 {
            return Err(ShmError::SizeMismatch {
                id: id.to_string(),
                expected,
                actual,
            });
        }

        // SAFETY: the mapping is read-only and sized from the file's current
        // length; the producer never truncates a live region
        let map = unsafe { Mmap::map(&file)? };

        Ok(FrameBuffer::mapped(id.to_string(), geometry, path, map))
    }
}
