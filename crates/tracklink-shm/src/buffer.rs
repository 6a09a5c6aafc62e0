// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! One shared-memory frame region

use memmap2::{Mmap, MmapMut};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{trace, warn};

use crate::error::{ShmError, ShmResult};

/// Width, height and pixel size of a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameGeometry {
    pub width: u32,
    pub height: u32,
    pub bytes_per_pixel: usize,
}

impl FrameGeometry {
    pub fn new(width: u32, height: u32, bytes_per_pixel: usize) -> Self {
        Self {
            width,
            height,
            bytes_per_pixel,
        }
    }

    /// `width * height * bytes_per_pixel`, rejecting empty or overflowing frames
    pub fn byte_len(&self) -> ShmResult<usize> {
        let invalid = || ShmError::InvalidDimensions {
            width: self.width,
            height: self.height,
            bytes_per_pixel: self.bytes_per_pixel,
        };
        let len = (self.width as usize)
            .checked_mul(self.height as usize)
            .and_then(|px| px.checked_mul(self.bytes_per_pixel))
            .ok_or_else(invalid)?;
        if len == 0 {
            return Err(invalid());
        }
        Ok(len)
    }
}

pub(crate) enum Region {
    Writable(MmapMut),
    ReadOnly(Mmap),
}

/// A mapped frame region
///
/// `owned` is set for buffers the current process created and cleared for
/// buffers it merely mapped. Drop consults it once: owned regions are
/// destroyed, mapped ones are only unmapped.
pub struct FrameBuffer {
    id: String,
    geometry: FrameGeometry,
    owner_pid: Option<u32>,
    path: PathBuf,
    region: Region,
    owned: bool,
}

impl FrameBuffer {
    pub(crate) fn owned(id: String, geometry: FrameGeometry, path: PathBuf, map: MmapMut) -> Self {
        Self {
            id,
            geometry,
            owner_pid: Some(std::process::id()),
            path,
            region: Region::Writable(map),
            owned: true,
        }
    }

    pub(crate) fn mapped(id: String, geometry: FrameGeometry, path: PathBuf, map: Mmap) -> Self {
        Self {
            id,
            geometry,
            owner_pid: None,
            path,
            region: Region::ReadOnly(map),
            owned: false,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn width(&self) -> u32 {
        self.geometry.width
    }

    pub fn height(&self) -> u32 {
        self.geometry.height
    }

    pub fn bytes_per_pixel(&self) -> usize {
        self.geometry.bytes_per_pixel
    }

    pub fn geometry(&self) -> FrameGeometry {
        self.geometry
    }

    /// Pid of the creating process when this process is the owner
    pub fn owner_pid(&self) -> Option<u32> {
        self.owner_pid
    }

    pub fn is_owned(&self) -> bool {
        self.owned
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_slice(&self) -> &[u8] {
        match &self.region {
            Region::Writable(map) => &map[..],
            Region::ReadOnly(map) => &map[..],
        }
    }

    /// Pixel bytes for writing; only the owning producer may write
    pub fn as_mut_slice(&mut self) -> ShmResult<&mut [u8]> {
        match &mut self.region {
            Region::Writable(map) => Ok(&mut map[..]),
            Region::ReadOnly(_) => Err(ShmError::ReadOnly(self.id.clone())),
        }
    }

    /// Copy `pixels` into the region; lengths must match exactly
    pub fn write_pixels(&mut self, pixels: &[u8]) -> ShmResult<()> {
        let expected = self.len();
        if !self.owned {
            return Err(ShmError::ReadOnly(self.id.clone()));
        }
        if pixels.len() != expected {
            return Err(ShmError::SizeMismatch {
                id: self.id.clone(),
                expected,
                actual: pixels.len() as u64,
            });
        }
        self.as_mut_slice()?.copy_from_slice(pixels);
        Ok(())
    }
}

impl fmt::Debug for FrameBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameBuffer")
            .field("id", &self.id)
            .field("geometry", &self.geometry)
            .field("owner_pid", &self.owner_pid)
            .field("owned", &self.owned)
            .finish()
    }
}

impl Drop for FrameBuffer {
    fn drop(&mut self) {
        if !self.owned {
            trace!("[SHM] Unmapped {}", self.id);
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => trace!("[SHM] Destroyed {}", self.id),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("[SHM] Failed to destroy {}: {}", self.path.display(), e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_byte_len() {
        assert_eq!(FrameGeometry::new(64, 48, 4).byte_len().unwrap(), 12288);
        assert_eq!(FrameGeometry::new(3, 2, 3).byte_len().unwrap(), 18);
    }

    #[test]
    fn test_empty_geometry_rejected() {
        for geometry in [
            FrameGeometry::new(0, 48, 4),
            FrameGeometry::new(64, 0, 4),
            FrameGeometry::new(64, 48, 0),
        ] {
            assert!(matches!(
                geometry.byte_len(),
                Err(ShmError::InvalidDimensions { .. })
            ));
        }
    }

    #[test]
    fn test_overflow_rejected() {
        let geometry = FrameGeometry::new(u32::MAX, u32::MAX, usize::MAX);
        assert!(geometry.byte_len().is_err());
    }
}
