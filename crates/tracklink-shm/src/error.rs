// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Frame buffer errors

use thiserror::Error;

pub type ShmResult<T> = Result<T, ShmError>;

#[derive(Debug, Error)]
pub enum ShmError {
    /// The id no longer resolves: the producer already recycled it
    #[error("frame buffer '{0}' is gone (consumer fell behind)")]
    TransientMiss(String),

    #[error("frame buffer '{0}' is mapped read-only")]
    ReadOnly(String),

    #[error("frame buffer '{id}' is {actual} bytes, expected {expected}")]
    SizeMismatch {
        id: String,
        expected: usize,
        actual: u64,
    },

    #[error("invalid frame geometry {width}x{height}x{bytes_per_pixel}")]
    InvalidDimensions {
        width: u32,
        height: u32,
        bytes_per_pixel: usize,
    },

    #[error("frame history capacity must be at least 1, got {0}")]
    InvalidCapacity(usize),

    #[error("invalid frame buffer id '{0}'")]
    InvalidId(String),

    #[error("frame buffer '{0}' already exists")]
    AlreadyExists(String),

    #[error("shared memory I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ShmError {
    /// Expected under lag; skip the frame and keep going
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::TransientMiss(_))
    }
}
