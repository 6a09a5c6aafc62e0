// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Presentation timestamps in nanoseconds

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};

/// Frame presentation time, nanoseconds from stream start
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Timestamp(pub u64);

impl Timestamp {
    pub const ZERO: Timestamp = Timestamp(0);

    pub const fn from_nanos(ns: u64) -> Self {
        Self(ns)
    }

    pub const fn from_millis(ms: u64) -> Self {
        Self(ms.saturating_mul(1_000_000))
    }

    pub const fn as_nanos(&self) -> u64 {
        self.0
    }

    pub const fn as_millis(&self) -> u64 {
        self.0 / 1_000_000
    }

    /// Absolute distance between two timestamps
    pub fn difference(&self, other: &Timestamp) -> Timestamp {
        Timestamp(self.0.abs_diff(other.0))
    }
}

impl Add for Timestamp {
    type Output = Timestamp;

    fn add(self, rhs: Timestamp) -> Timestamp {
        Timestamp(self.0.saturating_add(rhs.0))
    }
}

impl Sub for Timestamp {
    type Output = Timestamp;

    fn sub(self, rhs: Timestamp) -> Timestamp {
        Timestamp(self.0.saturating_sub(rhs.0))
    }
}

/// `HH:MM:SS`, wrapping at 24 hours
impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let total_secs = self.as_millis() / 1000;
        let s = total_secs % 60;
        let m = (total_secs / 60) % 60;
        let h = (total_secs / 3600) % 24;
        write!(f, "{:02}:{:02}:{:02}", h, m, s)
    }
}
