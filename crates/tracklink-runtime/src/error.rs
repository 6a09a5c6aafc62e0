// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Runtime errors

use thiserror::Error;
use tracklink_bus::BusError;
use tracklink_shm::ShmError;

pub type RuntimeResult<T> = Result<T, RuntimeError>;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Bus(#[from] BusError),

    #[error("frame buffer error: {0}")]
    Frame(#[from] ShmError),

    /// A field the component needs is missing or has the wrong type
    #[error("configuration field '{field}': {reason}")]
    Configuration { field: String, reason: String },

    /// A handler gave up
    #[error("component failure: {0}")]
    Component(String),
}

impl RuntimeError {
    pub fn configuration(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Configuration {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Whether this should end the process
    ///
    /// Missed frames and undecodable steady-state messages are skipped; the
    /// run loop never surfaces them. Everything else, including handshake
    /// failures of any kind, ends the run.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Frame(e) => !e.is_transient(),
            Self::Bus(BusError::Decode { .. }) => false,
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_fatality() {
        assert!(!RuntimeError::Frame(ShmError::TransientMiss("buf-1".into())).is_fatal());
        assert!(RuntimeError::Frame(ShmError::ReadOnly("buf-1".into())).is_fatal());
        assert!(RuntimeError::Bus(BusError::HandshakeTimeout {
            core_id: "TrackerCore".into(),
            waited: Duration::from_secs(10),
        })
        .is_fatal());
        assert!(RuntimeError::configuration("model", "missing").is_fatal());
    }
}
