// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Common error types for all transports

use thiserror::Error;

/// Result type alias for transport operations
pub type TransportResult<T> = Result<T, TransportError>;

/// Transport-agnostic error type
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Initialization failed: {0}")]
    InitializationFailed(String),

    #[error("Bind failed: {0}")]
    BindFailed(String),

    #[error("Connect failed: {0}")]
    ConnectFailed(String),

    #[error("Send failed: {0}")]
    SendFailed(String),

    #[error("Receive failed: {0}")]
    ReceiveFailed(String),

    /// A bounded send could not complete (peer gone and high water mark reached)
    #[error("Operation timed out")]
    Timeout,

    #[error("Transport is not running")]
    NotRunning,

    #[error("Transport is already running")]
    AlreadyRunning,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Message too large: {size} bytes (max: {max_size})")]
    MessageTooLarge { size: usize, max_size: usize },

    /// Wrong frame count or similar framing violation
    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    #[cfg(any(feature = "zmq-server", feature = "zmq-client"))]
    #[error("ZMQ error: {0}")]
    Zmq(zmq::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TransportError {
    /// Whether retrying the same operation later could succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout | Self::SendFailed(_) | Self::ReceiveFailed(_))
    }
}

#[cfg(any(feature = "zmq-server", feature = "zmq-client"))]
impl From<zmq::Error> for TransportError {
    fn from(err: zmq::Error) -> Self {
        match err {
            zmq::Error::EAGAIN => Self::Timeout,
            _ => Self::Zmq(err),
        }
    }
}

impl From<String> for TransportError {
    fn from(msg: String) -> Self {
        Self::InvalidConfig(msg)
    }
}
