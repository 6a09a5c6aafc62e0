// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Common configuration types for transports

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Generic transport configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Address to bind (server) or connect (client)
    pub address: String,

    /// Send timeout (None = block until the high water mark drains)
    pub send_timeout: Option<Duration>,

    /// High water mark for send buffer (0 = unlimited)
    pub send_hwm: usize,

    /// High water mark for receive buffer (0 = unlimited)
    pub recv_hwm: usize,

    /// Linger time on close (None = drop pending messages immediately)
    pub linger: Option<Duration>,

    /// Maximum payload size (None = unlimited)
    pub max_message_size: Option<usize>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            address: "tcp://127.0.0.1:6667".to_string(),
            send_timeout: Some(Duration::from_secs(1)),
            send_hwm: 1000,
            recv_hwm: 1000,
            linger: None,
            max_message_size: Some(16 * 1024 * 1024),
        }
    }
}

impl TransportConfig {
    /// Create a new config with the given address
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            ..Default::default()
        }
    }

    pub fn with_send_timeout(mut self, timeout: Duration) -> Self {
        self.send_timeout = Some(timeout);
        self
    }

    pub fn with_blocking_send(mut self) -> Self {
        self.send_timeout = None;
        self
    }

    pub fn with_send_hwm(mut self, hwm: usize) -> Self {
        self.send_hwm = hwm;
        self
    }

    pub fn with_recv_hwm(mut self, hwm: usize) -> Self {
        self.recv_hwm = hwm;
        self
    }

    pub fn with_linger(mut self, linger: Duration) -> Self {
        self.linger = Some(linger);
        self
    }

    pub fn with_max_message_size(mut self, size: usize) -> Self {
        self.max_message_size = Some(size);
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.address.is_empty() {
            return Err("Address cannot be empty".to_string());
        }

        if let Some(max_size) = self.max_message_size {
            if max_size == 0 {
                return Err("Maximum message size must be greater than 0".to_string());
            }
        }

        Ok(())
    }

    /// Reject payloads above the configured maximum
    pub fn check_size(&self, size: usize) -> crate::TransportResult<()> {
        match self.max_message_size {
            Some(max_size) if size > max_size => {
                Err(crate::TransportError::MessageTooLarge { size, max_size })
            }
            _ => Ok(()),
        }
    }

    pub(crate) fn linger_ms(&self) -> i32 {
        self.linger
            .map(|d| d.as_millis().min(i32::MAX as u128) as i32)
            .unwrap_or(0)
    }

    pub(crate) fn send_timeout_ms(&self) -> i32 {
        self.send_timeout
            .map(|d| d.as_millis().min(i32::MAX as u128) as i32)
            .unwrap_or(-1)
    }
}

/// Configuration for bound (broker-side) sockets
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(flatten)]
    pub base: TransportConfig,
}

impl ServerConfig {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            base: TransportConfig::new(address),
        }
    }
}

/// Configuration for connected (component-side) sockets
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(flatten)]
    pub base: TransportConfig,

    /// Delay between reconnect attempts when the peer goes away
    pub reconnect_interval: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base: TransportConfig::default(),
            reconnect_interval: Duration::from_millis(100),
        }
    }
}

impl ClientConfig {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            base: TransportConfig::new(address),
            ..Default::default()
        }
    }
}
