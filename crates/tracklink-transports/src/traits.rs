// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Transport trait definitions
//!
//! Roles are split the way the bus uses them: bound sockets (publisher, pull)
//! live in the broker, connected sockets (subscriber, push) live in components.

use crate::common::{TopicFrame, TransportResult};

/// Base transport trait - implemented by all transports
pub trait Transport: Send + Sync {
    /// Start the transport (bind or connect)
    fn start(&mut self) -> TransportResult<()>;

    /// Stop the transport and release the socket
    fn stop(&mut self) -> TransportResult<()>;

    /// Check if transport is running
    fn is_running(&self) -> bool;

    /// Get transport name/type
    fn transport_type(&self) -> &str;
}

/// Publish-Subscribe pattern (Publisher side)
pub trait Publisher: Transport {
    /// Publish one `[topic, data]` message to all matching subscribers
    fn publish(&self, topic: &[u8], data: &[u8]) -> TransportResult<()>;
}

/// Publish-Subscribe pattern (Subscriber side)
pub trait Subscriber: Transport {
    /// Add a topic prefix filter
    fn subscribe(&mut self, topic: &[u8]) -> TransportResult<()>;

    /// Remove a topic prefix filter
    fn unsubscribe(&mut self, topic: &[u8]) -> TransportResult<()>;

    /// Receive the next published message, `None` on timeout
    fn receive_timeout(&self, timeout_ms: i64) -> TransportResult<Option<TopicFrame>>;

    /// Block until a message arrives
    fn receive(&self) -> TransportResult<TopicFrame> {
        loop {
            if let Some(frame) = self.receive_timeout(-1)? {
                return Ok(frame);
            }
        }
    }
}

/// Push-Pull pattern (Push side)
pub trait Push: Transport {
    /// Push one `[topic, data]` message toward the pull side
    fn push(&self, topic: &[u8], data: &[u8]) -> TransportResult<()>;
}

/// Push-Pull pattern (Pull side)
pub trait Pull: Transport {
    /// Pull the next message, `None` on timeout
    fn pull_timeout(&self, timeout_ms: i64) -> TransportResult<Option<TopicFrame>>;
}

/// Statistics tracking
///
/// For monitoring transport throughput and health.
pub trait TransportStats {
    /// Get total messages sent
    fn messages_sent(&self) -> u64;

    /// Get total messages received
    fn messages_received(&self) -> u64;

    /// Get total bytes sent
    fn bytes_sent(&self) -> u64;

    /// Get total bytes received
    fn bytes_received(&self) -> u64;

    /// Get error count
    fn error_count(&self) -> u64;
}
