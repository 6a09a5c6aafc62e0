// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! ZMQ PUSH pattern (client-side push-pull)
//!
//! Every publisher connects one PUSH socket to the broker's shared ingress.
//! Sends are fire-and-forget; a bounded send timeout keeps a missing broker
//! from stalling the caller once the high water mark fills.

use crate::common::{ClientConfig, SocketStats, TransportError, TransportResult};
use crate::traits::{Push, Transport};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::info;

/// ZMQ PUSH socket implementation (ingress sender)
pub struct ZmqPush {
    context: Arc<zmq::Context>,
    config: ClientConfig,
    socket: Arc<Mutex<Option<zmq::Socket>>>,
    running: Arc<Mutex<bool>>,
    stats: Arc<SocketStats>,
}

impl ZmqPush {
    /// Create a new PUSH socket
    pub fn new(context: Arc<zmq::Context>, config: ClientConfig) -> TransportResult<Self> {
        config.base.validate()?;

        Ok(Self {
            context,
            config,
            socket: Arc::new(Mutex::new(None)),
            running: Arc::new(Mutex::new(false)),
            stats: Arc::new(SocketStats::default()),
        })
    }

    /// Create with default context
    pub fn with_address(address: impl Into<String>) -> TransportResult<Self> {
        let context = Arc::new(zmq::Context::new());
        Self::new(context, ClientConfig::new(address))
    }

    pub fn stats(&self) -> Arc<SocketStats> {
        Arc::clone(&self.stats)
    }
}

impl Transport for ZmqPush {
    fn start(&mut self) -> TransportResult<()> {
        if *self.running.lock() {
            return Err(TransportError::AlreadyRunning);
        }

        let socket = self.context.socket(zmq::PUSH)?;
        socket.set_linger(self.config.base.linger_ms())?;
        socket.set_sndhwm(self.config.base.send_hwm as i32)?;
        socket.set_sndtimeo(self.config.base.send_timeout_ms())?;
        socket.set_reconnect_ivl(self.config.reconnect_interval.as_millis() as i32)?;
        // Queue while the broker is still coming up
        socket.set_immediate(false)?;

        socket
            .connect(&self.config.base.address)
            .map_err(|e| TransportError::ConnectFailed(format!("{}: {}", self.config.base.address, e)))?;

        *self.socket.lock() = Some(socket);
        *self.running.lock() = true;

        info!("🦀 [ZMQ-PUSH] Connected to {}", self.config.base.address);

        Ok(())
    }

    fn stop(&mut self) -> TransportResult<()> {
        *self.running.lock() = false;
        *self.socket.lock() = None;
        Ok(())
    }

    fn is_running(&self) -> bool {
        *self.running.lock()
    }

    fn transport_type(&self) -> &str {
        "zmq-push"
    }
}

impl Push for ZmqPush {
    fn push(&self, topic: &[u8], data: &[u8]) -> TransportResult<()> {
        let sock_guard = self.socket.lock();
        let sock = sock_guard.as_ref().ok_or(TransportError::NotRunning)?;

        self.config.base.check_size(data.len())?;

        match crate::zmq::send_topic_frame(sock, topic, data) {
            Ok(()) => {
                self.stats.record_sent(topic.len() + data.len());
                Ok(())
            }
            Err(e) => {
                self.stats.record_error();
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_creation() {
        let context = Arc::new(zmq::Context::new());
        let config = ClientConfig::new("tcp://127.0.0.1:30040");
        assert!(ZmqPush::new(context, config).is_ok());
    }

    #[test]
    fn test_push_start_stop() {
        let mut push = ZmqPush::with_address("tcp://127.0.0.1:30041").unwrap();
        push.start().unwrap();
        assert!(push.is_running());
        push.stop().unwrap();
        assert!(!push.is_running());
    }

    #[test]
    fn test_push_not_running() {
        let push = ZmqPush::with_address("tcp://127.0.0.1:30042").unwrap();
        assert!(matches!(push.push(b"t", b"d"), Err(TransportError::NotRunning)));
    }

    #[test]
    fn test_push_queues_without_peer() {
        // Connect without a bound peer: the first sends queue instead of failing
        let mut push = ZmqPush::with_address("tcp://127.0.0.1:30043").unwrap();
        push.start().unwrap();
        push.push(b"FEATURES", b"{}").unwrap();
    }
}
