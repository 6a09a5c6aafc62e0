// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! ZMQ SUB pattern (client-side publish-subscribe)
//!
//! Components connect one SUB socket to the broker's fan-out. Filtering is
//! byte-prefix matching on the topic frame, done by libzmq.

use crate::common::{ClientConfig, SocketStats, TopicFrame, TransportError, TransportResult};
use crate::traits::{Subscriber, Transport};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info};

/// ZMQ SUB socket implementation (subscriber)
pub struct ZmqSub {
    context: Arc<zmq::Context>,
    config: ClientConfig,
    socket: Arc<Mutex<Option<zmq::Socket>>>,
    running: Arc<Mutex<bool>>,
    stats: Arc<SocketStats>,
}

impl ZmqSub {
    /// Create a new SUB socket
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

impl Transport for ZmqSub {
    fn start(&mut self) -> TransportResult<()> {
        if *self.running.lock() {
            return Err(TransportError::AlreadyRunning);
        }

        let socket = self.context.socket(zmq::SUB)?;
        socket.set_linger(self.config.base.linger_ms())?;
        socket.set_rcvhwm(self.config.base.recv_hwm as i32)?;
        socket.set_reconnect_ivl(self.config.reconnect_interval.as_millis() as i32)?;
        socket.set_conflate(false)?; // Keep all messages

        socket
            .connect(&self.config.base.address)
            .map_err(|e| TransportError::ConnectFailed(format!("{}: {}", self.config.base.address, e)))?;

        *self.socket.lock() = Some(socket);
        *self.running.lock() = true;

        info!("🦀 [ZMQ-SUB] Connected to {}", self.config.base.address);

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
        "zmq-sub"
    }
}

impl Subscriber for ZmqSub {
    fn subscribe(&mut self, topic: &[u8]) -> TransportResult<()> {
        let sock_guard = self.socket.lock();
        let sock = sock_guard.as_ref().ok_or(TransportError::NotRunning)?;

        sock.set_subscribe(topic)?;
        debug!("[ZMQ-SUB] Subscribed to {:?}", String::from_utf8_lossy(topic));

        Ok(())
    }

    fn unsubscribe(&mut self, topic: &[u8]) -> TransportResult<()> {
        let sock_guard = self.socket.lock();
        let sock = sock_guard.as_ref().ok_or(TransportError::NotRunning)?;

        sock.set_unsubscribe(topic)?;

        Ok(())
    }

    fn receive_timeout(&self, timeout_ms: i64) -> TransportResult<Option<TopicFrame>> {
        let sock_guard = self.socket.lock();
        let sock = sock_guard.as_ref().ok_or(TransportError::NotRunning)?;

        match crate::zmq::recv_topic_frame(sock, timeout_ms) {
            Ok(Some(frame)) => {
                self.stats.record_received(frame.len());
                Ok(Some(frame))
            }
            Ok(None) => Ok(None),
            Err(e) => {
                self.stats.record_error();
                Err(e)
            }
        }
    }
}
