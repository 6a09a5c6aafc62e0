// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! ZMQ PUB pattern (server-side publish-subscribe)
//!
//! The broker binds one PUB socket as the fan-out point. Subscribers filter by
//! topic prefix on their side; messages with no matching subscriber are dropped.

use crate::common::{ServerConfig, SocketStats, TransportError, TransportResult};
use crate::traits::{Publisher, Transport};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::info;

/// ZMQ PUB socket implementation (fan-out publisher)
pub struct ZmqPub {
    context: Arc<zmq::Context>,
    config: ServerConfig,
    socket: Arc<Mutex<Option<zmq::Socket>>>,
    running: Arc<Mutex<bool>>,
    stats: Arc<SocketStats>,
}

impl ZmqPub {
    /// Create a new PUB socket
    pub fn new(context: Arc<zmq::Context>, config: ServerConfig) -> TransportResult<Self> {
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
        Self::new(context, ServerConfig::new(address))
    }

    pub fn stats(&self) -> Arc<SocketStats> {
        Arc::clone(&self.stats)
    }

    pub fn address(&self) -> &str {
        &self.config.base.address
    }
}

impl Transport for ZmqPub {
    fn start(&mut self) -> TransportResult<()> {
        if *self.running.lock() {
            return Err(TransportError::AlreadyRunning);
        }

        let socket = self.context.socket(zmq::PUB)?;
        socket.set_linger(self.config.base.linger_ms())?;
        socket.set_sndhwm(self.config.base.send_hwm as i32)?;
        // PUB drops on HWM instead of blocking; the timeout only bounds the syscall
        socket.set_sndtimeo(self.config.base.send_timeout_ms())?;

        socket
            .bind(&self.config.base.address)
            .map_err(|e| TransportError::BindFailed(format!("{}: {}", self.config.base.address, e)))?;

        *self.socket.lock() = Some(socket);
        *self.running.lock() = true;

        info!("🦀 [ZMQ-PUB] Listening on {}", self.config.base.address);

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
        "zmq-pub"
    }
}

impl Publisher for ZmqPub {
    fn publish(&self, topic: &[u8], data: &[u8]) -> TransportResult<()> {
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
