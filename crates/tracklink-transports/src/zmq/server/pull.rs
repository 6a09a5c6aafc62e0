// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! ZMQ PULL pattern (server-side push-pull)
//!
//! The broker binds one PULL socket as the shared ingress for every local
//! publisher. Messages from all PUSH peers are fair-queued.

use crate::common::{ServerConfig, SocketStats, TopicFrame, TransportError, TransportResult};
use crate::traits::{Pull, Transport};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::info;

/// ZMQ PULL socket implementation (ingress receiver)
pub struct ZmqPull {
    context: Arc<zmq::Context>,
    config: ServerConfig,
    socket: Arc<Mutex<Option<zmq::Socket>>>,
    running: Arc<Mutex<bool>>,
    stats: Arc<SocketStats>,
}

impl ZmqPull {
    /// Create a new PULL socket
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

impl Transport for ZmqPull {
    fn start(&mut self) -> TransportResult<()> {
        if *self.running.lock() {
            return Err(TransportError::AlreadyRunning);
        }

        let socket = self.context.socket(zmq::PULL)?;
        socket.set_linger(self.config.base.linger_ms())?;
        socket.set_rcvhwm(self.config.base.recv_hwm as i32)?;
        if let Some(max) = self.config.base.max_message_size {
            // Topic frame plus payload must fit
            socket.set_maxmsgsize(max as i64 + 4096)?;
        }

        socket
            .bind(&self.config.base.address)
            .map_err(|e| TransportError::BindFailed(format!("{}: {}", self.config.base.address, e)))?;

        *self.socket.lock() = Some(socket);
        *self.running.lock() = true;

        info!("🦀 [ZMQ-PULL] Listening on {}", self.config.base.address);

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
        "zmq-pull"
    }
}

impl Pull for ZmqPull {
    fn pull_timeout(&self, timeout_ms: i64) -> TransportResult<Option<TopicFrame>> {
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
