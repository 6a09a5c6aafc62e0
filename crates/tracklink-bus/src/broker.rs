// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Broker: shared ingress in, prefix-filtered fan-out out
//!
//! The broker never decodes payloads. It moves `[topic, payload]` frames from
//! its PULL socket to its PUB socket unchanged; subscribers do the filtering.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{debug, info, warn};
use tracklink_config::BusConfig;
use tracklink_transports::prelude::*;

use crate::error::{BusError, BusResult};

#[derive(Debug, Clone)]
pub struct BrokerConfig {
    pub ingress_endpoint: String,
    pub fanout_endpoint: String,
    pub send_hwm: usize,
    pub recv_hwm: usize,
    pub max_message_size: usize,
    /// Upper bound on how long a stop request can go unnoticed
    pub poll_interval_ms: i64,
}

impl BrokerConfig {
    pub fn new(ingress_endpoint: impl Into<String>, fanout_endpoint: impl Into<String>) -> Self {
        let bus = BusConfig::default();
        Self {
            ingress_endpoint: ingress_endpoint.into(),
            fanout_endpoint: fanout_endpoint.into(),
            send_hwm: bus.send_hwm,
            recv_hwm: bus.recv_hwm,
            max_message_size: bus.max_message_size,
            poll_interval_ms: 100,
        }
    }

    /// Bind on the configured bind host
    pub fn from_bus_config(bus: &BusConfig) -> Self {
        Self {
            ingress_endpoint: bus.ingress_bind_endpoint(),
            fanout_endpoint: bus.fanout_bind_endpoint(),
            send_hwm: bus.send_hwm,
            recv_hwm: bus.recv_hwm,
            max_message_size: bus.max_message_size,
            poll_interval_ms: 100,
        }
    }

    fn transport(&self, address: &str) -> TransportConfig {
        TransportConfig::new(address)
            .with_send_hwm(self.send_hwm)
            .with_recv_hwm(self.recv_hwm)
            .with_max_message_size(self.max_message_size)
    }
}

/// Counters snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BrokerStats {
    pub received: u64,
    pub forwarded: u64,
    pub bytes_forwarded: u64,
    pub errors: u64,
}

pub struct Broker {
    context: Arc<zmq::Context>,
    config: BrokerConfig,
}

impl Broker {
    pub fn new(config: BrokerConfig) -> Self {
        Self::with_context(Arc::new(zmq::Context::new()), config)
    }

    pub fn with_context(context: Arc<zmq::Context>, config: BrokerConfig) -> Self {
        Self { context, config }
    }

    /// Bind both endpoints and start forwarding on a background thread
    ///
    /// Bind failures are reported here, before any thread is spawned.
    pub fn start(self) -> BusResult<BrokerHandle> {
        if self.config.ingress_endpoint == self.config.fanout_endpoint {
            return Err(BusError::InvalidConfig(format!(
                "ingress and fan-out share endpoint {}",
                self.config.ingress_endpoint
            )));
        }

        let mut pull = ZmqPull::new(
            Arc::clone(&self.context),
            ServerConfig {
                base: self.config.transport(&self.config.ingress_endpoint),
            },
        )?;
        let mut publisher = ZmqPub::new(
            Arc::clone(&self.context),
            ServerConfig {
                base: self.config.transport(&self.config.fanout_endpoint),
            },
        )?;
        pull.start()?;
        publisher.start()?;

        let running = Arc::new(AtomicBool::new(true));
        let ingress_stats = pull.stats();
        let fanout_stats = publisher.stats();

        let thread_running = Arc::clone(&running);
        let poll_interval = self.config.poll_interval_ms.max(1);
        let thread = std::thread::Builder::new()
            .name("tracklink-broker".to_string())
            .spawn(move || forward(pull, publisher, thread_running, poll_interval))?;

        info!(
            "[BROKER] Forwarding {} -> {}",
            self.config.ingress_endpoint, self.config.fanout_endpoint
        );

        Ok(BrokerHandle {
            running,
            thread: Some(thread),
            ingress_stats,
            fanout_stats,
            ingress_endpoint: self.config.ingress_endpoint,
            fanout_endpoint: self.config.fanout_endpoint,
        })
    }
}

fn forward(mut pull: ZmqPull, mut publisher: ZmqPub, running: Arc<AtomicBool>, poll_interval: i64) {
    while running.load(Ordering::Relaxed) {
        match pull.pull_timeout(poll_interval) {
            Ok(Some(frame)) => {
                if let Err(e) = publisher.publish(&frame.topic, &frame.data) {
                    warn!("[BROKER] Dropped '{}': {}", frame.topic_str(), e);
                }
            }
            Ok(None) => {}
            Err(e) => warn!("[BROKER] Ingress error: {}", e),
        }
    }

    let _ = pull.stop();
    let _ = publisher.stop();
    debug!("[BROKER] Forwarding loop exited");
}

/// Owned handle to a running broker; dropping it stops the broker
pub struct BrokerHandle {
    running: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
    ingress_stats: Arc<SocketStats>,
    fanout_stats: Arc<SocketStats>,
    ingress_endpoint: String,
    fanout_endpoint: String,
}

impl BrokerHandle {
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    pub fn ingress_endpoint(&self) -> &str {
        &self.ingress_endpoint
    }

    pub fn fanout_endpoint(&self) -> &str {
        &self.fanout_endpoint
    }

    pub fn stats(&self) -> BrokerStats {
        BrokerStats {
            received: self.ingress_stats.messages_received(),
            forwarded: self.fanout_stats.messages_sent(),
            bytes_forwarded: self.fanout_stats.bytes_sent(),
            errors: self.ingress_stats.error_count() + self.fanout_stats.error_count(),
        }
    }

    /// Stop forwarding and wait for the loop to release its sockets
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!("[BROKER] Forwarding thread panicked");
            }
            let stats = self.stats();
            info!(
                "[BROKER] Stopped after forwarding {} messages ({} bytes)",
                stats.forwarded, stats.bytes_forwarded
            );
        }
    }
}

impl Drop for BrokerHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_endpoint_rejected() {
        let broker = Broker::new(BrokerConfig::new(
            "tcp://127.0.0.1:32000",
            "tcp://127.0.0.1:32000",
        ));
        assert!(matches!(broker.start(), Err(BusError::InvalidConfig(_))));
    }

    #[test]
    fn test_start_stop() {
        let mut handle = Broker::new(BrokerConfig::new(
            "tcp://127.0.0.1:32001",
            "tcp://127.0.0.1:32002",
        ))
        .start()
        .unwrap();
        assert!(handle.is_running());
        assert_eq!(handle.stats(), BrokerStats::default());

        handle.stop();
        assert!(!handle.is_running());
    }

    #[test]
    fn test_from_bus_config_uses_bind_host() {
        let bus = BusConfig {
            bind_host: "0.0.0.0".into(),
            ingress_port: 7000,
            fanout_port: 7001,
            ..BusConfig::default()
        };
        let config = BrokerConfig::from_bus_config(&bus);
        assert_eq!(config.ingress_endpoint, "tcp://0.0.0.0:7000");
        assert_eq!(config.fanout_endpoint, "tcp://0.0.0.0:7001");
    }
}
