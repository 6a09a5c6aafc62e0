// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Component-side bus connection
//!
//! A [`BusClient`] is constructed once per component and passed to whatever
//! needs the bus. It owns one PUSH socket toward the broker's ingress and one
//! SUB socket on its fan-out.

use serde_json::Value;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use tracklink_config::TracklinkConfig;
use tracklink_protocol::{encode, ComponentDescriptor, Envelope, Payload, Topic};
use tracklink_transports::prelude::*;

use crate::error::{BusError, BusResult};
use crate::heartbeat::HeartbeatService;
use crate::reconnect::{retry_with_backoff, ReconnectionStrategy};

#[derive(Debug, Clone)]
pub struct BusClientConfig {
    pub ingress_endpoint: String,
    pub fanout_endpoint: String,
    /// Logical id registration requests are addressed to
    pub core_id: String,
    pub handshake_timeout: Duration,
    /// Pause between subscribing to the reply topic and sending the request
    pub handshake_settle: Duration,
    pub handshake_retries: u32,
    pub retry_backoff: Duration,
    pub send_hwm: usize,
    pub recv_hwm: usize,
    pub max_message_size: usize,
}

impl Default for BusClientConfig {
    fn default() -> Self {
        Self::from_config(&TracklinkConfig::default())
    }
}

impl BusClientConfig {
    pub fn new(ingress_endpoint: impl Into<String>, fanout_endpoint: impl Into<String>) -> Self {
        Self {
            ingress_endpoint: ingress_endpoint.into(),
            fanout_endpoint: fanout_endpoint.into(),
            ..Self::default()
        }
    }

    pub fn from_config(config: &TracklinkConfig) -> Self {
        Self {
            ingress_endpoint: config.bus.ingress_endpoint(),
            fanout_endpoint: config.bus.fanout_endpoint(),
            core_id: config.handshake.core_id.clone(),
            handshake_timeout: config.handshake.timeout(),
            handshake_settle: config.handshake.settle(),
            handshake_retries: config.handshake.retries,
            retry_backoff: config.handshake.retry_backoff(),
            send_hwm: config.bus.send_hwm,
            recv_hwm: config.bus.recv_hwm,
            max_message_size: config.bus.max_message_size,
        }
    }

    pub fn with_core_id(mut self, core_id: impl Into<String>) -> Self {
        self.core_id = core_id.into();
        self
    }

    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    pub fn with_handshake_settle(mut self, settle: Duration) -> Self {
        self.handshake_settle = settle;
        self
    }

    pub fn with_handshake_retries(mut self, retries: u32, backoff: Duration) -> Self {
        self.handshake_retries = retries;
        self.retry_backoff = backoff;
        self
    }

    fn client_transport(&self, address: &str) -> ClientConfig {
        let mut config = ClientConfig::new(address);
        config.base = config
            .base
            .with_send_hwm(self.send_hwm)
            .with_recv_hwm(self.recv_hwm)
            .with_max_message_size(self.max_message_size);
        config
    }
}

pub struct BusClient {
    context: Arc<zmq::Context>,
    config: BusClientConfig,
    push: ZmqPush,
    sub: ZmqSub,
    subscriptions: BTreeSet<String>,
}

impl BusClient {
    pub fn connect(config: BusClientConfig) -> BusResult<Self> {
        Self::connect_with_context(Arc::new(zmq::Context::new()), config)
    }

    pub fn connect_with_context(
        context: Arc<zmq::Context>,
        config: BusClientConfig,
    ) -> BusResult<Self> {
        let mut push = ZmqPush::new(
            Arc::clone(&context),
            config.client_transport(&config.ingress_endpoint),
        )?;
        let mut sub = ZmqSub::new(
            Arc::clone(&context),
            config.client_transport(&config.fanout_endpoint),
        )?;
        push.start()?;
        sub.start()?;

        debug!(
            "[BUS] Client connected (ingress {}, fan-out {})",
            config.ingress_endpoint, config.fanout_endpoint
        );

        Ok(Self {
            context,
            config,
            push,
            sub,
            subscriptions: BTreeSet::new(),
        })
    }

    pub fn config(&self) -> &BusClientConfig {
        &self.config
    }

    pub fn context(&self) -> Arc<zmq::Context> {
        Arc::clone(&self.context)
    }

    /// Add a topic prefix; subscribing twice is a no-op
    ///
    /// Only messages published after the subscription reaches the broker are
    /// delivered.
    pub fn subscribe(&mut self, prefix: &str) -> BusResult<()> {
        if self.subscriptions.contains(prefix) {
            return Ok(());
        }
        self.sub.subscribe(prefix.as_bytes())?;
        self.subscriptions.insert(prefix.to_string());
        Ok(())
    }

    pub fn subscribe_topic(&mut self, topic: Topic) -> BusResult<()> {
        self.subscribe(topic.as_str_name())
    }

    /// Frame notices from a single stream
    pub fn subscribe_images(&mut self, stream_id: &str) -> BusResult<()> {
        self.subscribe(&Topic::Image.scoped(stream_id))
    }

    pub fn unsubscribe(&mut self, prefix: &str) -> BusResult<()> {
        if self.subscriptions.remove(prefix) {
            self.sub.unsubscribe(prefix.as_bytes())?;
        }
        Ok(())
    }

    pub fn subscriptions(&self) -> &BTreeSet<String> {
        &self.subscriptions
    }

    /// Fire-and-forget under the payload's own topic
    pub fn publish(&self, payload: &Payload) -> BusResult<()> {
        self.publish_on(&payload.topic(), payload)
    }

    pub fn publish_on(&self, topic: &str, payload: &Payload) -> BusResult<()> {
        let data = encode(payload)?;
        self.push.push(topic.as_bytes(), &data)?;
        Ok(())
    }

    pub fn publish_envelope(&self, envelope: &Envelope) -> BusResult<()> {
        self.publish_on(&envelope.topic, &envelope.payload)
    }

    /// Next raw `[topic, payload]` message, `None` on timeout
    pub fn poll_frame(&self, timeout_ms: i64) -> BusResult<Option<TopicFrame>> {
        Ok(self.sub.receive_timeout(timeout_ms)?)
    }

    /// Next decoded envelope, `None` on timeout
    ///
    /// Negative timeouts block until something matching arrives.
    pub fn poll(&self, timeout_ms: i64) -> BusResult<Option<Envelope>> {
        let Some(frame) = self.poll_frame(timeout_ms)? else {
            return Ok(None);
        };
        Envelope::from_frames(&frame.topic, &frame.data)
            .map(Some)
            .map_err(|source| BusError::Decode {
                topic: frame.topic_str(),
                source,
            })
    }

    /// Obtain this component's configuration from the core
    ///
    /// Subscribes to `COMPONENT_MESSAGE.<id>`, sends a registration request
    /// and waits for the reply. Retries follow the configured policy, which
    /// is off unless `handshake_retries > 0`.
    ///
    /// # Errors
    ///
    /// - [`BusError::HandshakeTimeout`] if no reply arrives in time
    /// - [`BusError::Decode`] if the first reply is undecodable
    /// - [`BusError::UnexpectedReply`] if the reply is not a configuration
    pub fn register(&mut self, descriptor: &ComponentDescriptor) -> BusResult<Value> {
        let mut strategy = ReconnectionStrategy::new(
            self.config.retry_backoff.as_millis() as u64,
            self.config.handshake_retries,
        );
        retry_with_backoff(
            || self.register_once(descriptor),
            &mut strategy,
            "Registration",
        )
    }

    fn register_once(&mut self, descriptor: &ComponentDescriptor) -> BusResult<Value> {
        let reply_topic = Topic::ComponentMessage.scoped(&descriptor.id);
        self.subscribe(&reply_topic)?;
        std::thread::sleep(self.config.handshake_settle);

        info!(
            "[BUS] Registering {} '{}' with '{}'",
            descriptor.kind, descriptor.id, self.config.core_id
        );
        self.publish(&Payload::Registration {
            recipient: self.config.core_id.clone(),
            component: descriptor.clone(),
        })?;

        let started = Instant::now();
        let deadline = started + self.config.handshake_timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(BusError::HandshakeTimeout {
                    core_id: self.config.core_id.clone(),
                    waited: started.elapsed(),
                });
            }

            let Some(frame) = self.poll_frame(remaining.as_millis().max(1) as i64)? else {
                continue;
            };
            // Prefix subscriptions also match longer ids and our data topics
            if frame.topic != reply_topic.as_bytes() {
                debug!("[BUS] Ignoring '{}' during handshake", frame.topic_str());
                continue;
            }

            let payload = Envelope::from_frames(&frame.topic, &frame.data)
                .map_err(|source| BusError::Decode {
                    topic: reply_topic.clone(),
                    source,
                })?
                .payload;
            return match payload {
                Payload::Configuration { recipient, config } if recipient == descriptor.id => {
                    info!("[BUS] '{}' configured by '{}'", descriptor.id, self.config.core_id);
                    Ok(config)
                }
                other => {
                    warn!(
                        "[BUS] Expected configuration on '{}', got {}",
                        reply_topic,
                        other.kind()
                    );
                    Err(BusError::UnexpectedReply {
                        topic: reply_topic,
                        kind: other.kind(),
                    })
                }
            };
        }
    }

    /// Start emitting liveness signals for `component_id` on a background thread
    pub fn start_heartbeat(
        &self,
        component_id: impl Into<String>,
        interval: Duration,
    ) -> BusResult<HeartbeatService> {
        HeartbeatService::start(
            self.context(),
            self.config.client_transport(&self.config.ingress_endpoint),
            component_id,
            interval,
        )
    }
}
