// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! The register → configure → subscribe → poll/dispatch loop

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use tracklink_bus::{BusClient, BusClientConfig, BusError, HeartbeatService};
use tracklink_config::TracklinkConfig;
use tracklink_protocol::{Envelope, FrameAvailable, Payload, Topic};
use tracklink_shm::{default_shm_dir, FrameStore};

use crate::component::{Component, ComponentContext};
use crate::config::ComponentConfig;
use crate::error::RuntimeResult;

#[derive(Debug, Clone)]
pub struct RuntimeOptions {
    /// Bound on each poll, so cancellation is noticed
    pub poll_timeout_ms: i64,
    /// Fixed per deployment; frame notices only carry width and height
    pub bytes_per_pixel: usize,
    pub shm_dir: PathBuf,
    /// `None` disables the liveness signal
    pub heartbeat_interval: Option<Duration>,
}

impl Default for RuntimeOptions {
    fn default() -> Self {
        Self::from_config(&TracklinkConfig::default())
    }
}

impl RuntimeOptions {
    pub fn from_config(config: &TracklinkConfig) -> Self {
        Self {
            poll_timeout_ms: config.runtime.poll_timeout_ms.min(i64::MAX as u64) as i64,
            bytes_per_pixel: config.frames.bytes_per_pixel,
            shm_dir: config.frames.shm_dir.clone().unwrap_or_else(default_shm_dir),
            heartbeat_interval: config
                .heartbeat
                .enabled
                .then(|| config.heartbeat.interval()),
        }
    }
}

/// Cooperative stop request, observed at the next poll
#[derive(Debug, Clone, Default)]
pub struct ShutdownHandle(Arc<AtomicBool>);

impl ShutdownHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Counters reported when the loop exits cleanly
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub frames_processed: u64,
    /// Frames whose buffer was already recycled
    pub frames_skipped: u64,
    pub messages_handled: u64,
    /// Undecodable messages
    pub messages_discarded: u64,
    /// Decodable messages this component has no use for
    pub messages_ignored: u64,
    pub reconfigurations: u64,
}

enum Flow {
    Continue,
    Exit,
}

pub struct ComponentRuntime<C: Component> {
    component: C,
    client: BusClient,
    store: FrameStore,
    options: RuntimeOptions,
    shutdown: ShutdownHandle,
    summary: RunSummary,
}

impl<C: Component> ComponentRuntime<C> {
    pub fn new(component: C, client: BusClient, options: RuntimeOptions) -> Self {
        Self {
            component,
            client,
            store: FrameStore::new(&options.shm_dir),
            options,
            shutdown: ShutdownHandle::new(),
            summary: RunSummary::default(),
        }
    }

    /// Connect a fresh bus client from the loaded configuration
    pub fn connect(component: C, config: &TracklinkConfig) -> RuntimeResult<Self> {
        let client = BusClient::connect(BusClientConfig::from_config(config))?;
        Ok(Self::new(component, client, RuntimeOptions::from_config(config)))
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    pub fn component(&self) -> &C {
        &self.component
    }

    pub fn into_component(self) -> C {
        self.component
    }

    pub fn summary(&self) -> RunSummary {
        self.summary
    }

    /// Run until a shutdown notice or a shutdown request
    ///
    /// # Errors
    ///
    /// Any handshake failure, a configuration the component rejects, a
    /// handler error, or a transport failure. Recycled frames and
    /// undecodable messages are counted and skipped.
    pub fn run(&mut self) -> RuntimeResult<RunSummary> {
        let descriptor = self.component.descriptor();
        let config = ComponentConfig::new(self.client.register(&descriptor)?);
        self.component.configure(&config)?;

        self.client.subscribe_topic(Topic::Shutdown)?;
        for prefix in self.component.subscriptions() {
            self.client.subscribe(&prefix)?;
        }

        let _heartbeat: Option<HeartbeatService> = match self.options.heartbeat_interval {
            Some(interval) => Some(self.client.start_heartbeat(&descriptor.id, interval)?),
            None => None,
        };

        info!(
            "[RUNTIME] {} '{}' running ({} subscriptions)",
            descriptor.kind,
            descriptor.id,
            self.client.subscriptions().len()
        );

        while !self.shutdown.is_requested() {
            let envelope = match self.client.poll(self.options.poll_timeout_ms) {
                Ok(Some(envelope)) => envelope,
                Ok(None) => continue,
                Err(BusError::Decode { topic, source }) => {
                    warn!("[RUNTIME] Discarding undecodable message on '{}': {}", topic, source);
                    self.summary.messages_discarded += 1;
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            if let Flow::Exit = self.dispatch(&descriptor.id, envelope)? {
                break;
            }
        }

        self.component.on_shutdown();
        info!("[RUNTIME] '{}' stopped: {:?}", descriptor.id, self.summary);
        Ok(self.summary)
    }

    fn dispatch(&mut self, id: &str, envelope: Envelope) -> RuntimeResult<Flow> {
        let ctx = ComponentContext::new(&self.client, id);
        match envelope.payload {
            Payload::Shutdown => {
                info!("[RUNTIME] Shutdown notice received");
                return Ok(Flow::Exit);
            }
            Payload::Configuration { recipient, config } if recipient == id => {
                self.component.configure(&ComponentConfig::new(config))?;
                self.summary.reconfigurations += 1;
                info!("[RUNTIME] '{}' reconfigured", id);
                return Ok(Flow::Continue);
            }
            Payload::Image(notice) => return self.handle_frame(id, &notice),
            Payload::Features(set) => self.component.on_features(&ctx, &set)?,
            Payload::Entities(set) => self.component.on_entities(&ctx, &set)?,
            Payload::Seekable(range) => self.component.on_seekable(&ctx, &range)?,
            Payload::Command { state } => self.component.on_command(&ctx, &state)?,
            Payload::Event { state } => self.component.on_event(&ctx, &state)?,
            other => {
                debug!("[RUNTIME] Ignoring {} on '{}'", other.kind(), envelope.topic);
                self.summary.messages_ignored += 1;
                return Ok(Flow::Continue);
            }
        }
        self.summary.messages_handled += 1;
        Ok(Flow::Continue)
    }

    fn handle_frame(&mut self, id: &str, notice: &FrameAvailable) -> RuntimeResult<Flow> {
        let frame = match self.store.map_read_only(
            &notice.buffer_id,
            notice.width,
            notice.height,
            self.options.bytes_per_pixel,
        ) {
            Ok(frame) => frame,
            Err(e) if e.is_transient() => {
                warn!("[RUNTIME] Skipping frame at {}: {}", notice.timestamp, e);
                self.summary.frames_skipped += 1;
                return Ok(Flow::Continue);
            }
            Err(e) => return Err(e.into()),
        };

        let ctx = ComponentContext::new(&self.client, id);
        self.component.on_frame(&ctx, notice, &frame)?;
        self.summary.frames_processed += 1;
        self.summary.messages_handled += 1;
        Ok(Flow::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shutdown_handle_is_shared() {
        let handle = ShutdownHandle::new();
        let clone = handle.clone();
        assert!(!clone.is_requested());
        handle.request();
        assert!(clone.is_requested());
    }

    #[test]
    fn test_options_follow_config() {
        let mut config = TracklinkConfig::default();
        config.runtime.poll_timeout_ms = 250;
        config.frames.bytes_per_pixel = 3;
        config.frames.shm_dir = Some(PathBuf::from("/tmp/frames"));
        config.heartbeat.enabled = false;

        let options = RuntimeOptions::from_config(&config);
        assert_eq!(options.poll_timeout_ms, 250);
        assert_eq!(options.bytes_per_pixel, 3);
        assert_eq!(options.shm_dir, PathBuf::from("/tmp/frames"));
        assert!(options.heartbeat_interval.is_none());
    }
}
