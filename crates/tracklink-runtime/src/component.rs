// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! The component contract

use tracing::debug;
use tracklink_bus::BusClient;
use tracklink_protocol::{
    ComponentDescriptor, EntitySet, FeatureSet, FrameAvailable, Payload, PlaybackState,
    SeekRange,
};
use tracklink_shm::FrameBuffer;

use crate::config::ComponentConfig;
use crate::error::RuntimeResult;

/// What the runtime hands to a handler besides the message itself
pub struct ComponentContext<'a> {
    client: &'a BusClient,
    component_id: &'a str,
}

impl<'a> ComponentContext<'a> {
    pub(crate) fn new(client: &'a BusClient, component_id: &'a str) -> Self {
        Self {
            client,
            component_id,
        }
    }

    pub fn component_id(&self) -> &str {
        self.component_id
    }

    /// Publish a derived payload under its own topic
    pub fn publish(&self, payload: &Payload) -> RuntimeResult<()> {
        Ok(self.client.publish(payload)?)
    }

    pub fn publish_on(&self, topic: &str, payload: &Payload) -> RuntimeResult<()> {
        Ok(self.client.publish_on(topic, payload)?)
    }
}

/// A pipeline stage driven by [`ComponentRuntime`](crate::ComponentRuntime)
///
/// Only `descriptor`, `configure` and `subscriptions` are mandatory. Every
/// handler defaults to logging and skipping the message.
///
/// `configure` is called once with the registration reply and again for every
/// configuration pushed while running; the new values must apply from the
/// next handled message on.
pub trait Component {
    fn descriptor(&self) -> ComponentDescriptor;

    fn configure(&mut self, config: &ComponentConfig) -> RuntimeResult<()>;

    /// Topic prefixes to receive after registration
    fn subscriptions(&self) -> Vec<String>;

    /// `frame` is a read-only view of the producer's buffer
    fn on_frame(
        &mut self,
        _ctx: &ComponentContext<'_>,
        notice: &FrameAvailable,
        _frame: &FrameBuffer,
    ) -> RuntimeResult<()> {
        debug!("[RUNTIME] No frame handler; skipping {}", notice.buffer_id);
        Ok(())
    }

    fn on_features(&mut self, _ctx: &ComponentContext<'_>, set: &FeatureSet) -> RuntimeResult<()> {
        debug!("[RUNTIME] No features handler; skipping {}", set.timestamp);
        Ok(())
    }

    fn on_entities(&mut self, _ctx: &ComponentContext<'_>, set: &EntitySet) -> RuntimeResult<()> {
        debug!("[RUNTIME] No entities handler; skipping {}", set.timestamp);
        Ok(())
    }

    fn on_seekable(&mut self, _ctx: &ComponentContext<'_>, _range: &SeekRange) -> RuntimeResult<()> {
        debug!("[RUNTIME] No seekable handler");
        Ok(())
    }

    fn on_command(
        &mut self,
        _ctx: &ComponentContext<'_>,
        state: &PlaybackState,
    ) -> RuntimeResult<()> {
        debug!("[RUNTIME] No command handler; skipping {:?}", state);
        Ok(())
    }

    fn on_event(&mut self, _ctx: &ComponentContext<'_>, state: &PlaybackState) -> RuntimeResult<()> {
        debug!("[RUNTIME] No event handler; skipping {:?}", state);
        Ok(())
    }

    /// Last call before the run loop returns after a shutdown
    fn on_shutdown(&mut self) {}
}
