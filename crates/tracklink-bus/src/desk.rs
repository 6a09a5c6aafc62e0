// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Core side of the registration handshake

use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{info, warn};
use tracklink_protocol::{Envelope, Payload, Topic};

use crate::client::BusClient;
use crate::error::BusResult;

/// Answers registration requests addressed to `core_id`
///
/// Holds one configuration document per component id, plus an optional
/// fallback for ids it has never heard of. Components without either get no
/// reply and fail their handshake on timeout.
pub struct RegistrationDesk {
    client: BusClient,
    core_id: String,
    configs: BTreeMap<String, Value>,
    fallback: Option<Value>,
    registered: BTreeSet<String>,
}

impl RegistrationDesk {
    pub fn new(mut client: BusClient, core_id: impl Into<String>) -> BusResult<Self> {
        let core_id = core_id.into();
        client.subscribe(&Topic::ComponentMessage.scoped(&core_id))?;
        info!("[DESK] Accepting registrations for '{}'", core_id);

        Ok(Self {
            client,
            core_id,
            configs: BTreeMap::new(),
            fallback: None,
            registered: BTreeSet::new(),
        })
    }

    pub fn with_configs(mut self, configs: BTreeMap<String, Value>) -> Self {
        self.configs.extend(configs);
        self
    }

    pub fn with_fallback(mut self, config: Value) -> Self {
        self.fallback = Some(config);
        self
    }

    pub fn core_id(&self) -> &str {
        &self.core_id
    }

    pub fn set_config(&mut self, component_id: impl Into<String>, config: Value) {
        self.configs.insert(component_id.into(), config);
    }

    pub fn config_for(&self, component_id: &str) -> Option<&Value> {
        self.configs.get(component_id).or(self.fallback.as_ref())
    }

    /// Components that have been sent a configuration
    pub fn registered(&self) -> &BTreeSet<String> {
        &self.registered
    }

    pub fn client(&self) -> &BusClient {
        &self.client
    }

    pub fn client_mut(&mut self) -> &mut BusClient {
        &mut self.client
    }

    /// Answer `envelope` if it is a registration request for this desk
    ///
    /// Returns whether a configuration was sent.
    pub fn handle(&mut self, envelope: &Envelope) -> BusResult<bool> {
        let Payload::Registration {
            recipient,
            component,
        } = &envelope.payload
        else {
            return Ok(false);
        };
        if *recipient != self.core_id {
            return Ok(false);
        }

        let Some(config) = self.config_for(&component.id).cloned() else {
            warn!(
                "[DESK] No configuration for {} '{}'; not answering",
                component.kind, component.id
            );
            return Ok(false);
        };

        self.send(&component.id, config)?;
        self.registered.insert(component.id.clone());
        info!("[DESK] Registered {} '{}'", component.kind, component.id);
        Ok(true)
    }

    /// Poll once, answering any registration; every received envelope is
    /// returned so the caller can inspect it further
    pub fn serve_once(&mut self, timeout_ms: i64) -> BusResult<Option<Envelope>> {
        let envelope = self.client.poll(timeout_ms)?;
        if let Some(envelope) = &envelope {
            self.handle(envelope)?;
        }
        Ok(envelope)
    }

    /// Replace a component's configuration and push it immediately
    pub fn reconfigure(&mut self, component_id: &str, config: Value) -> BusResult<()> {
        self.configs.insert(component_id.to_string(), config.clone());
        self.send(component_id, config)?;
        info!("[DESK] Pushed new configuration to '{}'", component_id);
        Ok(())
    }

    fn send(&self, component_id: &str, config: Value) -> BusResult<()> {
        self.client.publish(&Payload::Configuration {
            recipient: component_id.to_string(),
            config,
        })
    }
}
