// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Per-component configuration documents
//!
//! The core treats a component's configuration as opaque JSON. Components
//! pull out the fields they need; a missing or ill-typed required field is a
//! [`RuntimeError::Configuration`] at the point of use.

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracklink_config::ComponentAddress;

use crate::error::{RuntimeError, RuntimeResult};

/// Fallback for [`ComponentConfig::address`]
pub const COMPONENT_ADDRESS_ENV: &str = "TRACKLINK_COMPONENT_ADDRESS";

const ADDRESS_FIELD: &str = "address";

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ComponentConfig {
    document: Value,
}

impl ComponentConfig {
    pub fn new(document: Value) -> Self {
        Self { document }
    }

    pub fn document(&self) -> &Value {
        &self.document
    }

    pub fn contains(&self, field: &str) -> bool {
        self.lookup(field).is_some()
    }

    /// Optional field; `Ok(None)` when absent or null
    pub fn get<T: DeserializeOwned>(&self, field: &str) -> RuntimeResult<Option<T>> {
        match self.lookup(field) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => serde_json::from_value(value.clone())
                .map(Some)
                .map_err(|e| RuntimeError::configuration(field, e.to_string())),
        }
    }

    pub fn require<T: DeserializeOwned>(&self, field: &str) -> RuntimeResult<T> {
        self.get(field)?
            .ok_or_else(|| RuntimeError::configuration(field, "required field is missing"))
    }

    pub fn require_str(&self, field: &str) -> RuntimeResult<&str> {
        match self.lookup(field) {
            Some(Value::String(s)) => Ok(s.as_str()),
            Some(other) => Err(RuntimeError::configuration(
                field,
                format!("expected a string, found {}", other),
            )),
            None => Err(RuntimeError::configuration(field, "required field is missing")),
        }
    }

    /// The component's own request/response endpoint
    ///
    /// Read from the `address` field, falling back to
    /// `TRACKLINK_COMPONENT_ADDRESS`.
    pub fn address(&self) -> RuntimeResult<ComponentAddress> {
        let raw = match self.lookup(ADDRESS_FIELD) {
            Some(Value::String(s)) => s.clone(),
            Some(other) => {
                return Err(RuntimeError::configuration(
                    ADDRESS_FIELD,
                    format!("expected \"host:port\", found {}", other),
                ))
            }
            None => std::env::var(COMPONENT_ADDRESS_ENV).map_err(|_| {
                RuntimeError::configuration(
                    ADDRESS_FIELD,
                    format!("missing and {} is not set", COMPONENT_ADDRESS_ENV),
                )
            })?,
        };
        raw.parse::<ComponentAddress>()
            .map_err(|e| RuntimeError::configuration(ADDRESS_FIELD, e.to_string()))
    }

    /// Dotted paths reach into nested objects: `"model.path"`
    fn lookup(&self, field: &str) -> Option<&Value> {
        field
            .split('.')
            .try_fold(&self.document, |value, key| value.get(key))
    }
}

impl From<Value> for ComponentConfig {
    fn from(document: Value) -> Self {
        Self::new(document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn sample() -> ComponentConfig {
        ComponentConfig::new(json!({
            "anchor": "thorax",
            "threshold": 0.4,
            "model": {"path": "/models/fly.h5", "batch": 4},
            "skip": null
        }))
    }

    #[test]
    fn test_require() {
        let config = sample();
        assert_eq!(config.require_str("anchor").unwrap(), "thorax");
        assert_eq!(config.require::<f64>("threshold").unwrap(), 0.4);
        assert_eq!(config.require::<u32>("model.batch").unwrap(), 4);
        assert_eq!(config.require_str("model.path").unwrap(), "/models/fly.h5");
    }

    #[test]
    fn test_missing_and_ill_typed() {
        let config = sample();
        assert!(matches!(
            config.require_str("nodes"),
            Err(RuntimeError::Configuration { ref field, .. }) if field == "nodes"
        ));
        assert!(config.require::<u32>("anchor").is_err());
        assert!(config.require_str("threshold").is_err());
        assert!(config.require::<String>("skip").is_err());
    }

    #[test]
    fn test_get_optional() {
        let config = sample();
        assert_eq!(config.get::<String>("missing").unwrap(), None);
        assert_eq!(config.get::<String>("skip").unwrap(), None);
        assert!(config.get::<u32>("anchor").is_err());
        assert!(config.contains("model.path"));
    }

    #[test]
    fn test_address_from_field() {
        let config = ComponentConfig::new(json!({"address": "127.0.0.1:9001"}));
        let address = config.address().unwrap();
        assert_eq!(address.port, 9001);
        assert_eq!(address.tcp_endpoint(), "tcp://127.0.0.1:9001");
    }

    #[test]
    fn test_address_from_environment() {
        let _guard = ENV_LOCK.lock().unwrap();
        std::env::set_var(COMPONENT_ADDRESS_ENV, "localhost:7777");
        let address = ComponentConfig::default().address();
        std::env::remove_var(COMPONENT_ADDRESS_ENV);

        assert_eq!(address.unwrap().host, "localhost");
        assert!(ComponentConfig::default().address().is_err());
    }

    #[test]
    fn test_address_rejects_garbage() {
        let config = ComponentConfig::new(json!({"address": "no-port"}));
        assert!(config.address().is_err());
        let config = ComponentConfig::new(json!({"address": 9001}));
        assert!(config.address().is_err());
    }
}
