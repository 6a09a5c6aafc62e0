// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Serde adapters for wire-level invariants
//!
//! - [`absent`](self): `Option<f64>` fields are required on the wire but may be
//!   `null`. Non-finite values are written as `null` and never read back as
//!   anything but `None`.
//! - [`track_keys`]: integer-keyed maps travel with string keys, which is the
//!   only key type JSON has.

use serde::{Deserialize, Deserializer, Serializer};

/// Collapse non-finite values into the absent marker
pub fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

pub fn serialize<S>(value: &Option<f64>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match finite(*value) {
        Some(v) => serializer.serialize_some(&v),
        None => serializer.serialize_none(),
    }
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(finite(Option::<f64>::deserialize(deserializer)?))
}

pub mod track_keys {
    //! `BTreeMap<u32, T>` as a JSON object with decimal string keys

    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::collections::BTreeMap;

    pub fn serialize<S, T>(map: &BTreeMap<u32, T>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        T: Serialize,
    {
        serializer.collect_map(map.iter().map(|(k, v)| (k.to_string(), v)))
    }

    pub fn deserialize<'de, D, T>(deserializer: D) -> Result<BTreeMap<u32, T>, D::Error>
    where
        D: Deserializer<'de>,
        T: Deserialize<'de>,
    {
        let raw = BTreeMap::<String, T>::deserialize(deserializer)?;
        raw.into_iter()
            .map(|(k, v)| {
                k.parse::<u32>()
                    .map(|id| (id, v))
                    .map_err(|_| D::Error::custom(format!("track id '{}' is not a u32", k)))
            })
            .collect()
    }
}
