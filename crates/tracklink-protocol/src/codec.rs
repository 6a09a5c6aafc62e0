// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Envelope encoding and decoding

use serde_json::Value;

use crate::error::{DecodeError, EncodeError};
use crate::payload::{Payload, PayloadKind};

/// JSON key holding the variant name
pub const DISCRIMINATOR: &str = "type";

/// Serialize a payload to UTF-8 JSON
///
/// Output is deterministic for a given value: struct fields keep declaration
/// order and every map is ordered. Non-finite numbers are written as `null`.
pub fn encode(payload: &Payload) -> Result<Vec<u8>, EncodeError> {
    Ok(serde_json::to_vec(payload)?)
}

/// Parse a payload, dispatching on its `"type"` discriminator
///
/// Producers that emit the non-standard `NaN` / `Infinity` literals are
/// accepted; those values decode as absent.
pub fn decode(bytes: &[u8]) -> Result<Payload, DecodeError> {
    let value = parse_value(bytes)?;

    let object = value.as_object().ok_or(DecodeError::NotAnObject)?;
    let kind = match object.get(DISCRIMINATOR) {
        None => return Err(DecodeError::MissingDiscriminator),
        Some(Value::String(tag)) => tag
            .parse::<PayloadKind>()
            .map_err(|_| DecodeError::UnknownDiscriminator(tag.clone()))?,
        Some(_) => return Err(DecodeError::InvalidDiscriminator),
    };

    serde_json::from_value::<Payload>(value).map_err(|e| DecodeError::Schema {
        kind,
        reason: e.to_string(),
    })
}

fn parse_value(bytes: &[u8]) -> Result<Value, DecodeError> {
    match serde_json::from_slice::<Value>(bytes) {
        Ok(value) => Ok(value),
        Err(first) => match replace_non_finite_literals(bytes) {
            Some(cleaned) => serde_json::from_slice::<Value>(&cleaned)
                .map_err(|e| DecodeError::Malformed(e.to_string())),
            None => Err(DecodeError::Malformed(first.to_string())),
        },
    }
}

/// Rewrite bare `NaN`, `Infinity` and `-Infinity` tokens (outside strings) to
/// `null`. Returns `None` when there was nothing to rewrite.
fn replace_non_finite_literals(bytes: &[u8]) -> Option<Vec<u8>> {
    const TOKENS: [&[u8]; 3] = [b"-Infinity", b"Infinity", b"NaN"];

    let mut out = Vec::with_capacity(bytes.len());
    let mut in_string = false;
    let mut escaped = false;
    let mut replaced = false;
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        if in_string {
            out.push(b);
            match (escaped, b) {
                (true, _) => escaped = false,
                (false, b'\\') => escaped = true,
                (false, b'"') => in_string = false,
                _ => {}
            }
            i += 1;
            continue;
        }

        if b == b'"' {
            in_string = true;
            out.push(b);
            i += 1;
            continue;
        }

        if let Some(token) = TOKENS.iter().find(|t| bytes[i..].starts_with(t)) {
            out.extend_from_slice(b"null");
            i += token.len();
            replaced = true;
            continue;
        }

        out.push(b);
        i += 1;
    }

    replaced.then_some(out)
}

/// Routed unit: topic plus payload
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub topic: String,
    pub payload: Payload,
}

impl Envelope {
    /// Wrap a payload under its derived topic
    pub fn new(payload: Payload) -> Self {
        Self {
            topic: payload.topic(),
            payload,
        }
    }

    /// Wrap a payload under an explicit topic
    pub fn with_topic(topic: impl Into<String>, payload: Payload) -> Self {
        Self {
            topic: topic.into(),
            payload,
        }
    }

    pub fn kind(&self) -> PayloadKind {
        self.payload.kind()
    }

    /// `(topic frame, payload frame)`
    pub fn to_frames(&self) -> Result<(Vec<u8>, Vec<u8>), EncodeError> {
        Ok((self.topic.as_bytes().to_vec(), encode(&self.payload)?))
    }

    pub fn from_frames(topic: &[u8], data: &[u8]) -> Result<Self, DecodeError> {
        let topic = std::str::from_utf8(topic).map_err(|_| DecodeError::InvalidTopic)?;
        Ok(Self {
            topic: topic.to_string(),
            payload: decode(data)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replace_leaves_strings_alone() {
        let input = br#"{"name":"NaN \"Infinity\"","v":NaN,"w":-Infinity,"z":Infinity}"#;
        let out = replace_non_finite_literals(input).unwrap();
        assert_eq!(
            std::str::from_utf8(&out).unwrap(),
            r#"{"name":"NaN \"Infinity\"","v":null,"w":null,"z":null}"#
        );
    }

    #[test]
    fn test_replace_returns_none_without_tokens() {
        assert!(replace_non_finite_literals(br#"{"type":"Shutdown"}"#).is_none());
    }

    #[test]
    fn test_envelope_frames() {
        let envelope = Envelope::new(Payload::Shutdown);
        let (topic, data) = envelope.to_frames().unwrap();
        assert_eq!(topic, b"SHUTDOWN");
        assert_eq!(Envelope::from_frames(&topic, &data).unwrap(), envelope);
    }

    #[test]
    fn test_envelope_rejects_binary_topic() {
        let err = Envelope::from_frames(&[0xff, 0xfe], br#"{"type":"Shutdown"}"#).unwrap_err();
        assert!(matches!(err, DecodeError::InvalidTopic));
    }
}
