// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Codec errors

use thiserror::Error;

use crate::payload::PayloadKind;

/// Why a message was rejected
///
/// Every variant is a per-message condition: callers discard the message and
/// carry on, except where the message was the one they were waiting for.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("payload is not valid JSON: {0}")]
    Malformed(String),

    #[error("payload is not a JSON object")]
    NotAnObject,

    #[error("payload has no \"type\" discriminator")]
    MissingDiscriminator,

    #[error("payload discriminator is not a string")]
    InvalidDiscriminator,

    #[error("unknown payload type '{0}'")]
    UnknownDiscriminator(String),

    #[error("invalid {kind} payload: {reason}")]
    Schema { kind: PayloadKind, reason: String },

    #[error("topic is not UTF-8")]
    InvalidTopic,
}

impl DecodeError {
    /// Discriminator the message declared, when it got that far
    pub fn declared_kind(&self) -> Option<PayloadKind> {
        match self {
            Self::Schema { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
#[error("failed to encode payload: {0}")]
pub struct EncodeError(#[from] pub serde_json::Error);
