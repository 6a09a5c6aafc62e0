// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Bus errors

use std::time::Duration;
use thiserror::Error;
use tracklink_protocol::{DecodeError, EncodeError, PayloadKind};
use tracklink_transports::TransportError;

pub type BusResult<T> = Result<T, BusError>;

#[derive(Debug, Error)]
pub enum BusError {
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("failed to encode payload: {0}")]
    Encode(#[from] EncodeError),

    #[error("undecodable message on '{topic}': {source}")]
    Decode {
        topic: String,
        #[source]
        source: DecodeError,
    },

    /// The core never answered a registration request
    #[error("no configuration from '{core_id}' within {waited:?}")]
    HandshakeTimeout { core_id: String, waited: Duration },

    /// Something other than a configuration arrived on the reply topic
    #[error("unexpected {kind} message on reply topic '{topic}'")]
    UnexpectedReply { topic: String, kind: PayloadKind },

    #[error("invalid bus configuration: {0}")]
    InvalidConfig(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl BusError {
    /// Whether the optional handshake retry policy may try again
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::HandshakeTimeout { .. } => true,
            Self::Transport(e) => e.is_transient(),
            _ => false,
        }
    }
}
