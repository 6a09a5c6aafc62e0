// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! ZMQ transport implementations
//!
//! - **Publish-Subscribe**: PUB (server) ↔ SUB (client)
//! - **Push-Pull**: PULL (server) ↔ PUSH (client)
//!
//! ## Feature Flags
//!
//! - `zmq-server`: Enable bound sockets (PUB, PULL)
//! - `zmq-client`: Enable connected sockets (SUB, PUSH)
//! - `zmq`: Enable both

use crate::common::{TopicFrame, TransportError, TransportResult};

#[cfg(feature = "zmq-server")]
pub mod server;

#[cfg(feature = "zmq-client")]
pub mod client;

#[cfg(feature = "zmq-server")]
pub use server::{ZmqPub, ZmqPull};

#[cfg(feature = "zmq-client")]
pub use client::{ZmqPush, ZmqSub};

/// Wait up to `timeout_ms` for a readable socket, then read one `[topic, payload]` message.
///
/// Negative timeouts block; `0` checks once and returns.
pub(crate) fn recv_topic_frame(
    sock: &zmq::Socket,
    timeout_ms: i64,
) -> TransportResult<Option<TopicFrame>> {
    let mut poll_items = [sock.as_poll_item(zmq::POLLIN)];
    match zmq::poll(&mut poll_items, timeout_ms) {
        Ok(_) => {}
        // Signal delivery; the caller sees an ordinary timeout and polls again
        Err(zmq::Error::EINTR) => return Ok(None),
        Err(e) => return Err(e.into()),
    }

    if !poll_items[0].is_readable() {
        return Ok(None);
    }

    let parts = sock
        .recv_multipart(0)
        .map_err(|e| TransportError::ReceiveFailed(e.to_string()))?;
    TopicFrame::from_parts(parts).map(Some)
}

/// Send one `[topic, payload]` message.
pub(crate) fn send_topic_frame(sock: &zmq::Socket, topic: &[u8], data: &[u8]) -> TransportResult<()> {
    sock.send(topic, zmq::SNDMORE).map_err(send_error)?;
    sock.send(data, 0).map_err(send_error)?;
    Ok(())
}

fn send_error(err: zmq::Error) -> TransportError {
    match err {
        zmq::Error::EAGAIN => TransportError::Timeout,
        other => TransportError::SendFailed(other.to_string()),
    }
}
