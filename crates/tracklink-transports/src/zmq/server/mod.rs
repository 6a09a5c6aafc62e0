// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! ZMQ server-side (bound) socket patterns

pub mod pub_socket;
pub mod pull;

pub use pub_socket::ZmqPub;
pub use pull::ZmqPull;
