// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # tracklink-runtime
//!
//! The loop every tracklink component runs:
//!
//! 1. register with the core and block for the configuration reply
//! 2. configure the component
//! 3. subscribe to `SHUTDOWN` and the component's data topics
//! 4. poll, dispatch by payload kind, repeat
//!
//! A shutdown notice, or [`ShutdownHandle::request`], ends the loop after the
//! message in hand is finished. Configuration pushed mid-run is applied
//! before the next message. Frame notices are resolved to read-only buffer
//! views; a recycled buffer is skipped rather than treated as an error.

pub mod component;
pub mod config;
pub mod error;
pub mod runtime;

pub use component::{Component, ComponentContext};
pub use config::{ComponentConfig, COMPONENT_ADDRESS_ENV};
pub use error::{RuntimeError, RuntimeResult};
pub use runtime::{ComponentRuntime, RunSummary, RuntimeOptions, ShutdownHandle};
pub use tracklink_config::ComponentAddress;
