// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Periodic liveness signal
//!
//! The service owns its own PUSH socket and background thread, so a component
//! stuck in a long handler keeps signalling only as long as the process is
//! healthy enough to run the thread. Stopping is explicit: [`HeartbeatService::stop`]
//! or dropping the handle.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use tracklink_protocol::{encode, Payload};
use tracklink_transports::prelude::*;

use crate::error::BusResult;

const STOP_CHECK_INTERVAL: Duration = Duration::from_millis(20);

pub struct HeartbeatService {
    component_id: String,
    interval: Duration,
    running: Arc<AtomicBool>,
    beats_sent: Arc<AtomicU64>,
    thread: Option<JoinHandle<()>>,
}

impl HeartbeatService {
    pub fn start(
        context: Arc<zmq::Context>,
        ingress: ClientConfig,
        component_id: impl Into<String>,
        interval: Duration,
    ) -> BusResult<Self> {
        let component_id = component_id.into();
        let mut push = ZmqPush::new(context, ingress)?;
        push.start()?;

        let running = Arc::new(AtomicBool::new(true));
        let beats_sent = Arc::new(AtomicU64::new(0));

        let thread = {
            let component_id = component_id.clone();
            let running = Arc::clone(&running);
            let beats_sent = Arc::clone(&beats_sent);
            std::thread::Builder::new()
                .name(format!("heartbeat-{}", component_id))
                .spawn(move || {
                    debug!("[HEARTBEAT] Started for {}", component_id);
                    while wait_interval(&running, interval) {
                        match send_heartbeat(&push, &component_id) {
                            Ok(()) => {
                                beats_sent.fetch_add(1, Ordering::Relaxed);
                            }
                            // The broker may come back; keep signalling
                            Err(e) => warn!("[HEARTBEAT] Failed for {}: {}", component_id, e),
                        }
                    }
                    let _ = push.stop();
                    debug!("[HEARTBEAT] Stopped for {}", component_id);
                })?
        };

        Ok(Self {
            component_id,
            interval,
            running,
            beats_sent,
            thread: Some(thread),
        })
    }

    pub fn component_id(&self) -> &str {
        &self.component_id
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    pub fn beats_sent(&self) -> u64 {
        self.beats_sent.load(Ordering::Relaxed)
    }

    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for HeartbeatService {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Sleep one interval; false as soon as a stop is requested
fn wait_interval(running: &AtomicBool, interval: Duration) -> bool {
    let deadline = Instant::now() + interval;
    loop {
        if !running.load(Ordering::Relaxed) {
            return false;
        }
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return true;
        }
        std::thread::sleep(remaining.min(STOP_CHECK_INTERVAL));
    }
}

fn send_heartbeat(push: &ZmqPush, component_id: &str) -> BusResult<()> {
    let payload = Payload::Heartbeat {
        component_id: component_id.to_string(),
        sent_at_ms: chrono::Utc::now().timestamp_millis().max(0) as u64,
    };
    let data = encode(&payload)?;
    push.push(payload.topic().as_bytes(), &data)?;
    Ok(())
}
