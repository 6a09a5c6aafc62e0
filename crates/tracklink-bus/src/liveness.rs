// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Supervisor-side heartbeat bookkeeping

use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use tracklink_protocol::{Envelope, Payload};

/// Tracks the last heartbeat seen from each component
///
/// Time is passed in so callers (and tests) control the clock. A component
/// listed by [`expired`](Self::expired) is a liveness failure; what to do
/// about it (usually killing the process) is up to the supervisor.
#[derive(Debug)]
pub struct LivenessMonitor {
    timeout: Duration,
    last_seen: HashMap<String, Instant>,
}

impl LivenessMonitor {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            last_seen: HashMap::new(),
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn record(&mut self, component_id: &str, now: Instant) {
        if self.last_seen.insert(component_id.to_string(), now).is_none() {
            debug!("[HEARTBEAT] Now tracking {}", component_id);
        }
    }

    /// Record the envelope if it is a heartbeat; returns the sender if so
    pub fn observe<'a>(&mut self, envelope: &'a Envelope, now: Instant) -> Option<&'a str> {
        match &envelope.payload {
            Payload::Heartbeat { component_id, .. } => {
                self.record(component_id, now);
                Some(component_id.as_str())
            }
            _ => None,
        }
    }

    pub fn is_alive(&self, component_id: &str, now: Instant) -> bool {
        self.last_seen
            .get(component_id)
            .is_some_and(|seen| now.saturating_duration_since(*seen) <= self.timeout)
    }

    /// Components whose last heartbeat is older than the timeout, sorted
    pub fn expired(&self, now: Instant) -> Vec<String> {
        let mut expired: Vec<String> = self
            .last_seen
            .iter()
            .filter(|(_, seen)| now.saturating_duration_since(**seen) > self.timeout)
            .map(|(id, _)| id.clone())
            .collect();
        expired.sort();
        for id in &expired {
            warn!("[HEARTBEAT] {} missed its liveness deadline", id);
        }
        expired
    }

    pub fn forget(&mut self, component_id: &str) -> bool {
        self.last_seen.remove(component_id).is_some()
    }

    pub fn tracked(&self) -> usize {
        self.last_seen.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn heartbeat(id: &str) -> Envelope {
        Envelope::new(Payload::Heartbeat {
            component_id: id.into(),
            sent_at_ms: 0,
        })
    }

    #[test]
    fn test_expiry() {
        let start = Instant::now();
        let mut monitor = LivenessMonitor::new(Duration::from_secs(5));
        monitor.record("Sleap", start);
        monitor.record("Recorder", start + Duration::from_secs(3));

        assert!(monitor.expired(start + Duration::from_secs(5)).is_empty());
        assert_eq!(monitor.expired(start + Duration::from_secs(6)), vec!["Sleap"]);
        assert_eq!(
            monitor.expired(start + Duration::from_secs(9)),
            vec!["Recorder", "Sleap"]
        );
    }

    #[test]
    fn test_observe_only_heartbeats() {
        let now = Instant::now();
        let mut monitor = LivenessMonitor::new(Duration::from_secs(1));

        assert_eq!(monitor.observe(&heartbeat("Sleap"), now), Some("Sleap"));
        assert_eq!(monitor.observe(&Envelope::new(Payload::Shutdown), now), None);
        assert_eq!(monitor.tracked(), 1);
        assert!(monitor.is_alive("Sleap", now));
        assert!(!monitor.is_alive("Other", now));
    }

    #[test]
    fn test_refresh_and_forget() {
        let start = Instant::now();
        let mut monitor = LivenessMonitor::new(Duration::from_secs(1));
        monitor.record("Sleap", start);
        monitor.record("Sleap", start + Duration::from_secs(2));
        assert!(monitor.expired(start + Duration::from_secs(2)).is_empty());

        assert!(monitor.forget("Sleap"));
        assert!(!monitor.forget("Sleap"));
        assert_eq!(monitor.tracked(), 0);
    }
}
