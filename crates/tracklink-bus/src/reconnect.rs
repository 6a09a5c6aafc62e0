// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Retry with exponential backoff

use crate::error::BusResult;
use std::time::Duration;
use tracing::{info, warn};

const MAX_BACKOFF_MS: u64 = 60_000;

/// Exponential backoff over a fixed number of retries
///
/// `max_retries == 0` disables retrying: the first failure is final.
#[derive(Debug, Clone)]
pub struct ReconnectionStrategy {
    base_backoff_ms: u64,
    max_backoff_ms: u64,
    current_attempt: u32,
    max_retries: u32,
}

impl ReconnectionStrategy {
    pub fn new(base_backoff_ms: u64, max_retries: u32) -> Self {
        Self {
            base_backoff_ms,
            max_backoff_ms: MAX_BACKOFF_MS,
            current_attempt: 0,
            max_retries,
        }
    }

    pub fn disabled() -> Self {
        Self::new(0, 0)
    }

    /// Backoff before the next retry, `None` once retries are used up
    pub fn next_backoff(&mut self) -> Option<Duration> {
        if self.is_exhausted() {
            return None;
        }
        self.current_attempt += 1;

        // base * 2^(attempt - 1)
        let exp = 2u64.saturating_pow(self.current_attempt - 1);
        let backoff_ms = self.base_backoff_ms.saturating_mul(exp).min(self.max_backoff_ms);
        Some(Duration::from_millis(backoff_ms))
    }

    pub fn reset(&mut self) {
        self.current_attempt = 0;
    }

    pub fn attempt_number(&self) -> u32 {
        self.current_attempt
    }

    pub fn is_exhausted(&self) -> bool {
        self.current_attempt >= self.max_retries
    }
}

/// Run `operation`, retrying retryable failures until the strategy gives up
pub fn retry_with_backoff<F, T>(
    mut operation: F,
    strategy: &mut ReconnectionStrategy,
    operation_name: &str,
) -> BusResult<T>
where
    F: FnMut() -> BusResult<T>,
{
    loop {
        match operation() {
            Ok(result) => {
                if strategy.attempt_number() > 0 {
                    info!(
                        "[RECONNECT] {} succeeded after {} retries",
                        operation_name,
                        strategy.attempt_number()
                    );
                }
                strategy.reset();
                return Ok(result);
            }
            Err(e) if e.is_retryable() => match strategy.next_backoff() {
                Some(backoff) => {
                    warn!(
                        "[RECONNECT] {} failed (retry {}): {} - retrying in {:?}",
                        operation_name,
                        strategy.attempt_number(),
                        e,
                        backoff
                    );
                    std::thread::sleep(backoff);
                }
                None => return Err(e),
            },
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BusError;
    use tracklink_transports::TransportError;

    #[test]
    fn test_exponential_backoff() {
        let mut strategy = ReconnectionStrategy::new(100, 4);

        assert_eq!(strategy.next_backoff(), Some(Duration::from_millis(100)));
        assert_eq!(strategy.next_backoff(), Some(Duration::from_millis(200)));
        assert_eq!(strategy.next_backoff(), Some(Duration::from_millis(400)));
        assert_eq!(strategy.next_backoff(), Some(Duration::from_millis(800)));
        assert_eq!(strategy.next_backoff(), None);
    }

    #[test]
    fn test_backoff_capped() {
        let mut strategy = ReconnectionStrategy::new(1000, 20);
        for _ in 0..10 {
            strategy.next_backoff();
        }
        assert_eq!(strategy.next_backoff(), Some(Duration::from_millis(60_000)));
    }

    #[test]
    fn test_disabled_never_retries() {
        let mut strategy = ReconnectionStrategy::disabled();
        assert!(strategy.is_exhausted());
        assert_eq!(strategy.next_backoff(), None);
    }

    #[test]
    fn test_retry_stops_on_fatal_error() {
        let mut strategy = ReconnectionStrategy::new(1, 5);
        let mut calls = 0;
        let result: BusResult<()> = retry_with_backoff(
            || {
                calls += 1;
                Err(BusError::InvalidConfig("bad".into()))
            },
            &mut strategy,
            "test",
        );
        assert!(result.is_err());
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_retry_until_success() {
        let mut strategy = ReconnectionStrategy::new(1, 5);
        let mut calls = 0;
        let result = retry_with_backoff(
            || {
                calls += 1;
                if calls < 3 {
                    Err(BusError::Transport(TransportError::Timeout))
                } else {
                    Ok(calls)
                }
            },
            &mut strategy,
            "test",
        );
        assert_eq!(result.unwrap(), 3);
        assert_eq!(strategy.attempt_number(), 0);
    }
}
