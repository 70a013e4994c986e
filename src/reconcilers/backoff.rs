// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Per-object exponential requeue delay for failed reconciles

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tokio_retry::strategy::ExponentialBackoff;

/// Consecutive failures are capped here; the delay reached the maximum long before.
const MAX_TRACKED_FAILURES: u32 = 64;

#[derive(Debug)]
struct Failures {
    count: u32,
    last: Instant,
}

#[derive(Debug)]
pub struct ErrorBackoff {
    base: Duration,
    max: Duration,
    failures: Mutex<HashMap<String, Failures>>,
}

impl ErrorBackoff {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self {
            base,
            max,
            failures: Mutex::new(HashMap::new()),
        }
    }

    /// Record a failure for `key` and return the delay before the next attempt.
    /// The delay doubles with every consecutive failure, up to the maximum.
    pub fn next_delay(&self, key: &str) -> Duration {
        let now = Instant::now();
        let mut failures = self.failures.lock().unwrap_or_else(|e| e.into_inner());

        // Objects deleted while failing are never reconciled again
        let expiry = self.expiry();
        failures.retain(|_, f| now.duration_since(f.last) < expiry);

        let entry = failures.entry(key.to_string()).or_insert(Failures { count: 0, last: now });
        let attempt = entry.count;
        entry.count = (entry.count + 1).min(MAX_TRACKED_FAILURES);
        entry.last = now;

        self.strategy().nth(attempt as usize).unwrap_or(self.max)
    }

    /// Forget the failures of `key` after a successful reconcile
    pub fn reset(&self, key: &str) {
        self.failures
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(key);
    }

    /// base, 2 * base, 4 * base, ... capped at max
    fn strategy(&self) -> ExponentialBackoff {
        let base_millis = (self.base.as_millis() as u64).max(2);
        ExponentialBackoff::from_millis(2)
            .factor(base_millis / 2)
            .max_delay(self.max)
    }

    /// An object failing repeatedly is requeued at most `max` after its last failure
    fn expiry(&self) -> Duration {
        self.max.saturating_mul(2)
    }
}
