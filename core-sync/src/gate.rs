//! # Admission Gate
//!
//! Minimum-interval throttle in front of every sync run. The photos API
//! answers bursts with HTTP 429, so non-initial runs closer together than
//! the interval are turned away before any network call.
//!
//! The gate is checked twice: when a load is enqueued (avoids scheduling
//! pointless work) and again when the run starts (queued duplicates).

use std::time::Duration;

/// Default minimum time between two non-initial syncs: 15 minutes.
pub const MIN_SYNC_INTERVAL_MS: i64 = 900_000;

/// Time-based admission check for sync runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdmissionGate {
    min_interval_ms: i64,
}

impl AdmissionGate {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval_ms: i64::try_from(min_interval.as_millis()).unwrap_or(i64::MAX),
        }
    }

    pub fn min_interval_ms(&self) -> i64 {
        self.min_interval_ms
    }

    /// An initial sync is always admitted. Otherwise strictly more than the
    /// minimum interval must have passed since `last_sync_ms`.
    pub fn is_sync_allowed(&self, is_initial_sync: bool, last_sync_ms: i64, now_ms: i64) -> bool {
        is_initial_sync || now_ms.saturating_sub(last_sync_ms) > self.min_interval_ms
    }

    /// Milliseconds until a non-initial sync would be admitted, 0 if it already is.
    pub fn remaining_ms(&self, last_sync_ms: i64, now_ms: i64) -> i64 {
        let elapsed = now_ms.saturating_sub(last_sync_ms);
        if elapsed > self.min_interval_ms {
            0
        } else {
            self.min_interval_ms - elapsed + 1
        }
    }
}

impl Default for AdmissionGate {
    fn default() -> Self {
        Self {
            min_interval_ms: MIN_SYNC_INTERVAL_MS,
        }
    }
}
