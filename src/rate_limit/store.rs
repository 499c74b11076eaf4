use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::client_key::ClientKey;
use crate::error::GatewayError;
use crate::rate_limit::Tier;

/// Mutable counter state for one (client, tier) pair.
#[derive(Debug, Clone)]
struct CounterEntry {
    count: u32,
    window_start: Instant,
}

/// In-memory fixed-window counters keyed by (client, tier).
///
/// Fixed-window counting resets at window boundaries rather than sliding, so
/// a client can issue up to `2 * max_requests` across a boundary. That burst
/// is accepted behavior, not a bug.
///
/// Entries are created lazily and never evicted; growth is bounded by the
/// number of distinct client keys seen over the process lifetime.
#[derive(Debug, Default)]
pub struct RateLimitStore {
    entries: Mutex<HashMap<(ClientKey, Tier), CounterEntry>>,
}

impl RateLimitStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The sole mutator: reset the window if it has elapsed, then count this
    /// request. Returns the count after increment and the window start.
    ///
    /// The read-modify-write is serialized under the store lock, so
    /// concurrent requests from the same client cannot lose increments.
    pub fn increment(
        &self,
        key: &ClientKey,
        tier: Tier,
        now: Instant,
        window: Duration,
    ) -> Result<(u32, Instant), GatewayError> {
        let mut entries = self.entries.lock().map_err(|_| GatewayError::Internal {
            detail: "rate limit store lock poisoned".to_string(),
        })?;

        let entry = entries
            .entry((key.clone(), tier))
            .or_insert_with(|| CounterEntry {
                count: 0,
                window_start: now,
            });

        if now.duration_since(entry.window_start) >= window {
            entry.count = 0;
            entry.window_start = now;
        }

        entry.count += 1;
        Ok((entry.count, entry.window_start))
    }

    /// Current count for a (client, tier) pair, if any request has been seen.
    pub fn count(&self, key: &ClientKey, tier: Tier) -> Result<Option<u32>, GatewayError> {
        let entries = self.entries.lock().map_err(|_| GatewayError::Internal {
            detail: "rate limit store lock poisoned".to_string(),
        })?;
        Ok(entries.get(&(key.clone(), tier)).map(|e| e.count))
    }

    /// Number of tracked (client, tier) pairs.
    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
