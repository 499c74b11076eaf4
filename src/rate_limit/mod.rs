//! Multi-tier fixed-window rate limiting.
//!
//! Three tiers apply to every analysis request, evaluated in a fixed order:
//! Global (15 min / 100), Daily (24 h / 100), PerMinute (1 min / 5). The
//! first tier that rejects short-circuits the rest, so later tiers are not
//! charged for a request that was already refused.

pub mod store;

use std::sync::Arc;
use std::time::Duration;

use crate::client_key::ClientKey;
use crate::clock::Clock;
use crate::config::RateLimitSettings;
use crate::error::GatewayError;

pub use store::RateLimitStore;

/// One independently configured rate-limit scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    Global,
    Daily,
    PerMinute,
}

/// Immutable per-tier policy: window length, request cap, and the wire
/// message/retry-after reported on rejection.
#[derive(Debug, Clone)]
pub struct TierPolicy {
    pub tier: Tier,
    pub window: Duration,
    pub max_requests: u32,
    pub retry_after_secs: u64,
    pub message: &'static str,
}

/// Outcome of a single-tier check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed,
    Rejected { retry_after: u64 },
}

/// Applies fixed-window counting against the shared store for all tiers.
pub struct RateLimiter {
    store: RateLimitStore,
    // Evaluation order: Global, Daily, PerMinute.
    policies: [TierPolicy; 3],
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    pub fn new(settings: &RateLimitSettings, clock: Arc<dyn Clock>) -> Self {
        let policies = [
            TierPolicy {
                tier: Tier::Global,
                window: settings.global.window,
                max_requests: settings.global.max_requests,
                retry_after_secs: settings.global.retry_after_secs,
                message: "Too many requests from this IP, please try again later.",
            },
            TierPolicy {
                tier: Tier::Daily,
                window: settings.daily.window,
                max_requests: settings.daily.max_requests,
                retry_after_secs: settings.daily.retry_after_secs,
                message: "Daily request limit exceeded. Please try again tomorrow.",
            },
            TierPolicy {
                tier: Tier::PerMinute,
                window: settings.per_minute.window,
                max_requests: settings.per_minute.max_requests,
                retry_after_secs: settings.per_minute.retry_after_secs,
                message: "Too many requests, please try again later.",
            },
        ];

        Self {
            store: RateLimitStore::new(),
            policies,
            clock,
        }
    }

    /// Count this request against one tier and decide whether it may proceed.
    ///
    /// The request is counted first; it is allowed only if the count after
    /// increment stays within the tier's cap.
    pub fn check(&self, key: &ClientKey, tier: Tier) -> Result<Decision, GatewayError> {
        let policy = self.policy(tier);
        let now = self.clock.now();

        let (count, window_start) = self.store.increment(key, tier, now, policy.window)?;

        if count <= policy.max_requests {
            return Ok(Decision::Allowed);
        }

        // Time left in the window, floored at the tier's nominal value so
        // clients always see a stable figure (60, 86400, 900).
        let elapsed = now.duration_since(window_start);
        let remaining = policy.window.saturating_sub(elapsed).as_secs();
        let retry_after = remaining.max(policy.retry_after_secs);

        Ok(Decision::Rejected { retry_after })
    }

    /// Check all tiers in order, translating the first rejection into a
    /// failure. Tiers after a rejecting one are not evaluated or charged.
    pub fn check_all(&self, key: &ClientKey) -> Result<(), GatewayError> {
        for policy in &self.policies {
            if let Decision::Rejected { retry_after } = self.check(key, policy.tier)? {
                return Err(GatewayError::RateLimited {
                    tier: policy.tier,
                    message: policy.message,
                    retry_after,
                });
            }
        }
        Ok(())
    }

    pub fn store(&self) -> &RateLimitStore {
        &self.store
    }

    fn policy(&self, tier: Tier) -> &TierPolicy {
        match tier {
            Tier::Global => &self.policies[0],
            Tier::Daily => &self.policies[1],
            Tier::PerMinute => &self.policies[2],
        }
    }
}
