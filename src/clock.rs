//! Time source abstraction so rate-limit windows can be tested
//! deterministically.

use std::time::Instant;

/// Source of monotonic time for the rate limiter.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Production clock backed by `Instant::now`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}
