// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Token-bucket admission control for backfill traffic.
//!
//! One bucket per request class guards the feeder queue: however many
//! lookups miss the fast tier, the rate of new backfill requests (and
//! therefore of slow-source multi-gets) stays bounded. A miss spike
//! degrades to more empty responses, never to source overload.
//!
//! A denial is normal control flow, not an error, and nothing is queued on
//! denial: the caller's next request re-enters admission from scratch.
//!
//! # Example
//!
//! ```
//! use cache_relay::RateLimiter;
//!
//! let limiter = RateLimiter::new(2.0);
//! assert!(limiter.try_acquire());
//! assert!(limiter.try_acquire());
//! // Two permits per second: the burst is spent
//! assert!(!limiter.try_acquire());
//! ```

use std::time::Instant;

use parking_lot::Mutex;

struct BucketState {
    available: f64,
    refreshed_at: Instant,
}

/// Non-blocking token bucket.
///
/// Capacity is one second's worth of permits (at least one, so fractional
/// rates below 1/s still admit). Tokens refill continuously at the
/// configured rate; unspent permits never accumulate past capacity. Every
/// admission check refreshes the fractional balance first.
pub struct RateLimiter {
    rate: f64,
    capacity: f64,
    state: Mutex<BucketState>,
}

impl RateLimiter {
    /// Create a bucket admitting `permits_per_sec` on average. A rate of
    /// zero (or below) denies everything.
    #[must_use]
    pub fn new(permits_per_sec: f64) -> Self {
        let rate = permits_per_sec.max(0.0);
        Self {
            rate,
            capacity: rate.max(1.0),
            state: Mutex::new(BucketState {
                available: rate,
                refreshed_at: Instant::now(),
            }),
        }
    }

    /// Admit one unit now, or deny immediately. Never blocks, never queues.
    pub fn try_acquire(&self) -> bool {
        if self.rate <= 0.0 {
            return false;
        }

        let mut state = self.state.lock();
        let now = Instant::now();
        let elapsed = now.duration_since(state.refreshed_at).as_secs_f64();
        state.available = (state.available + elapsed * self.rate).min(self.capacity);
        state.refreshed_at = now;

        if state.available >= 1.0 {
            state.available -= 1.0;
            true
        } else {
            false
        }
    }

    /// Configured steady rate in permits per second.
    #[must_use]
    pub fn rate(&self) -> f64 {
        self.rate
    }
}
