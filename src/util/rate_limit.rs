//! Rate limiting utilities

use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use std::num::NonZeroU32;
use std::sync::Arc;

/// Rate limiter type alias
pub type Limiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Create a rate limiter with the specified requests per second
pub fn create_limiter(requests_per_second: u32) -> Arc<Limiter> {
    let quota = Quota::per_second(NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN));
    Arc::new(RateLimiter::direct(quota))
}

/// Max unit placements forwarded to the server per second
pub const PLACEMENT_RATE_LIMIT: u32 = 5;

/// Throttle for outgoing placement intents
#[derive(Clone)]
pub struct IntentRateLimiter {
    placement_limiter: Arc<Limiter>,
}

impl IntentRateLimiter {
    pub fn new() -> Self {
        Self::with_rate(PLACEMENT_RATE_LIMIT)
    }

    pub fn with_rate(per_second: u32) -> Self {
        Self {
            placement_limiter: create_limiter(per_second),
        }
    }

    /// Check if a placement is allowed (returns true if allowed)
    pub fn check_placement(&self) -> bool {
        self.placement_limiter.check().is_ok()
    }
}

impl Default for IntentRateLimiter {
    fn default() -> Self {
        Self::new()
    }
}
