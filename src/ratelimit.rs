use leaky_bucket::RateLimiter as InnerRateLimiter;
use std::{sync::OnceLock, time::Duration};

/// Throttles bulk Discord mutations so they stay clear of route limits.
pub struct RateLimiter {
    pub roles: InnerRateLimiter,
    pub channels: InnerRateLimiter,
}
static RATELIMITER: OnceLock<RateLimiter> = OnceLock::new();

pub fn ratelimiter() -> &'static RateLimiter {
    RATELIMITER.get_or_init(|| RateLimiter {
        roles: InnerRateLimiter::builder()
            .interval(Duration::from_millis(1000))
            .refill(5)
            .max(5)
            .initial(5)
            .build(),
        // Channel renames are limited to two per ten minutes per channel.
        channels: InnerRateLimiter::builder()
            .interval(Duration::from_secs(5))
            .refill(1)
            .max(3)
            .initial(3)
            .build(),
    })
}
