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

/// Create a rate limiter with the specified events per second
pub fn create_limiter(per_second: u32) -> Arc<Limiter> {
    let quota = Quota::per_second(NonZeroU32::new(per_second).unwrap_or(NonZeroU32::MIN));
    Arc::new(RateLimiter::direct(quota))
}

/// Missing-game error lines allowed per second
pub const MISSING_GAME_LOG_RATE: u32 = 5;

/// Throttles a noisy log line, counting what it suppresses
pub struct LogThrottle {
    limiter: Arc<Limiter>,
    suppressed: u64,
}

impl LogThrottle {
    pub fn new(per_second: u32) -> Self {
        Self {
            limiter: create_limiter(per_second),
            suppressed: 0,
        }
    }

    /// Returns `Some(n)` when the line may be emitted, where `n` is the number
    /// of lines dropped since the last emitted one.
    pub fn allow(&mut self) -> Option<u64> {
        if self.limiter.check().is_ok() {
            Some(std::mem::take(&mut self.suppressed))
        } else {
            self.suppressed += 1;
            None
        }
    }
}

impl Default for LogThrottle {
    fn default() -> Self {
        Self::new(MISSING_GAME_LOG_RATE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn burst_is_capped_and_suppressed_lines_counted() {
        let mut throttle = LogThrottle::new(2);

        let allowed = (0..10).filter_map(|_| throttle.allow()).count();

        assert_eq!(allowed, 2);
        assert_eq!(throttle.suppressed, 8);
    }

    #[test]
    fn first_line_reports_nothing_suppressed() {
        let mut throttle = LogThrottle::default();
        assert_eq!(throttle.allow(), Some(0));
    }
}
