//! Monotonic clock, injectable for tests.
//!
//! All deadline/window arithmetic in the core goes through this instead of
//! `Instant::now()` directly so tests can advance time deterministically
//! without sleeping.

use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy)]
pub struct Clock {
    offset: Duration,
}

impl Clock {
    pub fn new() -> Self {
        Self {
            offset: Duration::ZERO,
        }
    }

    /// Monotonic "now", offset by any time injected via `advance`.
    pub fn now(&self) -> Instant {
        Instant::now() + self.offset
    }

    /// Advance the clock without sleeping. Test-only in practice, but kept
    /// on the real type so production and test code share one API.
    pub fn advance(&mut self, by: Duration) {
        self.offset += by;
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_moves_now_forward() {
        let mut clock = Clock::new();
        let t0 = clock.now();
        clock.advance(Duration::from_secs(5));
        let t1 = clock.now();
        assert!(t1 >= t0 + Duration::from_secs(5));
    }
}
