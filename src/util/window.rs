//! Frequency / mean-over-window counters shared by flood limiters (H) and
//! the zlib/compression statistics (J).

use std::time::{Duration, Instant};

/// A (window_start, count) pair with hard window resets, per spec.md §3's
/// invariant: "flood windows are monotonic: counters reset when window
/// expires, not by partial decay."
#[derive(Debug, Clone, Copy)]
pub struct WindowCounter {
    window_start: Instant,
    count: u32,
    period: Duration,
}

impl WindowCounter {
    pub fn new(now: Instant, period: Duration) -> Self {
        Self {
            window_start: now,
            count: 0,
            period,
        }
    }

    /// Increment the counter, resetting the window first if it has expired.
    /// Returns the post-increment count for the current window.
    pub fn tick(&mut self, now: Instant) -> u32 {
        if now.duration_since(self.window_start) > self.period {
            self.window_start = now;
            self.count = 0;
        }
        self.count += 1;
        self.count
    }

    pub fn count(&self) -> u32 {
        self.count
    }
}

/// Running total of bytes saved by an optional transform (zlib, TTHS short
/// form), accumulated without ever resetting — a lifetime counter for
/// `/stats`, not a rate window.
#[derive(Debug, Clone, Copy, Default)]
pub struct SavedBytesCounter {
    total: u64,
}

impl SavedBytesCounter {
    pub fn add(&mut self, original: usize, compressed: usize) {
        if compressed < original {
            self.total += (original - compressed) as u64;
        }
    }

    pub fn total(&self) -> u64 {
        self.total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resets_after_period() {
        let now = Instant::now();
        let mut c = WindowCounter::new(now, Duration::from_secs(1));
        assert_eq!(c.tick(now), 1);
        assert_eq!(c.tick(now), 2);
        let later = now + Duration::from_secs(2);
        assert_eq!(c.tick(later), 1);
    }
}
