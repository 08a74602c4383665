//! Component H: per-message-type flood limiters (spec.md §4.10).
//!
//! Each command class gets a monotonic-window counter per connection
//! (built on [`crate::util::window::WindowCounter`]) plus a global
//! `governor` rate limiter mirroring the teacher's existing join-flood
//! pattern, generalized from "one channel" to "one hub".

use crate::config::limits::{FloodAction, FloodRule};
use crate::util::window::WindowCounter;
use governor::{Quota, RateLimiter};
use governor::state::{InMemoryState, NotKeyed};
use governor::clock::DefaultClock;
use std::collections::HashMap;
use std::num::NonZeroU32;
use std::time::{Duration, Instant};

pub type GlobalLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Per-connection flood state: one window counter per command bucket
/// (spec.md §4.10 names buckets "search", "chat", "pm", "ctm", "unknown").
#[derive(Default)]
pub struct ConnectionFloodState {
    windows: HashMap<String, WindowCounter>,
    /// same-body repetition tracking for PM/MCTo (spec.md §4.10's
    /// "separate repetition-floor").
    last_pm_body: Option<(String, Instant, u32)>,
}

impl ConnectionFloodState {
    pub fn new() -> Self {
        Self::default()
    }

    /// PM/MCTo repetition-floor: same body from the same sender
    /// `>= limit` times within `window` triggers a ban.
    pub fn record_pm_repetition(&mut self, body: &str, limit: u32, window: Duration, now: Instant) -> bool {
        match &mut self.last_pm_body {
            Some((last_body, since, count)) if last_body == body && now.duration_since(*since) <= window => {
                *count += 1;
                *count >= limit
            }
            _ => {
                self.last_pm_body = Some((body.to_string(), now, 1));
                false
            }
        }
    }
}

/// Whether a message should be allowed, and if not, what to do about it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FloodVerdict {
    Allow,
    Report,
    Skip,
    Drop,
    Ban,
}

impl ConnectionFloodState {
    /// The real decision function: distinguishes "under limit" from
    /// "over limit, apply configured action" (the `record` method above
    /// only returns the configured action and can't express "allow").
    pub fn check(&mut self, bucket: &str, rule: &FloodRule, now: Instant) -> FloodVerdict {
        let window = self
            .windows
            .entry(bucket.to_string())
            .or_insert_with(|| WindowCounter::new(now, Duration::from_secs(rule.period_secs)));
        let count = window.tick(now);
        if count <= rule.limit {
            FloodVerdict::Allow
        } else {
            match rule.action {
                FloodAction::Report => FloodVerdict::Report,
                FloodAction::Skip => FloodVerdict::Skip,
                FloodAction::Drop => FloodVerdict::Drop,
                FloodAction::Ban => FloodVerdict::Ban,
            }
        }
    }
}

/// Builds the hub-wide `governor` limiter for a given per-second quota,
/// reusing the teacher's `governor::DefaultDirectRateLimiter` pattern.
/// Used per-bucket (spec.md §4.10's "global per-type counter"), with the
/// bucket's own configured limit as the shared quota.
pub fn global_limiter(per_second: u32) -> GlobalLimiter {
    let quota = Quota::per_second(NonZeroU32::new(per_second.max(1)).unwrap());
    RateLimiter::direct(quota)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(period_secs: u64, limit: u32, action: FloodAction) -> FloodRule {
        FloodRule { period_secs, limit, action }
    }

    #[test]
    fn under_limit_is_allowed() {
        let mut state = ConnectionFloodState::new();
        let now = Instant::now();
        let r = rule(60, 5, FloodAction::Ban);
        for _ in 0..5 {
            assert_eq!(state.check("search", &r, now), FloodVerdict::Allow);
        }
    }

    #[test]
    fn over_limit_triggers_configured_action() {
        let mut state = ConnectionFloodState::new();
        let now = Instant::now();
        let r = rule(60, 2, FloodAction::Ban);
        assert_eq!(state.check("search", &r, now), FloodVerdict::Allow);
        assert_eq!(state.check("search", &r, now), FloodVerdict::Allow);
        assert_eq!(state.check("search", &r, now), FloodVerdict::Ban);
    }

    #[test]
    fn pm_repetition_floor_bans_after_threshold() {
        let mut state = ConnectionFloodState::new();
        let now = Instant::now();
        let window = Duration::from_secs(60);
        assert!(!state.record_pm_repetition("hi", 3, window, now));
        assert!(!state.record_pm_repetition("hi", 3, window, now));
        assert!(state.record_pm_repetition("hi", 3, window, now));
    }

    #[test]
    fn window_resets_after_period_allows_again() {
        let mut state = ConnectionFloodState::new();
        let now = Instant::now();
        let r = rule(10, 1, FloodAction::Drop);
        assert_eq!(state.check("chat", &r, now), FloodVerdict::Allow);
        assert_eq!(state.check("chat", &r, now), FloodVerdict::Drop);
        let later = now + Duration::from_secs(11);
        assert_eq!(state.check("chat", &r, later), FloodVerdict::Allow);
    }
}
