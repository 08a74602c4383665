//! Component K: the periodic tick callback list.
//!
//! `timer_conn_period` drives per-connection `OnTimerBase`; this ticker
//! drives the handful of hub-wide periodic jobs (ban sweep, flood window
//! housekeeping, hublist refresh) off the same monotonic clock, each at
//! its own cadence, without spawning threads.

use std::time::{Duration, Instant};

pub struct PeriodicJob {
    pub period: Duration,
    last_run: Instant,
}

impl PeriodicJob {
    pub fn new(now: Instant, period: Duration) -> Self {
        Self { period, last_run: now }
    }

    /// Returns true (and resets the clock) if `period` has elapsed since
    /// the last run.
    pub fn due(&mut self, now: Instant) -> bool {
        if now.duration_since(self.last_run) >= self.period {
            self.last_run = now;
            true
        } else {
            false
        }
    }
}

#[derive(Default)]
pub struct Ticker {
    jobs: Vec<(&'static str, PeriodicJob)>,
}

impl Ticker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: &'static str, now: Instant, period: Duration) {
        self.jobs.push((name, PeriodicJob::new(now, period)));
    }

    /// Returns the names of every job due at `now`, each counted exactly
    /// once even if the server stalled past multiple periods.
    pub fn due_jobs(&mut self, now: Instant) -> Vec<&'static str> {
        self.jobs
            .iter_mut()
            .filter_map(|(name, job)| job.due(now).then_some(*name))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_fires_once_per_period() {
        let now = Instant::now();
        let mut ticker = Ticker::new();
        ticker.register("ban_sweep", now, Duration::from_secs(60));
        assert!(ticker.due_jobs(now).is_empty());
        assert_eq!(ticker.due_jobs(now + Duration::from_secs(61)), vec!["ban_sweep"]);
        assert!(ticker.due_jobs(now + Duration::from_secs(61)).is_empty());
    }
}
