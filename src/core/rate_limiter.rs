//! Sliding-window request throttle
//!
//! Consulted at every flow entry point *before* any state is created or
//! mutated. Each user gets an independent window; hitting the cap yields a
//! throttling notice and nothing else happens. Being limited is expected
//! behavior, not an anomaly, so it is logged at debug level only.

use dashmap::DashMap;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::Instant;

use crate::core::config::rate_limit;

#[derive(Clone)]
pub struct RateLimiter {
    /// Timestamps of recent flow entries per user, oldest first
    windows: std::sync::Arc<DashMap<i64, VecDeque<Instant>>>,
    window: Duration,
    max_per_window: usize,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(rate_limit::window(), rate_limit::max_per_window())
    }
}

impl RateLimiter {
    pub fn new(window: Duration, max_per_window: usize) -> Self {
        Self {
            windows: std::sync::Arc::new(DashMap::new()),
            window,
            max_per_window,
        }
    }

    /// Returns `true` if the user has exhausted their allowance for the
    /// current window. Prunes expired entries as a side effect.
    pub fn is_limited(&self, user_id: i64) -> bool {
        let now = Instant::now();
        let mut entry = self.windows.entry(user_id).or_default();
        while let Some(front) = entry.front() {
            if now.duration_since(*front) >= self.window {
                entry.pop_front();
            } else {
                break;
            }
        }
        let limited = entry.len() >= self.max_per_window;
        if limited {
            log::debug!("user {} rate limited ({} in window)", user_id, entry.len());
        }
        limited
    }

    /// Records one flow entry for the user. Call only after `is_limited`
    /// returned `false`.
    pub fn record(&self, user_id: i64) {
        self.windows.entry(user_id).or_default().push_back(Instant::now());
    }

    /// Drops a user's window entirely (admin reset, profile erase).
    pub fn forget(&self, user_id: i64) {
        self.windows.remove(&user_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_allows_up_to_limit_then_blocks() {
        let limiter = RateLimiter::new(Duration::from_secs(60), 3);

        for _ in 0..3 {
            assert!(!limiter.is_limited(1));
            limiter.record(1);
        }
        assert!(limiter.is_limited(1));
    }

    #[tokio::test]
    async fn test_windows_are_per_user() {
        let limiter = RateLimiter::new(Duration::from_secs(60), 1);
        limiter.record(1);
        assert!(limiter.is_limited(1));
        assert!(!limiter.is_limited(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_slides() {
        let limiter = RateLimiter::new(Duration::from_secs(60), 1);
        limiter.record(1);
        assert!(limiter.is_limited(1));

        tokio::time::advance(Duration::from_secs(61)).await;
        assert!(!limiter.is_limited(1));
    }

    #[tokio::test]
    async fn test_forget_resets_window() {
        let limiter = RateLimiter::new(Duration::from_secs(60), 1);
        limiter.record(7);
        assert!(limiter.is_limited(7));
        limiter.forget(7);
        assert!(!limiter.is_limited(7));
    }
}
