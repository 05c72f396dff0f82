//! Chime rate limiter
//!
//! One shared cooldown across every session: a chime allowed for any owner
//! suppresses chimes from all owners for the rest of the window. The check
//! and the record are a single atomic step under the lock.

use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Decision returned by the limiter
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChimeDecision {
    pub allowed: bool,
    /// Seconds until the next chime would be allowed (0 when allowed)
    pub seconds_remaining: f64,
}

/// Centralized chime cooldown state
pub struct ChimeLimiter {
    last_played: Mutex<Option<Instant>>,
    window: Duration,
}

impl ChimeLimiter {
    pub fn new(window: Duration) -> Self {
        Self {
            last_played: Mutex::new(None),
            window,
        }
    }

    /// Check whether a chime may play now; an allowed decision records the
    /// time, starting a new window.
    pub fn check(&self) -> ChimeDecision {
        self.check_at(Instant::now())
    }

    fn check_at(&self, now: Instant) -> ChimeDecision {
        let mut last = self.last_played.lock().unwrap();
        match *last {
            Some(at) if now.duration_since(at) < self.window => {
                let remaining = self.window - now.duration_since(at);
                debug!(seconds_remaining = remaining.as_secs_f64(), "Chime suppressed");
                ChimeDecision {
                    allowed: false,
                    seconds_remaining: (remaining.as_secs_f64() * 10.0).round() / 10.0,
                }
            }
            _ => {
                *last = Some(now);
                ChimeDecision {
                    allowed: true,
                    seconds_remaining: 0.0,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_window_enforced() {
        let limiter = ChimeLimiter::new(Duration::from_secs(60));

        // t=0: allowed and recorded
        assert!(limiter.check().allowed);

        // t=30: still inside the window
        tokio::time::advance(Duration::from_secs(30)).await;
        let denied = limiter.check();
        assert!(!denied.allowed);
        assert!((denied.seconds_remaining - 30.0).abs() < 0.2);

        // t=61: window elapsed
        tokio::time::advance(Duration::from_secs(31)).await;
        assert!(limiter.check().allowed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_denied_check_does_not_extend_window() {
        let limiter = ChimeLimiter::new(Duration::from_secs(60));
        assert!(limiter.check().allowed);

        // Repeated denied checks must not push the window out
        for _ in 0..5 {
            tokio::time::advance(Duration::from_secs(10)).await;
            assert!(!limiter.check().allowed);
        }
        tokio::time::advance(Duration::from_secs(10)).await;
        assert!(limiter.check().allowed);
    }

    #[tokio::test]
    async fn test_first_check_always_allowed() {
        let limiter = ChimeLimiter::new(Duration::from_secs(60));
        let decision = limiter.check();
        assert!(decision.allowed);
        assert_eq!(decision.seconds_remaining, 0.0);
    }
}
