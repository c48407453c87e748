//! In-memory per-client rate limiter using the governor crate.

use std::num::NonZeroU32;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use governor::clock::{Clock, DefaultClock};
use governor::state::keyed::DefaultKeyedStateStore;
use governor::{Quota, RateLimiter as GovernorRateLimiter};

use blogicum_core::ports::{RateLimitError, RateLimitResult, RateLimiter};

type KeyedRateLimiter = GovernorRateLimiter<String, DefaultKeyedStateStore<String>, DefaultClock>;

/// Checks between two sweeps of replenished client entries.
const SWEEP_EVERY: u64 = 1024;

/// Rate limiter configuration.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Maximum requests per window and client.
    pub max_requests: u32,
    /// Window duration.
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 30,
            window: Duration::from_secs(60),
        }
    }
}

impl RateLimitConfig {
    /// Load from `RATE_LIMIT_MAX_REQUESTS` and `RATE_LIMIT_WINDOW_SECS`.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_requests: std::env::var("RATE_LIMIT_MAX_REQUESTS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_requests),
            window: std::env::var("RATE_LIMIT_WINDOW_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.window),
        }
    }

    fn quota(&self) -> Quota {
        let burst = NonZeroU32::new(self.max_requests).unwrap_or(NonZeroU32::MIN);
        let period = self.window / burst.get();
        Quota::with_period(period)
            .unwrap_or_else(|| Quota::per_second(burst))
            .allow_burst(burst)
    }
}

/// GCRA rate limiter keyed by client (usually the peer IP).
///
/// Limits are per-process, not shared between instances.
pub struct InMemoryRateLimiter {
    limiter: KeyedRateLimiter,
    clock: DefaultClock,
    checks: AtomicU64,
}

impl InMemoryRateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            limiter: KeyedRateLimiter::keyed(config.quota()),
            clock: DefaultClock::default(),
            checks: AtomicU64::new(0),
        }
    }

    /// Number of clients currently tracked.
    pub fn len(&self) -> usize {
        self.limiter.len()
    }

    pub fn is_empty(&self) -> bool {
        self.limiter.is_empty()
    }

    /// Forget clients whose quota has fully replenished.
    pub fn sweep(&self) {
        let before = self.limiter.len();
        self.limiter.retain_recent();
        self.limiter.shrink_to_fit();
        tracing::debug!(before, after = self.limiter.len(), "Swept rate limiter state");
    }
}

#[async_trait]
impl RateLimiter for InMemoryRateLimiter {
    async fn check(&self, key: &str) -> Result<RateLimitResult, RateLimitError> {
        let result = match self.limiter.check_key(&key.to_string()) {
            Ok(()) => RateLimitResult {
                allowed: true,
                retry_after: Duration::ZERO,
            },
            Err(not_until) => RateLimitResult {
                allowed: false,
                retry_after: not_until.wait_time_from(self.clock.now()),
            },
        };

        if (self.checks.fetch_add(1, Ordering::Relaxed) + 1) % SWEEP_EVERY == 0 {
            self.sweep();
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(max_requests: u32) -> InMemoryRateLimiter {
        InMemoryRateLimiter::new(RateLimitConfig {
            max_requests,
            window: Duration::from_secs(60),
        })
    }

    #[tokio::test]
    async fn test_burst_then_reject() {
        let limiter = limiter(2);

        assert!(limiter.check("10.0.0.1").await.unwrap().allowed);
        assert!(limiter.check("10.0.0.1").await.unwrap().allowed);

        let rejected = limiter.check("10.0.0.1").await.unwrap();
        assert!(!rejected.allowed);
        assert!(rejected.retry_after > Duration::ZERO);
    }

    #[tokio::test]
    async fn test_keys_are_limited_independently() {
        let limiter = limiter(1);

        assert!(limiter.check("10.0.0.1").await.unwrap().allowed);
        assert!(!limiter.check("10.0.0.1").await.unwrap().allowed);
        assert!(limiter.check("10.0.0.2").await.unwrap().allowed);
    }

    fn fast_limiter() -> InMemoryRateLimiter {
        InMemoryRateLimiter::new(RateLimitConfig {
            max_requests: 1,
            window: Duration::from_millis(50),
        })
    }

    #[tokio::test]
    async fn test_sweep_forgets_replenished_clients() {
        let limiter = fast_limiter();
        for i in 0..100 {
            limiter.check(&format!("10.0.1.{i}")).await.unwrap();
        }
        assert_eq!(limiter.len(), 100);

        // Still inside the window: nothing is replenished yet.
        limiter.sweep();
        assert_eq!(limiter.len(), 100);

        tokio::time::sleep(Duration::from_millis(250)).await;
        limiter.sweep();
        assert!(limiter.is_empty());
    }

    #[tokio::test]
    async fn test_checks_sweep_periodically() {
        let limiter = fast_limiter();
        for i in 0..SWEEP_EVERY - 1 {
            limiter.check(&format!("client-{i}")).await.unwrap();
        }
        assert_eq!(limiter.len() as u64, SWEEP_EVERY - 1);

        tokio::time::sleep(Duration::from_millis(250)).await;
        limiter.check("latecomer").await.unwrap();
        assert_eq!(limiter.len(), 1);
    }
}
