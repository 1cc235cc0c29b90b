// RPC Rate Limiting - fixed-window request throttling per client IP
//
// Applied ahead of envelope validation: each IP gets a fixed quota per fixed
// window, and anything beyond it is rejected with a retry hint. This is the
// only back-pressure the gateway applies; handlers themselves carry no
// deadlines.

use std::collections::HashMap;
use std::net::IpAddr;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tracing::warn;

/// Rate limiter configuration
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Maximum requests per window
    pub max_requests: u32,
    /// Fixed window duration
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 10,
            window: Duration::from_secs(300), // 5 minutes
        }
    }
}

/// Request counter for a single IP within the current window
#[derive(Debug)]
struct Window {
    started: Instant,
    count: u32,
}

/// Fixed-window per-IP request limiter
pub struct RateLimiter {
    config: RateLimitConfig,
    windows: Mutex<HashMap<IpAddr, Window>>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// Count a request against `ip`.
    /// Returns Err(seconds_until_window_reset) when the quota is spent.
    pub async fn check(&self, ip: IpAddr) -> Result<(), u64> {
        let mut windows = self.windows.lock().await;
        let now = Instant::now();

        let window = windows.entry(ip).or_insert(Window {
            started: now,
            count: 0,
        });

        if now.duration_since(window.started) >= self.config.window {
            window.started = now;
            window.count = 0;
        }

        window.count += 1;
        if window.count > self.config.max_requests {
            let remaining = self
                .config
                .window
                .saturating_sub(now.duration_since(window.started));
            warn!(%ip, count = window.count, "request rate limit exceeded");
            return Err(remaining.as_secs().max(1));
        }

        Ok(())
    }

    /// Drop windows that have been idle for at least one full window
    pub async fn cleanup(&self) {
        let mut windows = self.windows.lock().await;
        let now = Instant::now();
        let max_age = self.config.window * 2;
        windows.retain(|_, window| now.duration_since(window.started) < max_age);
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(RateLimitConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn ip(last: u8) -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(192, 168, 1, last))
    }

    #[tokio::test]
    async fn test_allows_traffic_within_quota() {
        let limiter = RateLimiter::new(RateLimitConfig {
            max_requests: 10,
            window: Duration::from_secs(60),
        });
        for _ in 0..10 {
            assert!(limiter.check(ip(1)).await.is_ok());
        }
    }

    #[tokio::test]
    async fn test_blocks_traffic_over_quota() {
        let limiter = RateLimiter::new(RateLimitConfig {
            max_requests: 3,
            window: Duration::from_secs(60),
        });
        for _ in 0..3 {
            assert!(limiter.check(ip(2)).await.is_ok());
        }
        assert!(limiter.check(ip(2)).await.is_err());
    }

    #[tokio::test]
    async fn test_quotas_are_per_ip() {
        let limiter = RateLimiter::new(RateLimitConfig {
            max_requests: 2,
            window: Duration::from_secs(60),
        });
        for _ in 0..3 {
            let _ = limiter.check(ip(3)).await;
        }
        assert!(limiter.check(ip(4)).await.is_ok());
    }

    #[tokio::test]
    async fn test_window_expiry_resets_quota() {
        let limiter = RateLimiter::new(RateLimitConfig {
            max_requests: 1,
            window: Duration::from_millis(30),
        });
        assert!(limiter.check(ip(5)).await.is_ok());
        assert!(limiter.check(ip(5)).await.is_err());

        tokio::time::sleep(Duration::from_millis(40)).await;
        assert!(limiter.check(ip(5)).await.is_ok());
    }

    #[tokio::test]
    async fn test_cleanup_drops_stale_windows() {
        let limiter = RateLimiter::new(RateLimitConfig {
            max_requests: 1,
            window: Duration::from_millis(10),
        });
        let _ = limiter.check(ip(6)).await;
        tokio::time::sleep(Duration::from_millis(30)).await;

        limiter.cleanup().await;
        assert!(limiter.windows.lock().await.is_empty());
    }
}
