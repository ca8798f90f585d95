//! Politeness governor: per-host crawl delay, a global token-bucket rate
//! limit, and an adaptive backpressure controller (§4.3).

mod backpressure;
mod token_bucket;

pub use backpressure::{BackpressureConfig, BackpressureController, BackpressureThresholds, PressureLevel};
pub use token_bucket::TokenBucket;

use crate::cancel::CancelToken;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Per-host last-access tracking and the governor's combined wait.
pub struct PolitenessGovernor {
    bucket: TokenBucket,
    configured_delay: Duration,
    last_access: Mutex<HashMap<String, Instant>>,
    pub backpressure: BackpressureController,
}

impl PolitenessGovernor {
    pub fn new(burst: f64, requests_per_second: f64, configured_delay: Duration) -> Self {
        Self {
            bucket: TokenBucket::new(burst, requests_per_second),
            configured_delay,
            last_access: Mutex::new(HashMap::new()),
            backpressure: BackpressureController::new(BackpressureConfig::default()),
        }
    }

    /// The effective per-host delay: the greater of the configured delay
    /// and any robots.txt-declared crawl delay for that host.
    pub fn effective_delay(&self, robots_delay: Option<Duration>) -> Duration {
        match robots_delay {
            Some(d) => self.configured_delay.max(d),
            None => self.configured_delay,
        }
    }

    /// Blocks until both the global token bucket and the per-host delay
    /// permit a fetch to `host`, or returns `false` if cancelled first.
    /// On cancellation no token is consumed.
    pub async fn acquire(&self, host: &str, robots_delay: Option<Duration>, cancel: &CancelToken) -> bool {
        if !self.bucket.acquire_cancellable(cancel).await {
            return false;
        }

        let delay = self.effective_delay(robots_delay);
        loop {
            if cancel.is_cancelled() {
                return false;
            }
            let wait = {
                let guard = self.last_access.lock().unwrap_or_else(|e| e.into_inner());
                match guard.get(host) {
                    Some(last) => {
                        let since = last.elapsed();
                        if since < delay {
                            Some(delay - since)
                        } else {
                            None
                        }
                    }
                    None => None,
                }
            };
            match wait {
                None => break,
                Some(d) => {
                    tokio::select! {
                        _ = tokio::time::sleep(d) => {}
                        _ = cancel.cancelled() => return false,
                    }
                }
            }
        }

        let mut guard = self.last_access.lock().unwrap_or_else(|e| e.into_inner());
        guard.insert(host.to_string(), Instant::now());
        true
    }

    /// Non-blocking probe: true if a request to `host` could proceed
    /// immediately given the last recorded access.
    pub fn is_host_ready(&self, host: &str, robots_delay: Option<Duration>) -> bool {
        let delay = self.effective_delay(robots_delay);
        let guard = self.last_access.lock().unwrap_or_else(|e| e.into_inner());
        match guard.get(host) {
            Some(last) => last.elapsed() >= delay,
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_second_access_to_same_host_waits() {
        let gov = PolitenessGovernor::new(100.0, 1000.0, Duration::from_millis(50));
        let cancel = CancelToken::new();

        assert!(gov.acquire("example.com", None, &cancel).await);
        let start = Instant::now();
        assert!(gov.acquire("example.com", None, &cancel).await);
        assert!(start.elapsed() >= Duration::from_millis(45));
    }

    #[tokio::test]
    async fn test_different_hosts_do_not_block_each_other() {
        let gov = PolitenessGovernor::new(100.0, 1000.0, Duration::from_millis(200));
        let cancel = CancelToken::new();

        assert!(gov.acquire("a.com", None, &cancel).await);
        let start = Instant::now();
        assert!(gov.acquire("b.com", None, &cancel).await);
        assert!(start.elapsed() < Duration::from_millis(100));
    }

    #[tokio::test]
    async fn test_robots_delay_overrides_when_larger() {
        let gov = PolitenessGovernor::new(100.0, 1000.0, Duration::from_millis(10));
        assert_eq!(
            gov.effective_delay(Some(Duration::from_millis(500))),
            Duration::from_millis(500)
        );
        assert_eq!(
            gov.effective_delay(Some(Duration::from_millis(1))),
            Duration::from_millis(10)
        );
    }

    #[tokio::test]
    async fn test_cancellation_returns_without_consuming_token() {
        let gov = PolitenessGovernor::new(1.0, 0.001, Duration::ZERO);
        let cancel = CancelToken::new();
        cancel.cancel();
        assert!(!gov.acquire("example.com", None, &cancel).await);
    }
}
