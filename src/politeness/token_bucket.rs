//! Global token bucket rate limiter.

use crate::cancel::CancelToken;
use std::sync::Mutex;
use std::time::{Duration, Instant};

struct State {
    tokens: f64,
    refill_rate: f64,
    last_refill: Instant,
}

/// A token bucket with capacity = burst size and a configurable refill
/// rate (tokens/second). `wait()` blocks until a token is available;
/// `try_acquire()` never blocks.
pub struct TokenBucket {
    capacity: f64,
    state: Mutex<State>,
}

impl TokenBucket {
    pub fn new(capacity: f64, refill_rate: f64) -> Self {
        Self {
            capacity,
            state: Mutex::new(State {
                tokens: capacity,
                refill_rate,
                last_refill: Instant::now(),
            }),
        }
    }

    fn refill(state: &mut State, capacity: f64) {
        let now = Instant::now();
        let elapsed = now.saturating_duration_since(state.last_refill).as_secs_f64();
        state.tokens = (state.tokens + elapsed * state.refill_rate).min(capacity);
        state.last_refill = now;
    }

    /// Non-blocking: consumes a token and returns `true` if one was
    /// immediately available.
    pub fn try_acquire(&self) -> bool {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        Self::refill(&mut state, self.capacity);
        if state.tokens >= 1.0 {
            state.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Updates the refill rate, e.g. from a backpressure adjustment.
    pub fn set_rate(&self, new_rate: f64) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        Self::refill(&mut state, self.capacity);
        state.refill_rate = new_rate;
    }

    pub fn rate(&self) -> f64 {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).refill_rate
    }

    fn time_until_token(&self) -> Duration {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if state.refill_rate <= 0.0 {
            return Duration::from_secs(1);
        }
        let deficit = 1.0 - state.tokens;
        if deficit <= 0.0 {
            Duration::ZERO
        } else {
            Duration::from_secs_f64(deficit / state.refill_rate)
        }
    }

    /// Blocks until a token is available.
    pub async fn wait(&self) {
        loop {
            if self.try_acquire() {
                return;
            }
            tokio::time::sleep(self.time_until_token()).await;
        }
    }

    /// Like [`wait`](Self::wait), but returns `false` without consuming a
    /// token if `cancel` fires first.
    pub async fn acquire_cancellable(&self, cancel: &CancelToken) -> bool {
        loop {
            if cancel.is_cancelled() {
                return false;
            }
            if self.try_acquire() {
                return true;
            }
            tokio::select! {
                _ = tokio::time::sleep(self.time_until_token()) => {}
                _ = cancel.cancelled() => return false,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_try_acquire_consumes_burst_capacity() {
        let bucket = TokenBucket::new(3.0, 0.0);
        assert!(bucket.try_acquire());
        assert!(bucket.try_acquire());
        assert!(bucket.try_acquire());
        assert!(!bucket.try_acquire());
    }

    #[tokio::test]
    async fn test_refill_over_time() {
        let bucket = TokenBucket::new(1.0, 1000.0);
        assert!(bucket.try_acquire());
        assert!(!bucket.try_acquire());
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert!(bucket.try_acquire());
    }

    #[tokio::test]
    async fn test_wait_blocks_until_refill() {
        let bucket = TokenBucket::new(1.0, 200.0);
        assert!(bucket.try_acquire());
        let start = Instant::now();
        bucket.wait().await;
        assert!(start.elapsed() >= Duration::from_millis(3));
    }

    #[tokio::test]
    async fn test_cancellable_acquire_returns_false_on_cancel() {
        let bucket = TokenBucket::new(1.0, 0.001);
        assert!(bucket.try_acquire());
        let cancel = CancelToken::new();
        let bucket_ref = &bucket;
        let cancel_clone = cancel.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
        });
        tokio::select! {
            _ = handle => {}
        }
        cancel.cancel();
        assert!(!bucket_ref.acquire_cancellable(&cancel_clone).await);
    }

    #[test]
    fn test_set_rate_updates_refill() {
        let bucket = TokenBucket::new(5.0, 1.0);
        bucket.set_rate(10.0);
        assert_eq!(bucket.rate(), 10.0);
    }
}
