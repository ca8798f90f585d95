//! Adaptive backpressure controller.
//!
//! Tracks pending requests, a rolling error rate, and a rolling rate of
//! slow-response exceedances; on each adjustment tick it may scale the
//! effective target rate down (pressure) or up (headroom), and derives a
//! discrete pressure level used to scale the worker pool.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

const SAMPLE_WINDOW: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PressureLevel {
    None,
    Low,
    Medium,
    High,
    Critical,
}

impl PressureLevel {
    /// Monotonic worker-count multiplier: {max, 0.75·max, 0.5·max, 0.25·max, min}.
    pub fn worker_count(self, max_workers: usize, min_workers: usize) -> usize {
        let scaled = match self {
            PressureLevel::None => max_workers,
            PressureLevel::Low => (max_workers as f64 * 0.75).round() as usize,
            PressureLevel::Medium => (max_workers as f64 * 0.5).round() as usize,
            PressureLevel::High => (max_workers as f64 * 0.25).round() as usize,
            PressureLevel::Critical => min_workers,
        };
        scaled.max(min_workers).min(max_workers.max(min_workers))
    }
}

#[derive(Debug, Clone)]
pub struct BackpressureThresholds {
    /// Fraction of recent results that were errors before pressure kicks in.
    pub error_rate: f64,
    /// Number of concurrently pending requests before pressure kicks in.
    pub pending_requests: usize,
    /// Response time (ms) above which a result counts as "slow".
    pub slow_response_ms: u64,
    /// Fraction of recent results that were slow before pressure kicks in.
    pub slow_response_rate: f64,
}

impl Default for BackpressureThresholds {
    fn default() -> Self {
        Self {
            error_rate: 0.1,
            pending_requests: 50,
            slow_response_ms: 2000,
            slow_response_rate: 0.2,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BackpressureConfig {
    pub decrease_factor: f64,
    pub increase_factor: f64,
    pub min_rate: f64,
    pub max_rate: f64,
    pub cooldown: Duration,
    pub thresholds: BackpressureThresholds,
    pub max_workers: usize,
    pub min_workers: usize,
}

impl Default for BackpressureConfig {
    fn default() -> Self {
        Self {
            decrease_factor: 0.7,
            increase_factor: 1.1,
            min_rate: 0.5,
            max_rate: 50.0,
            cooldown: Duration::from_secs(5),
            thresholds: BackpressureThresholds::default(),
            max_workers: 16,
            min_workers: 1,
        }
    }
}

struct Samples {
    errors: VecDeque<bool>,
    slow: VecDeque<bool>,
    last_adjustment: Instant,
    current_rate: f64,
}

pub struct BackpressureController {
    config: BackpressureConfig,
    pending: AtomicI64,
    samples: Mutex<Samples>,
}

impl BackpressureController {
    pub fn new(config: BackpressureConfig) -> Self {
        let initial_rate = config.max_rate;
        Self {
            config,
            pending: AtomicI64::new(0),
            samples: Mutex::new(Samples {
                errors: VecDeque::with_capacity(SAMPLE_WINDOW),
                slow: VecDeque::with_capacity(SAMPLE_WINDOW),
                last_adjustment: Instant::now(),
                current_rate: initial_rate,
            }),
        }
    }

    pub fn request_started(&self) {
        self.pending.fetch_add(1, Ordering::SeqCst);
    }

    pub fn request_finished(&self, was_error: bool, response_time: Duration) {
        self.pending.fetch_sub(1, Ordering::SeqCst);
        let mut s = self.samples.lock().unwrap_or_else(|e| e.into_inner());
        push_bounded(&mut s.errors, was_error);
        push_bounded(&mut s.slow, response_time.as_millis() as u64 > self.config.thresholds.slow_response_ms);
    }

    fn pending_count(&self) -> usize {
        self.pending.load(Ordering::SeqCst).max(0) as usize
    }

    fn error_rate(&self, s: &Samples) -> f64 {
        fraction(&s.errors)
    }

    fn slow_rate(&self, s: &Samples) -> f64 {
        fraction(&s.slow)
    }

    /// Computes the current discrete pressure level from the three
    /// signals: how many thresholds are currently exceeded.
    pub fn pressure_level(&self) -> PressureLevel {
        let s = self.samples.lock().unwrap_or_else(|e| e.into_inner());
        let t = &self.config.thresholds;
        let pending = self.pending_count();

        let error_exceeded = self.error_rate(&s) > t.error_rate;
        let pending_exceeded = pending > t.pending_requests;
        let slow_exceeded = self.slow_rate(&s) > t.slow_response_rate;

        let pending_critical = pending > t.pending_requests * 2;
        let error_critical = self.error_rate(&s) > (t.error_rate * 2.0).min(1.0);

        if pending_critical || error_critical {
            return PressureLevel::Critical;
        }

        let exceeded_count = [error_exceeded, pending_exceeded, slow_exceeded]
            .iter()
            .filter(|&&x| x)
            .count();

        match exceeded_count {
            0 => PressureLevel::None,
            1 => PressureLevel::Low,
            2 => PressureLevel::Medium,
            _ => PressureLevel::High,
        }
    }

    /// True if all three signals sit well below half their threshold —
    /// the condition for scaling the rate back up.
    fn has_headroom(&self, s: &Samples) -> bool {
        let t = &self.config.thresholds;
        let pending = self.pending_count();
        self.error_rate(s) < t.error_rate / 2.0
            && (pending as f64) < (t.pending_requests as f64) / 2.0
            && self.slow_rate(s) < t.slow_response_rate / 2.0
    }

    /// Recomputes the effective rate if the cooldown has elapsed, scaling
    /// by the decrease or increase factor. Returns the new rate if it
    /// changed.
    pub fn maybe_adjust_rate(&self) -> Option<f64> {
        let mut s = self.samples.lock().unwrap_or_else(|e| e.into_inner());
        if s.last_adjustment.elapsed() < self.config.cooldown {
            return None;
        }

        let level = {
            drop(s);
            let level = self.pressure_level();
            s = self.samples.lock().unwrap_or_else(|e| e.into_inner());
            level
        };

        let new_rate = if level != PressureLevel::None {
            s.current_rate * self.config.decrease_factor
        } else if self.has_headroom(&s) {
            s.current_rate * self.config.increase_factor
        } else {
            return None;
        };

        let clamped = new_rate.clamp(self.config.min_rate, self.config.max_rate);
        if (clamped - s.current_rate).abs() < f64::EPSILON {
            s.last_adjustment = Instant::now();
            return None;
        }
        s.current_rate = clamped;
        s.last_adjustment = Instant::now();
        Some(clamped)
    }

    pub fn current_rate(&self) -> f64 {
        self.samples.lock().unwrap_or_else(|e| e.into_inner()).current_rate
    }

    pub fn worker_count(&self) -> usize {
        self.pressure_level()
            .worker_count(self.config.max_workers, self.config.min_workers)
    }
}

fn push_bounded(deque: &mut VecDeque<bool>, value: bool) {
    if deque.len() >= SAMPLE_WINDOW {
        deque.pop_front();
    }
    deque.push_back(value);
}

fn fraction(deque: &VecDeque<bool>) -> f64 {
    if deque.is_empty() {
        return 0.0;
    }
    deque.iter().filter(|&&x| x).count() as f64 / deque.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller() -> BackpressureController {
        BackpressureController::new(BackpressureConfig {
            cooldown: Duration::ZERO,
            ..Default::default()
        })
    }

    #[test]
    fn test_no_pressure_when_idle() {
        let c = controller();
        assert_eq!(c.pressure_level(), PressureLevel::None);
    }

    #[test]
    fn test_high_error_rate_raises_pressure() {
        let c = controller();
        for _ in 0..20 {
            c.request_finished(true, Duration::from_millis(10));
        }
        assert_ne!(c.pressure_level(), PressureLevel::None);
    }

    #[test]
    fn test_extreme_error_rate_is_critical() {
        let c = controller();
        for _ in 0..20 {
            c.request_finished(true, Duration::from_millis(10));
        }
        assert_eq!(c.pressure_level(), PressureLevel::Critical);
    }

    #[test]
    fn test_pending_requests_raise_pressure() {
        let c = controller();
        for _ in 0..(c.config.thresholds.pending_requests + 1) {
            c.request_started();
        }
        assert_ne!(c.pressure_level(), PressureLevel::None);
    }

    #[test]
    fn test_rate_decreases_under_pressure() {
        let c = controller();
        let before = c.current_rate();
        for _ in 0..20 {
            c.request_finished(true, Duration::from_millis(10));
        }
        let after = c.maybe_adjust_rate().expect("rate should change");
        assert!(after < before);
        assert!(after >= c.config.min_rate);
    }

    #[test]
    fn test_rate_increases_with_headroom() {
        let config = BackpressureConfig {
            cooldown: Duration::ZERO,
            max_rate: 100.0,
            ..Default::default()
        };
        let c = BackpressureController::new(config);
        for _ in 0..20 {
            c.request_finished(true, Duration::from_millis(10));
        }
        c.maybe_adjust_rate();
        for _ in 0..60 {
            c.request_finished(false, Duration::from_millis(1));
        }
        let rate_before = c.current_rate();
        let adjusted = c.maybe_adjust_rate();
        assert!(adjusted.is_some());
        assert!(adjusted.unwrap() > rate_before);
    }

    #[test]
    fn test_rate_clamped_to_max() {
        let config = BackpressureConfig {
            cooldown: Duration::ZERO,
            max_rate: 10.0,
            ..Default::default()
        };
        let c = BackpressureController::new(config);
        for _ in 0..5 {
            c.maybe_adjust_rate();
        }
        assert!(c.current_rate() <= 10.0);
    }

    #[test]
    fn test_worker_count_mapping_is_monotonic() {
        assert_eq!(PressureLevel::None.worker_count(16, 1), 16);
        assert_eq!(PressureLevel::Low.worker_count(16, 1), 12);
        assert_eq!(PressureLevel::Medium.worker_count(16, 1), 8);
        assert_eq!(PressureLevel::High.worker_count(16, 1), 4);
        assert_eq!(PressureLevel::Critical.worker_count(16, 1), 1);
    }

    #[test]
    fn test_cooldown_suppresses_rapid_adjustment() {
        let config = BackpressureConfig {
            cooldown: Duration::from_secs(60),
            ..Default::default()
        };
        let c = BackpressureController::new(config);
        for _ in 0..20 {
            c.request_finished(true, Duration::from_millis(10));
        }
        assert!(c.maybe_adjust_rate().is_some());
        // Immediately after, still inside cooldown: no further change.
        assert!(c.maybe_adjust_rate().is_none());
    }
}
