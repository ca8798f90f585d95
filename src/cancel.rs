//! A small cooperative cancellation primitive.
//!
//! The politeness governor, frontier waits, and scheduler worker loops all
//! need to stop promptly on crawl-wide cancellation without polling. This
//! is a minimal broadcast-style cancel flag built on `tokio::sync::Notify`
//! rather than pulling in a cancellation-token crate for one signal.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

#[derive(Clone)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self {
            flag: Arc::new(AtomicBool::new(false)),
            notify: Arc::new(Notify::new()),
        }
    }

    /// Signals cancellation to every waiter, current and future.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Resolves once `cancel()` has been called. Safe to call before or
    /// after cancellation; never misses a signal sent concurrently with
    /// the first poll.
    pub async fn cancelled(&self) {
        loop {
            if self.is_cancelled() {
                return;
            }
            let notified = self.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}
