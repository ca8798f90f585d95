//! A small cooperative pause/resume primitive (§4.8 step 1, §5(d)).
//!
//! Workers check this once per loop iteration alongside [`CancelToken`]:
//! pausing blocks every worker at its next iteration until `resume()` is
//! called or the crawl is cancelled. Built on `tokio::sync::Notify` for
//! the same reason `CancelToken` is — one signal, no polling.

use crate::cancel::CancelToken;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

#[derive(Clone)]
pub struct PauseToken {
    paused: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl PauseToken {
    pub fn new() -> Self {
        Self {
            paused: Arc::new(AtomicBool::new(false)),
            notify: Arc::new(Notify::new()),
        }
    }

    /// Signals every worker to block at its next loop iteration.
    pub fn pause(&self) {
        self.paused.store(true, Ordering::SeqCst);
    }

    /// Releases blocked workers and lets future iterations proceed.
    pub fn resume(&self) {
        self.paused.store(false, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    /// Blocks while paused; returns immediately if not paused or once
    /// `cancel` fires, whichever comes first.
    pub async fn wait_while_paused(&self, cancel: &CancelToken) {
        while self.is_paused() && !cancel.is_cancelled() {
            let notified = self.notify.notified();
            if !self.is_paused() || cancel.is_cancelled() {
                return;
            }
            tokio::select! {
                _ = notified => {},
                _ = cancel.cancelled() => return,
            }
        }
    }
}

impl Default for PauseToken {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_resume_wakes_waiter() {
        let pause = PauseToken::new();
        pause.pause();
        let waiter = pause.clone();
        let cancel = CancelToken::new();
        let cancel_clone = cancel.clone();
        let handle = tokio::spawn(async move {
            waiter.wait_while_paused(&cancel_clone).await;
        });
        tokio::time::sleep(Duration::from_millis(10)).await;
        pause.resume();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("resume should wake the waiter")
            .unwrap();
    }

    #[tokio::test]
    async fn test_cancel_wakes_paused_waiter() {
        let pause = PauseToken::new();
        pause.pause();
        let cancel = CancelToken::new();
        let waiter_pause = pause.clone();
        let waiter_cancel = cancel.clone();
        let handle = tokio::spawn(async move {
            waiter_pause.wait_while_paused(&waiter_cancel).await;
        });
        tokio::time::sleep(Duration::from_millis(10)).await;
        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("cancel should wake a paused waiter")
            .unwrap();
    }

    #[test]
    fn test_not_paused_by_default() {
        let pause = PauseToken::new();
        assert!(!pause.is_paused());
    }

    #[tokio::test]
    async fn test_not_paused_returns_immediately() {
        let pause = PauseToken::new();
        let cancel = CancelToken::new();
        tokio::time::timeout(Duration::from_millis(50), pause.wait_while_paused(&cancel))
            .await
            .expect("an unpaused token must not block");
    }
}
