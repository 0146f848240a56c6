//! Rate limiting for bursty callers (search boxes, resize handlers, refresh
//! buttons).

use parking_lot::Mutex;
use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Runs only the last call made within `wait` of each other
pub struct Debouncer {
    wait: Duration,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl Debouncer {
    pub fn new(wait: Duration) -> Self {
        Self {
            wait,
            pending: Mutex::new(None),
        }
    }

    /// Schedule `f` to run after `wait`, cancelling any call still waiting
    pub fn call<F, Fut>(&self, f: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let deadline = Instant::now() + self.wait;
        let mut pending = self.pending.lock();
        if let Some(previous) = pending.take() {
            previous.abort();
        }
        *pending = Some(tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            f().await;
        }));
    }

    /// Drop the waiting call, if any
    pub fn cancel(&self) -> bool {
        match self.pending.lock().take() {
            Some(handle) => {
                let waiting = !handle.is_finished();
                handle.abort();
                waiting
            }
            None => false,
        }
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        if let Some(handle) = self.pending.get_mut().take() {
            handle.abort();
        }
    }
}

/// Lets the first call through, then drops calls for `limit`
pub struct Throttle {
    limit: Duration,
    last: Mutex<Option<Instant>>,
}

impl Throttle {
    pub fn new(limit: Duration) -> Self {
        Self {
            limit,
            last: Mutex::new(None),
        }
    }

    /// Run `f` unless a call went through less than `limit` ago.
    /// Returns whether `f` ran.
    pub fn call<F: FnOnce()>(&self, f: F) -> bool {
        if !self.try_acquire() {
            return false;
        }
        f();
        true
    }

    /// Claim the window without running anything
    pub fn try_acquire(&self) -> bool {
        let now = Instant::now();
        let mut last = self.last.lock();
        match *last {
            Some(at) if now.duration_since(at) < self.limit => false,
            _ => {
                *last = Some(now);
                true
            }
        }
    }
}
