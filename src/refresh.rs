//! Auto-Refresh Scheduler
//!
//! Named repeating timers. Starting a name that is already running replaces
//! the old timer, so each name has at most one live timer.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Shortest period a timer will run at
pub const MIN_INTERVAL: Duration = Duration::from_millis(1);

struct RefreshTimer {
    interval: Duration,
    task: JoinHandle<()>,
}

/// Owns the named auto-refresh timers; all of them stop when it is dropped
#[derive(Default)]
pub struct RefreshScheduler {
    timers: Mutex<HashMap<String, RefreshTimer>>,
}

impl RefreshScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `callback` every `interval` under `name`, replacing any timer
    /// already running under that name. The first run is one interval out.
    ///
    /// A failing callback is logged and the timer keeps running. Intervals
    /// below [`MIN_INTERVAL`] are raised to it.
    pub fn start<F, Fut>(&self, name: &str, interval: Duration, callback: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let interval = if interval < MIN_INTERVAL {
            tracing::warn!(
                name = %name,
                interval_ms = interval.as_millis() as u64,
                "Auto-refresh interval too short, using minimum"
            );
            MIN_INTERVAL
        } else {
            interval
        };

        let timer_name = name.to_string();
        let first_tick = tokio::time::Instant::now() + interval;

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(first_tick, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                if let Err(e) = callback().await {
                    tracing::error!(name = %timer_name, error = %e, "Auto-refresh failed");
                }
            }
        });

        let previous = self
            .timers
            .lock()
            .insert(name.to_string(), RefreshTimer { interval, task });
        if let Some(previous) = previous {
            previous.task.abort();
        }

        tracing::info!(
            name = %name,
            interval_ms = interval.as_millis() as u64,
            "Auto-refresh started"
        );
    }

    /// Stop the timer for `name`; returns false if none was running
    pub fn stop(&self, name: &str) -> bool {
        match self.timers.lock().remove(name) {
            Some(timer) => {
                timer.task.abort();
                tracing::info!(name = %name, "Auto-refresh stopped");
                true
            }
            None => false,
        }
    }

    /// Stop every timer, returning how many were running
    pub fn stop_all(&self) -> usize {
        let timers: Vec<_> = self.timers.lock().drain().collect();
        for (name, timer) in &timers {
            timer.task.abort();
            tracing::debug!(name = %name, "Auto-refresh cleared");
        }
        timers.len()
    }

    pub fn is_running(&self, name: &str) -> bool {
        self.timers.lock().contains_key(name)
    }

    pub fn interval(&self, name: &str) -> Option<Duration> {
        self.timers.lock().get(name).map(|t| t.interval)
    }

    /// Names of running timers, sorted
    pub fn active(&self) -> Vec<String> {
        let mut names: Vec<_> = self.timers.lock().keys().cloned().collect();
        names.sort();
        names
    }
}

impl Drop for RefreshScheduler {
    fn drop(&mut self) {
        for (_, timer) in self.timers.get_mut().drain() {
            timer.task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    fn counter() -> (Arc<AtomicUsize>, impl Fn() -> futures_util::future::Ready<anyhow::Result<()>>) {
        let count = Arc::new(AtomicUsize::new(0));
        let hits = count.clone();
        let callback = move || {
            hits.fetch_add(1, Ordering::SeqCst);
            futures_util::future::ready(Ok(()))
        };
        (count, callback)
    }

    async fn tick(ms: u64) {
        tokio::time::advance(Duration::from_millis(ms)).await;
        settle().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_same_name_single_timer() {
        let scheduler = RefreshScheduler::new();
        let (first, first_cb) = counter();
        let (second, second_cb) = counter();

        scheduler.start("dashboard", Duration::from_millis(1000), first_cb);
        scheduler.start("dashboard", Duration::from_millis(1000), second_cb);
        settle().await;

        for _ in 0..3 {
            tick(1000).await;
        }

        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 3);
        assert_eq!(scheduler.active(), vec!["dashboard".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_run_after_one_interval() {
        let scheduler = RefreshScheduler::new();
        let (count, callback) = counter();

        scheduler.start("accounts", Duration::from_millis(30_000), callback);
        tick(29_999).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);

        tick(1).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(scheduler.interval("accounts"), Some(Duration::from_millis(30_000)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_interval_is_raised_to_minimum() {
        let scheduler = RefreshScheduler::new();
        let (count, callback) = counter();

        scheduler.start("dashboard", Duration::ZERO, callback);
        assert_eq!(scheduler.interval("dashboard"), Some(MIN_INTERVAL));

        for _ in 0..3 {
            tick(1).await;
        }
        assert_eq!(count.load(Ordering::SeqCst), 3);
        assert!(scheduler.is_running("dashboard"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop() {
        let scheduler = RefreshScheduler::new();
        let (count, callback) = counter();

        scheduler.start("dashboard", Duration::from_millis(1000), callback);
        tick(1000).await;
        assert!(scheduler.stop("dashboard"));
        assert!(!scheduler.stop("dashboard"));

        tick(5000).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(!scheduler.is_running("dashboard"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failing_callback_keeps_running() {
        let scheduler = RefreshScheduler::new();
        let count = Arc::new(AtomicUsize::new(0));

        let hits = count.clone();
        scheduler.start("logs", Duration::from_millis(100), move || {
            let n = hits.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    anyhow::bail!("backend unavailable");
                }
                Ok(())
            }
        });

        tick(100).await;
        tick(100).await;
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_all_and_drop() {
        let scheduler = RefreshScheduler::new();
        let (count, callback) = counter();
        let callback = Arc::new(callback);

        for name in ["a", "b", "c"] {
            let cb = callback.clone();
            scheduler.start(name, Duration::from_millis(10), move || cb());
        }
        assert_eq!(scheduler.stop_all(), 3);
        assert!(scheduler.active().is_empty());

        let cb = callback.clone();
        scheduler.start("d", Duration::from_millis(10), move || cb());
        drop(scheduler);

        tick(100).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }
}
