//! Notification Center
//!
//! Owns the ordered list of live notifications and their expiry timers.

use chrono::Utc;
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;

use super::record::{NotificationId, NotificationRecord, Severity};

/// Renders notifications somewhere the user can see them
pub trait NotificationSink: Send + Sync {
    /// A notification was added
    fn show(&self, record: &NotificationRecord);

    /// A notification was removed (expired or dismissed)
    fn hide(&self, id: NotificationId);
}

/// Sink that writes notifications to the log
#[derive(Debug, Default)]
pub struct TracingSink;

impl NotificationSink for TracingSink {
    fn show(&self, record: &NotificationRecord) {
        match record.severity {
            Severity::Error => tracing::error!(id = %record.id, "{}", record.message),
            Severity::Warning => tracing::warn!(id = %record.id, "{}", record.message),
            Severity::Success | Severity::Info => {
                tracing::info!(id = %record.id, severity = %record.severity, "{}", record.message)
            }
        }
    }

    fn hide(&self, id: NotificationId) {
        tracing::trace!(id = %id, "Notification removed");
    }
}

struct Entry {
    record: NotificationRecord,
    expiry: Option<JoinHandle<()>>,
}

#[derive(Default)]
struct CenterState {
    entries: Vec<Entry>,
    last_id: u64,
}

impl CenterState {
    fn next_id(&mut self) -> NotificationId {
        let now = Utc::now().timestamp_millis().max(0) as u64;
        self.last_id = now.max(self.last_id + 1);
        NotificationId(self.last_id)
    }

    fn take(&mut self, id: NotificationId) -> Option<Entry> {
        let pos = self.entries.iter().position(|e| e.record.id == id)?;
        Some(self.entries.remove(pos))
    }
}

/// Fan-out point for user-visible notifications.
///
/// Cheap to clone; all clones share the same notification list.
#[derive(Clone)]
pub struct NotificationCenter {
    state: Arc<Mutex<CenterState>>,
    sink: Arc<dyn NotificationSink>,
    default_timeout: Duration,
}

impl NotificationCenter {
    /// Create a center rendering through `sink`
    pub fn new(sink: Arc<dyn NotificationSink>, default_timeout: Duration) -> Self {
        Self {
            state: Arc::new(Mutex::new(CenterState::default())),
            sink,
            default_timeout,
        }
    }

    /// Create a center that only logs
    pub fn with_tracing(default_timeout: Duration) -> Self {
        Self::new(Arc::new(TracingSink), default_timeout)
    }

    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    /// Add a notification, removing it after `timeout`.
    ///
    /// A zero timeout keeps the notification until it is dismissed. Outside
    /// a tokio runtime there is nothing to run the expiry timer, so the
    /// notification also stays until dismissed.
    pub fn notify(
        &self,
        message: impl Into<String>,
        severity: Severity,
        timeout: Duration,
    ) -> NotificationId {
        let record = {
            let mut state = self.state.lock();
            let record = NotificationRecord {
                id: state.next_id(),
                severity,
                message: message.into(),
                created_at: Utc::now(),
            };

            let expiry = if timeout.is_zero() {
                None
            } else {
                self.spawn_expiry(record.id, timeout)
            };
            state.entries.push(Entry {
                record: record.clone(),
                expiry,
            });
            record
        };

        self.sink.show(&record);
        record.id
    }

    pub fn success(&self, message: impl Into<String>) -> NotificationId {
        self.notify(message, Severity::Success, self.default_timeout)
    }

    pub fn error(&self, message: impl Into<String>) -> NotificationId {
        self.notify(message, Severity::Error, self.default_timeout)
    }

    pub fn warning(&self, message: impl Into<String>) -> NotificationId {
        self.notify(message, Severity::Warning, self.default_timeout)
    }

    pub fn info(&self, message: impl Into<String>) -> NotificationId {
        self.notify(message, Severity::Info, self.default_timeout)
    }

    /// Remove a notification and cancel its expiry timer.
    ///
    /// Returns false if the notification was already gone.
    pub fn dismiss(&self, id: NotificationId) -> bool {
        let entry = self.state.lock().take(id);
        match entry {
            Some(entry) => {
                if let Some(expiry) = entry.expiry {
                    expiry.abort();
                }
                self.sink.hide(id);
                true
            }
            None => false,
        }
    }

    /// Remove every notification
    pub fn clear(&self) {
        let entries = std::mem::take(&mut self.state.lock().entries);
        for entry in entries {
            if let Some(expiry) = entry.expiry {
                expiry.abort();
            }
            self.sink.hide(entry.record.id);
        }
    }

    /// Snapshot of live notifications in display order
    pub fn records(&self) -> Vec<NotificationRecord> {
        self.state
            .lock()
            .entries
            .iter()
            .map(|e| e.record.clone())
            .collect()
    }

    pub fn get(&self, id: NotificationId) -> Option<NotificationRecord> {
        self.state
            .lock()
            .entries
            .iter()
            .find(|e| e.record.id == id)
            .map(|e| e.record.clone())
    }

    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn spawn_expiry(&self, id: NotificationId, timeout: Duration) -> Option<JoinHandle<()>> {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!(id = %id, "No runtime for notification expiry, keeping until dismissed");
            return None;
        };

        let state = Arc::downgrade(&self.state);
        let sink = Arc::clone(&self.sink);
        let deadline = tokio::time::Instant::now() + timeout;

        Some(runtime.spawn(async move {
            tokio::time::sleep_until(deadline).await;
            expire(&state, sink.as_ref(), id);
        }))
    }
}

/// Expiry path: remove without aborting, the timer is the caller
fn expire(state: &Weak<Mutex<CenterState>>, sink: &dyn NotificationSink, id: NotificationId) {
    let Some(state) = state.upgrade() else {
        return;
    };
    let removed = state.lock().take(id).is_some();
    if removed {
        sink.hide(id);
    }
}
