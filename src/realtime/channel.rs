//! Real-Time Channel
//!
//! Maintains one logical connection to the push server, dispatches inbound
//! events to named handlers and reconnects after a fixed delay when the
//! connection drops.
//!
//! ## States
//!
//! ```text
//! Disconnected --connect()--> Connecting --open ok--> Connected
//!      ^                          |                       |
//!      +------ open failed -------+------- dropped -------+
//!
//! any --shutdown()--> Closed (terminal)
//! ```

use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Weak};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use super::events::names;
use super::transport::{Frame, Transport};
use crate::notify::NotificationCenter;

/// Connection state of the channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Disconnected,
    Connecting,
    Connected,
    Closed,
}

impl fmt::Display for ChannelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Closed => "closed",
        };
        f.write_str(s)
    }
}

/// Handler for one event name
pub type EventHandler = Arc<dyn Fn(&Value) -> anyhow::Result<()> + Send + Sync>;

/// Channel configuration
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// Fixed delay before each reconnect attempt
    pub reconnect_delay: Duration,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            reconnect_delay: Duration::from_millis(5000),
        }
    }
}

struct PendingReconnect {
    token: u64,
    task: JoinHandle<()>,
}

struct Shared {
    state: ChannelState,
    driver: Option<JoinHandle<()>>,
    reconnect: Option<PendingReconnect>,
    outbound: Option<mpsc::UnboundedSender<Frame>>,
    next_token: u64,
}

struct ChannelInner {
    transport: Arc<dyn Transport>,
    config: ChannelConfig,
    notifications: NotificationCenter,
    handlers: RwLock<HashMap<String, EventHandler>>,
    shared: Mutex<Shared>,
    state_tx: watch::Sender<ChannelState>,
}

/// Reconnecting real-time channel.
///
/// Cheap to clone; clones drive the same connection.
#[derive(Clone)]
pub struct RealtimeChannel {
    inner: Arc<ChannelInner>,
}

impl RealtimeChannel {
    pub fn new(
        transport: Arc<dyn Transport>,
        config: ChannelConfig,
        notifications: NotificationCenter,
    ) -> Self {
        let (state_tx, _) = watch::channel(ChannelState::Disconnected);

        Self {
            inner: Arc::new(ChannelInner {
                transport,
                config,
                notifications,
                handlers: RwLock::new(HashMap::new()),
                shared: Mutex::new(Shared {
                    state: ChannelState::Disconnected,
                    driver: None,
                    reconnect: None,
                    outbound: None,
                    next_token: 0,
                }),
                state_tx,
            }),
        }
    }

    /// Register the handler for `event`, replacing any previous one
    pub fn on<F>(&self, event: &str, handler: F)
    where
        F: Fn(&Value) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let replaced = self
            .inner
            .handlers
            .write()
            .insert(event.to_string(), Arc::new(handler))
            .is_some();
        if replaced {
            tracing::debug!(event = %event, "Replaced event handler");
        }
    }

    /// Remove the handler for `event`
    pub fn off(&self, event: &str) -> bool {
        self.inner.handlers.write().remove(event).is_some()
    }

    /// Start connecting. No-op unless the channel is `Disconnected`.
    ///
    /// A pending reconnect is cancelled in favour of connecting now.
    pub fn connect(&self) {
        let mut shared = self.inner.shared.lock();
        if shared.state != ChannelState::Disconnected {
            tracing::trace!(state = %shared.state, "connect() ignored");
            return;
        }
        if let Some(pending) = shared.reconnect.take() {
            pending.task.abort();
        }
        self.inner.start_locked(&mut shared);
    }

    /// Close the channel for good
    pub fn shutdown(&self) {
        let mut shared = self.inner.shared.lock();
        if shared.state == ChannelState::Closed {
            return;
        }

        if let Some(pending) = shared.reconnect.take() {
            pending.task.abort();
        }
        if let Some(driver) = shared.driver.take() {
            driver.abort();
        }
        shared.outbound = None;
        self.inner.set_state(&mut shared, ChannelState::Closed);
        tracing::info!("Real-time channel closed");
    }

    /// Send an event to the server
    pub fn emit(&self, event: &str, data: Value) -> Result<(), ChannelError> {
        let shared = self.inner.shared.lock();
        let outbound = match (&shared.state, &shared.outbound) {
            (ChannelState::Connected, Some(outbound)) => outbound,
            (ChannelState::Closed, _) => return Err(ChannelError::Closed),
            _ => return Err(ChannelError::NotConnected),
        };

        outbound
            .send(Frame::new(event, data))
            .map_err(|_| ChannelError::NotConnected)
    }

    pub fn state(&self) -> ChannelState {
        self.inner.shared.lock().state
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ChannelState::Connected
    }

    /// Receiver that observes every state change
    pub fn subscribe_state(&self) -> watch::Receiver<ChannelState> {
        self.inner.state_tx.subscribe()
    }

    pub fn has_pending_reconnect(&self) -> bool {
        self.inner.shared.lock().reconnect.is_some()
    }

    pub fn notifications(&self) -> &NotificationCenter {
        &self.inner.notifications
    }

    /// Handle that does not keep the channel alive. Handlers that talk back
    /// to their own channel must hold one of these.
    pub fn downgrade(&self) -> WeakChannel {
        WeakChannel {
            inner: Arc::downgrade(&self.inner),
        }
    }
}

/// Non-owning reference to a [`RealtimeChannel`]
#[derive(Clone)]
pub struct WeakChannel {
    inner: Weak<ChannelInner>,
}

impl WeakChannel {
    pub fn upgrade(&self) -> Option<RealtimeChannel> {
        self.inner.upgrade().map(|inner| RealtimeChannel { inner })
    }
}

impl ChannelInner {
    fn set_state(&self, shared: &mut Shared, state: ChannelState) {
        if shared.state != state {
            tracing::debug!(from = %shared.state, to = %state, "Channel state change");
            shared.state = state;
            self.state_tx.send_replace(state);
        }
    }

    fn start_locked(self: &Arc<Self>, shared: &mut Shared) {
        self.set_state(shared, ChannelState::Connecting);

        let inner = Arc::clone(self);
        shared.driver = Some(tokio::spawn(async move {
            inner.run_connection().await;
        }));
    }

    /// Replace any pending reconnect with one firing after the fixed delay
    fn schedule_reconnect_locked(self: &Arc<Self>, shared: &mut Shared) {
        if let Some(pending) = shared.reconnect.take() {
            pending.task.abort();
        }

        shared.next_token += 1;
        let token = shared.next_token;
        let delay = self.config.reconnect_delay;
        let deadline = tokio::time::Instant::now() + delay;
        let inner = Arc::clone(self);

        let task = tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            inner.fire_reconnect(token);
        });
        shared.reconnect = Some(PendingReconnect { token, task });

        tracing::info!(delay_ms = delay.as_millis() as u64, "Reconnect scheduled");
    }

    fn fire_reconnect(self: &Arc<Self>, token: u64) {
        let mut shared = self.shared.lock();
        match &shared.reconnect {
            Some(pending) if pending.token == token => {
                shared.reconnect = None;
            }
            _ => return,
        }

        if shared.state == ChannelState::Disconnected {
            tracing::info!("Attempting reconnect");
            self.start_locked(&mut shared);
        }
    }

    /// Whether the connection has been torn down under us
    fn lost_to_shutdown(&self, shared: &Shared) -> bool {
        shared.state == ChannelState::Closed
    }

    async fn run_connection(self: Arc<Self>) {
        let connection = match self.transport.open().await {
            Ok(connection) => connection,
            Err(e) => {
                {
                    let mut shared = self.shared.lock();
                    if self.lost_to_shutdown(&shared) {
                        return;
                    }
                    shared.driver = None;
                    self.set_state(&mut shared, ChannelState::Disconnected);
                    self.schedule_reconnect_locked(&mut shared);
                }
                tracing::error!(error = %e, "Real-time connection failed");
                self.notifications.error(format!("Could not connect to server: {}", e));
                return;
            }
        };

        {
            let mut shared = self.shared.lock();
            if self.lost_to_shutdown(&shared) {
                return;
            }
            shared.outbound = Some(connection.outbound);
            self.set_state(&mut shared, ChannelState::Connected);
        }
        tracing::info!("Real-time channel connected");
        self.notifications.success("Connected to server");
        self.dispatch(names::CONNECT, &Value::Null);

        let mut inbound = connection.inbound;
        while let Some(frame) = inbound.recv().await {
            // Frames already buffered when shutdown lands are dropped
            if self.lost_to_shutdown(&self.shared.lock()) {
                return;
            }
            self.dispatch(&frame.event, &frame.data);
        }

        {
            let mut shared = self.shared.lock();
            if self.lost_to_shutdown(&shared) {
                return;
            }
            shared.outbound = None;
            shared.driver = None;
            self.set_state(&mut shared, ChannelState::Disconnected);
            self.schedule_reconnect_locked(&mut shared);
        }
        tracing::warn!("Real-time channel disconnected");
        self.notifications.warning("Disconnected from server");
        self.dispatch(names::DISCONNECT, &Value::Null);
    }

    /// Deliver one event to its handler, containing any failure
    fn dispatch(&self, event: &str, data: &Value) {
        let handler = self.handlers.read().get(event).cloned();
        let Some(handler) = handler else {
            tracing::trace!(event = %event, "No handler registered");
            return;
        };

        if let Err(e) = invoke(&handler, data) {
            tracing::error!(event = %event, error = %e, "Event handler failed");
        }
    }
}

fn invoke(handler: &EventHandler, data: &Value) -> Result<(), HandlerError> {
    match catch_unwind(AssertUnwindSafe(|| handler(data))) {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(HandlerError::Failed(e)),
        Err(panic) => {
            let message = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            Err(HandlerError::Panicked(message))
        }
    }
}

/// Errors from channel operations
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("Channel is not connected")]
    NotConnected,

    #[error("Channel is closed")]
    Closed,
}

/// A handler failure, contained to the event that caused it
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("handler returned an error: {0}")]
    Failed(anyhow::Error),

    #[error("handler panicked: {0}")]
    Panicked(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::realtime::transport::{LoopbackPeer, LoopbackTransport};
    use serde_json::json;
    use tokio::sync::mpsc::UnboundedReceiver;

    const DELAY: Duration = Duration::from_millis(5000);

    fn channel() -> (RealtimeChannel, Arc<LoopbackTransport>, UnboundedReceiver<LoopbackPeer>) {
        let (transport, peers) = LoopbackTransport::new();
        let transport = Arc::new(transport);
        let channel = RealtimeChannel::new(
            transport.clone(),
            ChannelConfig {
                reconnect_delay: DELAY,
            },
            NotificationCenter::with_tracing(Duration::ZERO),
        );
        (channel, transport, peers)
    }

    async fn settle() {
        for _ in 0..20 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_twice_single_attempt() {
        let (channel, transport, mut peers) = channel();

        channel.connect();
        assert_eq!(channel.state(), ChannelState::Connecting);
        channel.connect();
        settle().await;

        assert_eq!(transport.attempts(), 1);
        assert_eq!(channel.state(), ChannelState::Connected);
        let _peer = peers.recv().await.unwrap();

        channel.connect();
        settle().await;
        assert_eq!(transport.attempts(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconnect_after_exact_delay() {
        let (channel, transport, mut peers) = channel();

        channel.connect();
        settle().await;
        peers.recv().await.unwrap().disconnect();
        settle().await;

        assert_eq!(channel.state(), ChannelState::Disconnected);
        assert!(channel.has_pending_reconnect());

        tokio::time::advance(DELAY - Duration::from_millis(1)).await;
        settle().await;
        assert_eq!(transport.attempts(), 1);

        tokio::time::advance(Duration::from_millis(1)).await;
        settle().await;
        assert_eq!(transport.attempts(), 2);
        assert_eq!(channel.state(), ChannelState::Connected);
        assert!(!channel.has_pending_reconnect());
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeated_drops_single_pending_reconnect() {
        let (channel, transport, mut peers) = channel();

        channel.connect();
        settle().await;

        for round in 1..=3 {
            peers.recv().await.unwrap().disconnect();
            settle().await;
            assert!(channel.has_pending_reconnect());

            tokio::time::advance(DELAY).await;
            settle().await;
            assert_eq!(transport.attempts(), round + 1);
            assert!(!channel.has_pending_reconnect());
        }

        // Failed opens also schedule exactly one retry each
        transport.fail_next(2);
        peers.recv().await.unwrap().disconnect();
        settle().await;
        for _ in 0..3 {
            tokio::time::advance(DELAY).await;
            settle().await;
        }
        assert_eq!(transport.attempts(), 4 + 3);
        assert_eq!(channel.state(), ChannelState::Connected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_cancels_pending_reconnect() {
        let (channel, transport, mut peers) = channel();

        channel.connect();
        settle().await;
        peers.recv().await.unwrap().disconnect();
        settle().await;
        assert!(channel.has_pending_reconnect());

        channel.connect();
        settle().await;
        assert!(!channel.has_pending_reconnect());
        assert_eq!(transport.attempts(), 2);

        tokio::time::advance(DELAY * 2).await;
        settle().await;
        assert_eq!(transport.attempts(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_failure_is_contained() {
        let (channel, transport, _peers) = channel();
        transport.fail_next(1);

        channel.connect();
        settle().await;

        assert_eq!(channel.state(), ChannelState::Disconnected);
        assert!(channel.has_pending_reconnect());
        let records = channel.notifications().records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].severity, crate::notify::Severity::Error);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dispatch_in_order() {
        let (channel, _transport, mut peers) = channel();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let sink = seen.clone();
        channel.on("status_update", move |data| {
            sink.lock().push(data.clone());
            Ok(())
        });

        channel.connect();
        settle().await;
        let peer = peers.recv().await.unwrap();
        peer.send("status_update", json!({"cpu": 10})).await.unwrap();
        peer.send("status_update", json!({"cpu": 20})).await.unwrap();
        settle().await;

        assert_eq!(*seen.lock(), vec![json!({"cpu": 10}), json!({"cpu": 20})]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_last_registration_wins() {
        let (channel, _transport, mut peers) = channel();
        let hits = Arc::new(Mutex::new(Vec::new()));

        let first = hits.clone();
        channel.on("ping", move |_| {
            first.lock().push("first");
            Ok(())
        });
        let second = hits.clone();
        channel.on("ping", move |_| {
            second.lock().push("second");
            Ok(())
        });

        channel.connect();
        settle().await;
        peers.recv().await.unwrap().send("ping", Value::Null).await.unwrap();
        settle().await;

        assert_eq!(*hits.lock(), vec!["second"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failing_handlers_are_isolated() {
        let (channel, _transport, mut peers) = channel();
        let seen = Arc::new(Mutex::new(Vec::new()));

        channel.on("bad", |_| anyhow::bail!("boom"));
        channel.on("worse", |_| panic!("handler panic"));
        let sink = seen.clone();
        channel.on("good", move |data| {
            sink.lock().push(data.clone());
            Ok(())
        });

        channel.connect();
        settle().await;
        let peer = peers.recv().await.unwrap();
        peer.send("bad", Value::Null).await.unwrap();
        peer.send("worse", Value::Null).await.unwrap();
        peer.send("good", json!(1)).await.unwrap();
        settle().await;

        assert_eq!(*seen.lock(), vec![json!(1)]);
        assert_eq!(channel.state(), ChannelState::Connected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_and_disconnect_events() {
        let (channel, _transport, mut peers) = channel();
        let seen = Arc::new(Mutex::new(Vec::new()));

        for name in [names::CONNECT, names::DISCONNECT] {
            let sink = seen.clone();
            channel.on(name, move |_| {
                sink.lock().push(name);
                Ok(())
            });
        }

        channel.connect();
        settle().await;
        peers.recv().await.unwrap().disconnect();
        settle().await;

        assert_eq!(*seen.lock(), vec!["connect", "disconnect"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_emit() {
        let (channel, _transport, mut peers) = channel();

        assert!(matches!(
            channel.emit("request_status", Value::Null),
            Err(ChannelError::NotConnected)
        ));

        channel.connect();
        settle().await;
        let mut peer = peers.recv().await.unwrap();

        channel.emit("request_status", Value::Null).unwrap();
        assert_eq!(peer.try_recv().unwrap().event, "request_status");
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_is_terminal() {
        let (channel, transport, mut peers) = channel();
        let mut states = channel.subscribe_state();

        channel.connect();
        settle().await;
        let peer = peers.recv().await.unwrap();

        channel.shutdown();
        assert_eq!(channel.state(), ChannelState::Closed);
        assert_eq!(*states.borrow_and_update(), ChannelState::Closed);

        peer.disconnect();
        channel.connect();
        tokio::time::advance(DELAY * 3).await;
        settle().await;

        assert_eq!(transport.attempts(), 1);
        assert_eq!(channel.state(), ChannelState::Closed);
        assert!(!channel.has_pending_reconnect());
        assert!(matches!(
            channel.emit("x", Value::Null),
            Err(ChannelError::Closed)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_cancels_pending_reconnect() {
        let (channel, transport, mut peers) = channel();

        channel.connect();
        settle().await;
        peers.recv().await.unwrap().disconnect();
        settle().await;
        assert!(channel.has_pending_reconnect());

        channel.shutdown();
        tokio::time::advance(DELAY * 2).await;
        settle().await;

        assert_eq!(transport.attempts(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_handler_talks_back() {
        let (channel, _transport, mut peers) = channel();

        let weak = channel.downgrade();
        channel.on("connect", move |_| {
            if let Some(channel) = weak.upgrade() {
                channel.emit("request_status", Value::Null)?;
            }
            Ok(())
        });

        channel.connect();
        settle().await;
        let mut peer = peers.recv().await.unwrap();
        assert_eq!(peer.try_recv().unwrap().event, "request_status");
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_from_handler_drops_queued_frames() {
        let (channel, _transport, mut peers) = channel();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let weak = channel.downgrade();
        let sink = seen.clone();
        channel.on("tick", move |data| {
            sink.lock().push(data.clone());
            if let Some(channel) = weak.upgrade() {
                channel.shutdown();
            }
            Ok(())
        });

        channel.connect();
        settle().await;
        let peer = peers.recv().await.unwrap();
        for n in 1..=5 {
            peer.send("tick", json!(n)).await.unwrap();
        }
        settle().await;

        assert_eq!(channel.state(), ChannelState::Closed);
        assert_eq!(*seen.lock(), vec![json!(1)]);
    }
}
