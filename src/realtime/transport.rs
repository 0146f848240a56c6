//! Channel Transports
//!
//! A transport opens one connection at a time. A connection is a pair of
//! frame queues; the connection is over when the inbound queue closes.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use thiserror::Error;
use tokio::sync::mpsc;

/// Capacity of the inbound frame queue per connection
pub const INBOUND_CAPACITY: usize = 256;

/// A named event with a JSON payload, in either direction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub event: String,
    #[serde(default)]
    pub data: Value,
}

impl Frame {
    pub fn new(event: impl Into<String>, data: Value) -> Self {
        Self {
            event: event.into(),
            data,
        }
    }
}

/// An established connection
pub struct Connection {
    /// Frames from the server, in arrival order. Closes on disconnect.
    pub inbound: mpsc::Receiver<Frame>,
    /// Frames to the server
    pub outbound: mpsc::UnboundedSender<Frame>,
}

/// Opens connections to the push server
#[async_trait]
pub trait Transport: Send + Sync {
    async fn open(&self) -> Result<Connection, TransportError>;
}

/// Errors raised while opening or using a connection
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("Connection failed: {0}")]
    Connect(String),

    #[error("Connection attempt timed out after {}ms", .0.as_millis())]
    Timeout(std::time::Duration),

    #[error("Connection closed")]
    Closed,
}

// ============================================
// Loopback transport
// ============================================

/// Server side of a loopback connection
pub struct LoopbackPeer {
    to_client: mpsc::Sender<Frame>,
    from_client: mpsc::UnboundedReceiver<Frame>,
}

impl LoopbackPeer {
    /// Deliver an event to the client
    pub async fn send(&self, event: &str, data: Value) -> Result<(), TransportError> {
        self.to_client
            .send(Frame::new(event, data))
            .await
            .map_err(|_| TransportError::Closed)
    }

    /// Next frame emitted by the client, if the client side is still open
    pub async fn recv(&mut self) -> Option<Frame> {
        self.from_client.recv().await
    }

    pub fn try_recv(&mut self) -> Option<Frame> {
        self.from_client.try_recv().ok()
    }

    /// Drop the connection, as a server-side disconnect would
    pub fn disconnect(self) {}
}

/// In-memory transport.
///
/// Every successful `open` hands the server side of the new connection to
/// the receiver returned by [`LoopbackTransport::new`].
pub struct LoopbackTransport {
    attempts: AtomicUsize,
    failures: Mutex<usize>,
    peers: mpsc::UnboundedSender<LoopbackPeer>,
}

impl LoopbackTransport {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<LoopbackPeer>) {
        let (peers, accepted) = mpsc::unbounded_channel();
        let transport = Self {
            attempts: AtomicUsize::new(0),
            failures: Mutex::new(0),
            peers,
        };
        (transport, accepted)
    }

    /// Number of `open` calls so far
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Make the next `count` opens fail
    pub fn fail_next(&self, count: usize) {
        *self.failures.lock() = count;
    }
}

#[async_trait]
impl Transport for LoopbackTransport {
    async fn open(&self) -> Result<Connection, TransportError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);

        {
            let mut failures = self.failures.lock();
            if *failures > 0 {
                *failures -= 1;
                return Err(TransportError::Connect("loopback refused".to_string()));
            }
        }

        let (to_client, inbound) = mpsc::channel(INBOUND_CAPACITY);
        let (outbound, from_client) = mpsc::unbounded_channel();

        self.peers
            .send(LoopbackPeer {
                to_client,
                from_client,
            })
            .map_err(|_| TransportError::Connect("no loopback listener".to_string()))?;

        Ok(Connection { inbound, outbound })
    }
}
