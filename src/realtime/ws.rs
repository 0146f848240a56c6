//! WebSocket Transport
//!
//! JSON text frames of the form `{"event": "...", "data": ...}` over a
//! WebSocket connection.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};

use super::transport::{Connection, Frame, Transport, TransportError, INBOUND_CAPACITY};

/// Transport connecting to a `ws://` or `wss://` endpoint
#[derive(Debug, Clone)]
pub struct WsTransport {
    url: String,
    connect_timeout: Duration,
}

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

impl WsTransport {
    pub fn new(url: impl Into<String>) -> Result<Self, TransportError> {
        let url = url.into();
        if !(url.starts_with("ws://") || url.starts_with("wss://")) {
            return Err(TransportError::InvalidEndpoint(url));
        }
        Ok(Self {
            url,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        })
    }

    /// Bound how long `open` waits for the handshake to finish
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Derive the WebSocket endpoint from an HTTP base URL
    pub fn from_http_base(base: &str, path: &str) -> Result<Self, TransportError> {
        let base = base.trim_end_matches('/');
        let ws = base
            .replacen("https://", "wss://", 1)
            .replacen("http://", "ws://", 1);
        Self::new(format!("{}{}", ws, path))
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }
}

#[async_trait]
impl Transport for WsTransport {
    async fn open(&self) -> Result<Connection, TransportError> {
        let (stream, _response) =
            tokio::time::timeout(self.connect_timeout, connect_async(self.url.as_str()))
                .await
                .map_err(|_| TransportError::Timeout(self.connect_timeout))?
                .map_err(|e| TransportError::Connect(e.to_string()))?;

        let (mut sink, mut source) = stream.split();
        let (inbound_tx, inbound) = mpsc::channel::<Frame>(INBOUND_CAPACITY);
        let (outbound, mut outbound_rx) = mpsc::unbounded_channel::<Frame>();

        // Task to forward outbound frames to the socket
        tokio::spawn(async move {
            while let Some(frame) = outbound_rx.recv().await {
                match serde_json::to_string(&frame) {
                    Ok(text) => {
                        if sink.send(Message::Text(text)).await.is_err() {
                            tracing::debug!("WebSocket send failed, closing writer");
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to serialize frame");
                    }
                }
            }
            let _ = sink.close().await;
        });

        // Task to read frames from the socket
        let url = self.url.clone();
        tokio::spawn(async move {
            while let Some(result) = source.next().await {
                match result {
                    Ok(Message::Text(text)) => match serde_json::from_str::<Frame>(&text) {
                        Ok(frame) => {
                            if inbound_tx.send(frame).await.is_err() {
                                break;
                            }
                        }
                        Err(e) => {
                            tracing::warn!(error = %e, "Ignoring malformed frame");
                        }
                    },
                    Ok(Message::Close(_)) => break,
                    Ok(_) => {}
                    Err(e) => {
                        tracing::debug!(url = %url, error = %e, "WebSocket receive error");
                        break;
                    }
                }
            }
        });

        tracing::debug!(url = %self.url, "WebSocket opened");
        Ok(Connection { inbound, outbound })
    }
}
