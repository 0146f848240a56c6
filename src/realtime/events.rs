//! Server Event Types
//!
//! Typed view over the frames pushed by the dashboard server.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::transport::Frame;
use crate::notify::Severity;

/// Event names understood by the dashboard
pub mod names {
    pub const CONNECT: &str = "connect";
    pub const DISCONNECT: &str = "disconnect";
    pub const STATUS: &str = "status";
    pub const STATUS_UPDATE: &str = "status_update";
    pub const NOTIFICATION: &str = "notification";
    pub const REQUEST_STATUS: &str = "request_status";
}

/// Pending-notification counter carried by status updates
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NotificationCount {
    #[serde(default)]
    pub count: u64,
}

/// Live system status pushed by the server or fetched from `/api/status`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notifications: Option<NotificationCount>,
    /// Everything else, passed through to page controllers untouched
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl StatusSnapshot {
    pub fn notification_count(&self) -> u64 {
        self.notifications.as_ref().map(|n| n.count).unwrap_or(0)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }
}

/// A decoded server event
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    StatusUpdate(StatusSnapshot),
    Notification { message: String, severity: Severity },
    Status { message: String },
    Other { event: String, data: Value },
}

#[derive(Deserialize)]
struct NotificationPayload {
    message: String,
    #[serde(rename = "type", default)]
    severity: Severity,
}

#[derive(Deserialize)]
struct StatusPayload {
    #[serde(default)]
    message: String,
}

impl ServerEvent {
    /// Decode a frame; unknown event names become `Other`
    pub fn from_frame(event: &str, data: &Value) -> Result<Self, serde_json::Error> {
        Ok(match event {
            names::STATUS_UPDATE => Self::StatusUpdate(serde_json::from_value(data.clone())?),
            names::NOTIFICATION => {
                let payload: NotificationPayload = serde_json::from_value(data.clone())?;
                Self::Notification {
                    message: payload.message,
                    severity: payload.severity,
                }
            }
            names::STATUS => {
                let payload: StatusPayload = serde_json::from_value(data.clone())?;
                Self::Status {
                    message: payload.message,
                }
            }
            _ => Self::Other {
                event: event.to_string(),
                data: data.clone(),
            },
        })
    }
}

impl TryFrom<&Frame> for ServerEvent {
    type Error = serde_json::Error;

    fn try_from(frame: &Frame) -> Result<Self, Self::Error> {
        Self::from_frame(&frame.event, &frame.data)
    }
}
