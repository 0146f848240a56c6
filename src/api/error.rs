//! API client errors

use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

/// Result type for backend requests
pub type RequestResult<T> = Result<T, RequestError>;

/// Why a backend request failed
#[derive(Error, Debug)]
pub enum RequestError {
    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("Network error: {0}")]
    Network(#[source] reqwest::Error),

    #[error("Session expired")]
    AuthExpired,

    #[error("{message}")]
    Status { status: u16, message: String },

    #[error("Invalid response body: {0}")]
    Decode(#[from] serde_json::Error),
}

impl RequestError {
    /// HTTP status of the failed response, if the server answered
    pub fn status(&self) -> Option<u16> {
        match self {
            RequestError::AuthExpired => Some(StatusCode::UNAUTHORIZED.as_u16()),
            RequestError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Message shown for a failed response: the body's `error` field when it is
/// JSON carrying one, otherwise `HTTP <code>: <reason>`.
pub fn extract_error_message(status: StatusCode, body: &str) -> String {
    let parsed = serde_json::from_str::<Value>(body).ok();
    let from_body = parsed
        .as_ref()
        .and_then(|v| v.get("error"))
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty());

    match from_body {
        Some(message) => message.to_string(),
        None => format!(
            "HTTP {}: {}",
            status.as_u16(),
            status.canonical_reason().unwrap_or("Unknown")
        ),
    }
}
