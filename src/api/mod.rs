//! Dashboard REST API Client
//!
//! Thin JSON client for the dashboard backend (`/api/status`, account and
//! group management, logs).
//!
//! # Failure reporting
//!
//! | Failure              | Notification                         | Extra                      |
//! |----------------------|--------------------------------------|----------------------------|
//! | Network / connect    | error                                |                            |
//! | `401 Unauthorized`   | warning                              | redirect to the login page |
//! | Other non-2xx status | error, `Request failed: <message>`   |                            |
//! | Undecodable body     | error, `Request failed: <message>`   |                            |
//!
//! The error is always returned to the caller as well.

mod client;
pub mod error;

pub use client::{ApiClient, LogNavigator, Navigator};
pub use error::{extract_error_message, RequestError, RequestResult};
