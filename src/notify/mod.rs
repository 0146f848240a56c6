//! Toast Notifications
//!
//! Transient user-visible messages with a severity and auto-expiry.
//!
//! ## Architecture
//!
//! - **NotificationCenter**: the single ordered list of live notifications
//! - **NotificationSink**: renders additions and removals
//! - **NotificationRecord**: one message with its id and severity

mod center;
mod record;

pub use center::{NotificationCenter, NotificationSink, TracingSink};
pub use record::{NotificationId, NotificationRecord, Severity};
