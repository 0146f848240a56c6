//! Notification Records
//!
//! A toast message with a severity, an identity and a creation time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity of a notification, also its visual variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Success,
    Error,
    Warning,
    #[default]
    #[serde(other)]
    Info,
}

impl Severity {
    /// Parse a severity name, falling back to `Info` for anything unknown
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "success" => Self::Success,
            "error" => Self::Error,
            "warning" => Self::Warning,
            _ => Self::Info,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Info => "info",
        }
    }

    /// Icon name used by the toast renderer
    pub fn icon(&self) -> &'static str {
        match self {
            Self::Success => "check-circle",
            Self::Error => "exclamation-circle",
            Self::Warning => "exclamation-triangle",
            Self::Info => "info-circle",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of a live notification.
///
/// Derived from the creation time in milliseconds, bumped when two
/// notifications land in the same millisecond.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NotificationId(pub u64);

impl fmt::Display for NotificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "notification-{}", self.0)
    }
}

/// A single toast message
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NotificationRecord {
    pub id: NotificationId,
    pub severity: Severity,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_parse() {
        assert_eq!(Severity::parse("success"), Severity::Success);
        assert_eq!(Severity::parse("ERROR"), Severity::Error);
        assert_eq!(Severity::parse("warning"), Severity::Warning);
        assert_eq!(Severity::parse("info"), Severity::Info);
        assert_eq!(Severity::parse("shout"), Severity::Info);
    }

    #[test]
    fn test_severity_deserialize_unknown() {
        let severity: Severity = serde_json::from_str("\"warning\"").unwrap();
        assert_eq!(severity, Severity::Warning);

        let severity: Severity = serde_json::from_str("\"critical\"").unwrap();
        assert_eq!(severity, Severity::Info);
    }

    #[test]
    fn test_icons() {
        assert_eq!(Severity::Success.icon(), "check-circle");
        assert_eq!(Severity::Warning.icon(), "exclamation-triangle");
    }

    #[test]
    fn test_id_display() {
        assert_eq!(NotificationId(42).to_string(), "notification-42");
    }
}
