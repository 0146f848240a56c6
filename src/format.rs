//! Display formatting for timestamps, sizes and counters

use chrono::{DateTime, Utc};

const BYTE_UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

/// Human-relative age of `timestamp` as seen at `now`.
///
/// Anything older than a day is shown as an absolute UTC time.
pub fn format_relative_time(timestamp: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    let Some(timestamp) = timestamp else {
        return "--:--:--".to_string();
    };

    let minutes = (now - timestamp).num_minutes();
    if minutes < 1 {
        "just now".to_string()
    } else if minutes < 60 {
        format!("{} minutes ago", minutes)
    } else if minutes < 24 * 60 {
        format!("{} hours ago", minutes / 60)
    } else {
        timestamp.format("%Y-%m-%d %H:%M:%S").to_string()
    }
}

/// Byte count in base-1024 units with at most two decimals
pub fn format_bytes(bytes: u64) -> String {
    if bytes == 0 {
        return "0 B".to_string();
    }

    let mut unit = 0;
    let mut value = bytes as f64;
    while value >= 1024.0 && unit < BYTE_UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let rounded = format!("{:.2}", value);
    let trimmed = rounded.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", trimmed, BYTE_UNITS[unit])
}

/// Compact counter: `1.5M`, `2.3K`, or the plain number below a thousand
pub fn format_number(n: u64) -> String {
    if n >= 1_000_000 {
        format!("{:.1}M", n as f64 / 1_000_000.0)
    } else if n >= 1_000 {
        format!("{:.1}K", n as f64 / 1_000.0)
    } else {
        n.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn test_relative_time() {
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap();
        let ago = |secs| Some(now - Duration::seconds(secs));

        assert_eq!(format_relative_time(None, now), "--:--:--");
        assert_eq!(format_relative_time(ago(59), now), "just now");
        assert_eq!(format_relative_time(ago(60), now), "1 minutes ago");
        assert_eq!(format_relative_time(ago(59 * 60 + 59), now), "59 minutes ago");
        assert_eq!(format_relative_time(ago(3 * 3600 + 120), now), "3 hours ago");
        assert_eq!(
            format_relative_time(ago(2 * 86_400), now),
            "2024-03-08 12:00:00"
        );
    }

    #[test]
    fn test_future_timestamp_is_just_now() {
        let now = Utc::now();
        assert_eq!(
            format_relative_time(Some(now + Duration::minutes(5)), now),
            "just now"
        );
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(1024), "1 KB");
        assert_eq!(format_bytes(1536), "1.5 KB");
        assert_eq!(format_bytes(1_258_291), "1.2 MB");
        assert_eq!(format_bytes(5 * 1024 * 1024 * 1024), "5 GB");
        assert_eq!(format_bytes(2048 * 1024u64.pow(4)), "2048 TB");
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(2_300), "2.3K");
        assert_eq!(format_number(1_500_000), "1.5M");
    }
}
