//! Log entry parsing
//!
//! One entry per logical line:
//! `[01-Jan-2025 00:00:00 UTC] PHP Fatal error:  message in /path/file.php on line 12`
//!
//! Lines that do not fit this shape (stack traces, dumps, wrapped output)
//! are continuation noise and parse to `None`.

use std::sync::OnceLock;

use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::classify::Classification;

/// Levels that pass the severity gate
pub const RELEVANT_LEVELS: [&str; 3] = ["fatal error", "parse error", "warning"];

/// A parsed log line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    /// Severity label as written, e.g. "Fatal error"
    pub level: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_line: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classification: Option<Classification>,
}

impl LogEntry {
    /// Whether the level is one of fatal error, parse error or warning
    pub fn has_relevant_level(&self) -> bool {
        is_relevant_level(&self.level)
    }
}

fn line_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\[(?P<ts>[^\]]+)\]\s+PHP\s+(?P<level>[^:]+?):\s*(?P<message>.*)$")
            .expect("entry pattern is valid")
    })
}

fn location_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\bin\s+(?P<file>\S+?)(?: on line (?P<line>\d+)|:(?P<colon_line>\d+)\b)")
            .expect("location pattern is valid")
    })
}

/// Parse one log line. Returns `None` for anything that is not an entry.
pub fn parse_line(line: &str) -> Option<LogEntry> {
    let caps = line_regex().captures(line.trim_end())?;

    let timestamp = parse_timestamp(&caps["ts"])?;
    let level = caps["level"].trim().to_string();
    if level.is_empty() {
        return None;
    }
    let message = caps["message"].trim().to_string();
    let (source_file, source_line) = match extract_location(&message) {
        Some((file, line)) => (Some(file), Some(line)),
        None => (None, None),
    };

    Some(LogEntry {
        timestamp,
        level,
        message,
        source_file,
        source_line,
        classification: None,
    })
}

/// Extract the last "in FILE on line N" (or "in FILE:N") location
pub fn extract_location(message: &str) -> Option<(String, u32)> {
    let caps = location_regex().captures_iter(message).last()?;
    let line = caps
        .name("line")
        .or_else(|| caps.name("colon_line"))?
        .as_str()
        .parse()
        .ok()?;
    Some((caps["file"].to_string(), line))
}

pub fn is_relevant_level(level: &str) -> bool {
    let level = normalize_level(level);
    RELEVANT_LEVELS.contains(&level.as_str())
}

fn normalize_level(level: &str) -> String {
    level.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

/// Parse the bracketed date-time field
///
/// Accepts `01-Jan-2025 00:00:00 UTC`, IANA zone names such as
/// `America/New_York`, numeric offsets, a missing zone (UTC), and RFC 3339.
/// Local times repeated by a DST fall-back resolve to the earlier instant.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    let mut parts = raw.split_whitespace();
    let date = parts.next()?;
    let time = parts.next()?;
    let zone = parts.next();
    if parts.next().is_some() {
        return None;
    }

    let naive = NaiveDateTime::parse_from_str(&format!("{} {}", date, time), "%d-%b-%Y %H:%M:%S")
        .ok()?;
    match zone {
        None => Some(Utc.from_utc_datetime(&naive)),
        Some(zone) => localize(&naive, zone),
    }
}

fn localize(naive: &NaiveDateTime, zone: &str) -> Option<DateTime<Utc>> {
    if let Some(offset) = parse_numeric_offset(zone) {
        return to_utc(offset.from_local_datetime(naive).earliest());
    }
    if matches!(zone.to_ascii_uppercase().as_str(), "UTC" | "GMT" | "Z") {
        return Some(Utc.from_utc_datetime(naive));
    }

    match zone.parse::<Tz>() {
        Ok(tz) => to_utc(tz.from_local_datetime(naive).earliest()),
        Err(_) => {
            tracing::debug!(zone, "unknown timezone name, assuming UTC");
            Some(Utc.from_utc_datetime(naive))
        }
    }
}

fn to_utc<Z: TimeZone>(dt: Option<DateTime<Z>>) -> Option<DateTime<Utc>> {
    dt.map(|dt| dt.with_timezone(&Utc))
}

fn parse_numeric_offset(zone: &str) -> Option<FixedOffset> {
    let (sign, rest) = match zone.as_bytes().first()? {
        b'+' => (1, &zone[1..]),
        b'-' => (-1, &zone[1..]),
        _ => return None,
    };
    let digits: String = rest.chars().filter(|c| *c != ':').collect();
    if digits.len() != 4 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let hours: i32 = digits[..2].parse().ok()?;
    let minutes: i32 = digits[2..].parse().ok()?;
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn test_parse_fatal_error_line() {
        let line = "[14-Mar-2025 09:15:02 UTC] PHP Fatal error:  Uncaught Error: Call to undefined function foo() in /var/www/wp-content/plugins/charitable/includes/class.php on line 42";
        let entry = parse_line(line).unwrap();

        assert_eq!(entry.level, "Fatal error");
        assert!(entry.message.starts_with("Uncaught Error"));
        assert_eq!(
            entry.source_file.as_deref(),
            Some("/var/www/wp-content/plugins/charitable/includes/class.php")
        );
        assert_eq!(entry.source_line, Some(42));
        assert_eq!(entry.timestamp.hour(), 9);
        assert!(entry.has_relevant_level());
    }

    #[test]
    fn test_parse_warning_without_location() {
        let entry = parse_line("[01-Jan-2025 00:00:00 UTC] PHP Warning: something odd").unwrap();
        assert_eq!(entry.level, "Warning");
        assert_eq!(entry.message, "something odd");
        assert_eq!(entry.source_file, None);
        assert_eq!(entry.source_line, None);
    }

    #[test]
    fn test_continuation_lines_do_not_parse() {
        assert!(parse_line("Stack trace:").is_none());
        assert!(parse_line("#0 /var/www/wp-includes/class-wp-hook.php(324): foo()").is_none());
        assert!(parse_line("#1 {main}").is_none());
        assert!(parse_line("").is_none());
        assert!(parse_line("[01-Jan-2025 00:00:00 UTC] WordPress database error").is_none());
    }

    #[test]
    fn test_unparseable_timestamp_is_skipped() {
        assert!(parse_line("[yesterday] PHP Warning: nope").is_none());
    }

    #[test]
    fn test_colon_location_form() {
        let (file, line) =
            extract_location("Uncaught Exception: boom in /srv/app/gateway.php:88").unwrap();
        assert_eq!(file, "/srv/app/gateway.php");
        assert_eq!(line, 88);
    }

    #[test]
    fn test_last_location_wins() {
        let (file, line) = extract_location(
            "Uncaught TypeError: x() called in /a/caller.php on line 3 and defined in /a/callee.php on line 9",
        )
        .unwrap();
        assert_eq!(file, "/a/callee.php");
        assert_eq!(line, 9);
    }

    #[test]
    fn test_level_gate_is_case_insensitive() {
        assert!(is_relevant_level("FATAL ERROR"));
        assert!(is_relevant_level("Parse error"));
        assert!(is_relevant_level("warning"));
        assert!(!is_relevant_level("Notice"));
        assert!(!is_relevant_level("Deprecated"));
        assert!(!is_relevant_level("Recoverable fatal error"));
    }

    #[test]
    fn test_timestamp_zones() {
        let utc = parse_timestamp("01-Jan-2025 12:00:00 UTC").unwrap();
        let bare = parse_timestamp("01-Jan-2025 12:00:00").unwrap();
        let offset = parse_timestamp("01-Jan-2025 14:00:00 +02:00").unwrap();
        let rfc = parse_timestamp("2025-01-01T12:00:00Z").unwrap();

        assert_eq!(utc, bare);
        assert_eq!(utc, offset);
        assert_eq!(utc, rfc);
        assert!(parse_timestamp("01-Jan-2025").is_none());
        assert_eq!(parse_timestamp("01-Jan-2025 12:00:00 Mars/Olympus"), Some(utc));
        assert!(parse_timestamp("01-Jan-2025 12:00:00 UTC extra").is_none());
    }

    #[test]
    fn test_named_zones_resolve_to_utc_instant() {
        let new_york = parse_timestamp("01-Jan-2025 07:00:00 America/New_York").unwrap();
        assert_eq!(new_york, Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap());

        // Summer time in Berlin is UTC+2
        let berlin = parse_timestamp("15-Jul-2025 14:30:00 Europe/Berlin").unwrap();
        assert_eq!(berlin, Utc.with_ymd_and_hms(2025, 7, 15, 12, 30, 0).unwrap());

        // 01:30 happens twice on the 2025 fall-back night; the EDT one is earlier
        let repeated = parse_timestamp("02-Nov-2025 01:30:00 America/New_York").unwrap();
        assert_eq!(repeated, Utc.with_ymd_and_hms(2025, 11, 2, 5, 30, 0).unwrap());
    }
}
