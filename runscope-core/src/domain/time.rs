//! Timestamp rule shared by every series and marker derivation.
//!
//! Accepted inputs:
//! - RFC 3339 strings (`2024-01-02T09:15:00+05:30`)
//! - naive `YYYY-MM-DDTHH:MM:SS[.fff]` / `YYYY-MM-DD HH:MM:SS[.fff]`, read as UTC
//! - bare dates `YYYY-MM-DD`, read as midnight UTC
//! - JSON integers, read as unix seconds
//!
//! Anything else is not a valid instant.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;

const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];
const OFFSET_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f%:z", "%Y-%m-%d %H:%M:%S%.f%z"];

/// Parse a textual timestamp into a UTC instant.
pub fn parse_instant(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(raw, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
    }
    for fmt in NAIVE_FORMATS {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(ndt.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|ndt| ndt.and_utc())
}

/// Whole unix seconds for a raw JSON timestamp, or `None` if it is not a
/// valid instant.
pub fn unix_seconds(value: &Value) -> Option<i64> {
    match value {
        Value::String(s) => parse_instant(s).map(|dt| dt.timestamp()),
        Value::Number(n) => n.as_i64(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_offset_and_naive_forms() {
        let with_offset = unix_seconds(&json!("2024-01-02T09:15:00+05:30")).unwrap();
        let naive_utc = unix_seconds(&json!("2024-01-02T03:45:00")).unwrap();
        assert_eq!(with_offset, naive_utc);

        let spaced = unix_seconds(&json!("2024-01-02 03:45:00")).unwrap();
        assert_eq!(spaced, naive_utc);

        let fractional = unix_seconds(&json!("2024-01-02T03:45:00.750")).unwrap();
        assert_eq!(fractional, naive_utc);
    }

    #[test]
    fn bare_date_is_midnight_utc() {
        let ts = unix_seconds(&json!("1970-01-02")).unwrap();
        assert_eq!(ts, 86_400);
    }

    #[test]
    fn integers_are_unix_seconds() {
        assert_eq!(unix_seconds(&json!(1_700_000_000)), Some(1_700_000_000));
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(unix_seconds(&json!("not-a-date")), None);
        assert_eq!(unix_seconds(&json!("")), None);
        assert_eq!(unix_seconds(&json!(null)), None);
        assert_eq!(unix_seconds(&json!(12.5)), None);
        assert_eq!(unix_seconds(&json!(true)), None);
        assert_eq!(unix_seconds(&json!("2024-13-45T00:00:00")), None);
    }
}
