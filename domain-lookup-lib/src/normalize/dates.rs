//! Date parsing for registry timestamps.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};

/// Formats carrying an explicit offset.
const OFFSET_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%z", "%Y-%m-%d %H:%M:%S %z", "%Y-%m-%dT%H:%M:%S%z"];

/// Date-time formats without an offset; read as UTC.
const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y.%m.%d %H:%M:%S",
    "%Y/%m/%d %H:%M:%S",
    "%d.%m.%Y %H:%M:%S",
    "%d/%m/%Y %H:%M:%S",
    "%d-%b-%Y %H:%M:%S",
];

/// Date-only formats; read as midnight UTC.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y.%m.%d",
    "%Y/%m/%d",
    "%d-%b-%Y",
    "%d %b %Y",
    "%d.%m.%Y",
    "%d/%m/%Y",
    "%d-%m-%Y",
    "%b %d %Y",
    "%B %d %Y",
    "%Y%m%d",
];

/// Parse a registry timestamp in any of the common formats.
pub fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    let text = strip_zone_suffix(raw.trim());
    if text.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(text, format) {
            return Some(dt.with_timezone(&Utc));
        }
    }

    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(text, format) {
            return date
                .and_hms_opt(0, 0, 0)
                .map(|naive| Utc.from_utc_datetime(&naive));
        }
    }

    None
}

/// Normalize a timestamp to RFC 3339 when it parses; keep it verbatim
/// otherwise.
pub fn normalize_date(raw: &str) -> String {
    match parse_date(raw) {
        Some(dt) => dt.to_rfc3339_opts(SecondsFormat::Secs, true),
        None => raw.trim().to_string(),
    }
}

/// Drop a trailing UTC/GMT marker and any parenthesized remark.
fn strip_zone_suffix(text: &str) -> &str {
    let text = match text.find(" (") {
        Some(idx) => text[..idx].trim_end(),
        None => text,
    };
    for suffix in [" UTC", " GMT", " utc", " gmt"] {
        if let Some(stripped) = text.strip_suffix(suffix) {
            return stripped.trim_end();
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rfc3339_passthrough() {
        assert_eq!(normalize_date("1995-08-14T04:00:00Z"), "1995-08-14T04:00:00Z");
        assert_eq!(normalize_date("2024-08-13T04:00:00.123Z"), "2024-08-13T04:00:00Z");
        assert_eq!(normalize_date("2024-08-13T06:00:00+02:00"), "2024-08-13T04:00:00Z");
    }

    #[test]
    fn test_common_whois_formats() {
        assert_eq!(normalize_date("2019-03-01"), "2019-03-01T00:00:00Z");
        assert_eq!(normalize_date("14-Aug-1995"), "1995-08-14T00:00:00Z");
        assert_eq!(normalize_date("14-AUG-1995"), "1995-08-14T00:00:00Z");
        assert_eq!(normalize_date("2020.01.15 10:20:30"), "2020-01-15T10:20:30Z");
        assert_eq!(normalize_date("2020-01-15 10:20:30 UTC"), "2020-01-15T10:20:30Z");
        assert_eq!(normalize_date("15.01.2020"), "2020-01-15T00:00:00Z");
        assert_eq!(normalize_date("2020-01-15 10:20:30+0100"), "2020-01-15T09:20:30Z");
    }

    #[test]
    fn test_unparseable_kept_verbatim() {
        assert_eq!(normalize_date("  before 1996  "), "before 1996");
        assert!(parse_date("").is_none());
        assert!(parse_date("n/a").is_none());
    }

    #[test]
    fn test_parse_orders_correctly() {
        let early = parse_date("2001-01-01").unwrap();
        let late = parse_date("2001-01-02T00:00:00Z").unwrap();
        assert!(early < late);
    }
}
