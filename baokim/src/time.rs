//! Gateway date-time format.
//!
//! The gateway expects wall-clock times in Vietnam time (fixed UTC+07:00)
//! formatted as `YYYY-MM-DD HH:MM:SS`, with no `T`, `Z` or offset suffix.
//! Conversion goes through an explicit [`FixedOffset`], so the host time zone
//! never matters.

use chrono::{DateTime, FixedOffset, NaiveDateTime, Offset, TimeZone, Utc};

/// Gateway UTC offset in seconds (+07:00).
pub const GATEWAY_UTC_OFFSET_SECS: i32 = 7 * 3600;

/// Wire format for gateway date-times.
pub const GATEWAY_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Compact form used inside request identifiers.
pub const COMPACT_TIME_FORMAT: &str = "%Y%m%d%H%M%S";

/// Returns the gateway time zone.
#[must_use]
pub fn gateway_offset() -> FixedOffset {
    FixedOffset::east_opt(GATEWAY_UTC_OFFSET_SECS).unwrap_or_else(|| Utc.fix())
}

/// Converts an instant to gateway local time.
#[must_use]
pub fn to_gateway_time(instant: DateTime<Utc>) -> DateTime<FixedOffset> {
    instant.with_timezone(&gateway_offset())
}

/// Formats an instant as `YYYY-MM-DD HH:MM:SS` in UTC+7.
#[must_use]
pub fn format_gateway_time(instant: DateTime<Utc>) -> String {
    to_gateway_time(instant)
        .format(GATEWAY_TIME_FORMAT)
        .to_string()
}

/// Formats an instant as `YYYYMMDDHHMMSS` in UTC+7.
#[must_use]
pub fn format_compact_time(instant: DateTime<Utc>) -> String {
    to_gateway_time(instant)
        .format(COMPACT_TIME_FORMAT)
        .to_string()
}

/// The current time in gateway wire format.
#[must_use]
pub fn now_gateway_time() -> String {
    format_gateway_time(Utc::now())
}

/// Parses a gateway-format date-time (interpreted in UTC+7).
#[must_use]
pub fn parse_gateway_time(s: &str) -> Option<DateTime<Utc>> {
    let naive = NaiveDateTime::parse_from_str(s.trim(), GATEWAY_TIME_FORMAT).ok()?;
    gateway_offset()
        .from_local_datetime(&naive)
        .single()
        .map(|local| local.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).single().unwrap()
    }

    #[test]
    fn formats_in_utc_plus_seven() {
        assert_eq!(
            format_gateway_time(utc(2024, 3, 15, 2, 4, 5)),
            "2024-03-15 09:04:05"
        );
    }

    #[test]
    fn crosses_midnight_and_year_boundary() {
        assert_eq!(
            format_gateway_time(utc(2023, 12, 31, 20, 0, 0)),
            "2024-01-01 03:00:00"
        );
    }

    #[test]
    fn compact_form_has_digits_only() {
        let compact = format_compact_time(utc(2024, 3, 15, 2, 4, 5));
        assert_eq!(compact, "20240315090405");
    }

    #[test]
    fn wire_format_has_no_offset_suffix() {
        let now = now_gateway_time();
        assert_eq!(now.len(), 19);
        assert!(!now.contains('T'));
        assert!(!now.ends_with('Z'));
        assert!(!now.contains('+'));
    }

    #[test]
    fn parse_is_inverse_of_format() {
        let instant = utc(2025, 6, 1, 17, 30, 0);
        assert_eq!(
            parse_gateway_time(&format_gateway_time(instant)),
            Some(instant)
        );
        assert_eq!(parse_gateway_time("2025-06-01T17:30:00Z"), None);
    }
}
