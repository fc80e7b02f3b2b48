//! Calendar-day helpers
//!
//! Every "same day" comparison in the service uses UTC calendar days. Query
//! parameters accept either a bare `YYYY-MM-DD` date or a full RFC 3339
//! timestamp.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};

/// Half-open `[start, end)` bounds of a UTC calendar day
pub fn day_bounds(day: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = Utc.from_utc_datetime(&day.and_time(NaiveTime::MIN));
    (start, start + Duration::days(1))
}

/// Bounds of the UTC day containing `instant`
pub fn day_bounds_of(instant: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    day_bounds(instant.date_naive())
}

/// Parses `YYYY-MM-DD`, or the date part of an RFC 3339 timestamp
pub fn parse_day(input: &str) -> Option<NaiveDate> {
    let input = input.trim();
    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .ok()
        .or_else(|| parse_timestamp(input).map(|t| t.date_naive()))
}

/// Parses an RFC 3339 timestamp, or a bare date taken as UTC midnight
pub fn parse_timestamp(input: &str) -> Option<DateTime<Utc>> {
    let input = input.trim();
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(input) {
        return Some(timestamp.with_timezone(&Utc));
    }

    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .ok()
        .map(|day| day_bounds(day).0)
}

/// Lower bound of a report range: the start of the `from` day
pub fn range_start(from: NaiveDate) -> DateTime<Utc> {
    day_bounds(from).0
}

/// Exclusive upper bound of a report range: the end of the `until` day
pub fn range_end(until: NaiveDate) -> DateTime<Utc> {
    day_bounds(until).1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_day_bounds() {
        let day = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        let (start, end) = day_bounds(day);

        assert_eq!(start.to_rfc3339(), "2024-03-15T00:00:00+00:00");
        assert_eq!(end.to_rfc3339(), "2024-03-16T00:00:00+00:00");
    }

    #[test]
    fn test_day_bounds_of_late_evening() {
        let instant = parse_timestamp("2024-03-15T23:59:59Z").unwrap();
        let (start, end) = day_bounds_of(instant);

        assert!(start <= instant && instant < end);
        assert_eq!(start.date_naive(), NaiveDate::from_ymd_opt(2024, 3, 15).unwrap());
    }

    #[test]
    fn test_parse_day() {
        let expected = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        assert_eq!(parse_day("2024-01-31"), Some(expected));
        assert_eq!(parse_day(" 2024-01-31 "), Some(expected));
        assert_eq!(parse_day("2024-01-31T10:00:00Z"), Some(expected));
        assert_eq!(parse_day("31/01/2024"), None);
        assert_eq!(parse_day(""), None);
    }

    #[test]
    fn test_parse_timestamp_normalizes_offsets() {
        let parsed = parse_timestamp("2024-01-31T01:30:00+02:00").unwrap();
        assert_eq!(parsed.to_rfc3339(), "2024-01-30T23:30:00+00:00");

        let midnight = parse_timestamp("2024-01-31").unwrap();
        assert_eq!(midnight.to_rfc3339(), "2024-01-31T00:00:00+00:00");

        assert!(parse_timestamp("yesterday").is_none());
    }

    #[test]
    fn test_range_bounds_cover_whole_days() {
        let from = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        let until = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();

        assert_eq!(range_start(from).to_rfc3339(), "2024-02-01T00:00:00+00:00");
        assert_eq!(range_end(until).to_rfc3339(), "2024-03-01T00:00:00+00:00");
    }
}
