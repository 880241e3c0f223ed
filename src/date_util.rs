use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc, Weekday};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// ISO-8601 week number (1-53) of a date.
pub fn iso_week_of(d: NaiveDate) -> u32 {
    d.iso_week().week()
}

/// Monday of the ISO week containing `d`.
pub fn start_of_iso_week(d: NaiveDate) -> NaiveDate {
    let iw = d.iso_week();
    NaiveDate::from_isoywd_opt(iw.year(), iw.week(), Weekday::Mon).unwrap_or(d)
}

pub fn month_abbrev(m: u32) -> &'static str {
    match m {
        1 => "Jan",
        2 => "Feb",
        3 => "Mar",
        4 => "Apr",
        5 => "May",
        6 => "Jun",
        7 => "Jul",
        8 => "Aug",
        9 => "Sep",
        10 => "Oct",
        11 => "Nov",
        12 => "Dec",
        _ => "Unknown",
    }
}

/// UTC midnight at the start of `d`.
pub fn midnight_utc(d: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&d.and_time(NaiveTime::MIN))
}

/// Render a timestamp the way it is stored. The fixed width keeps lexical
/// order equal to chronological order.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Parse a stored or imported timestamp. Accepts RFC 3339 with any offset,
/// or a bare `YYYY-MM-DD HH:MM:SS` taken as UTC.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Normalize an imported timestamp to the stored representation.
pub fn normalize_timestamp(s: &str) -> Option<String> {
    parse_timestamp(s).map(format_timestamp)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iso_week_of_year_boundaries() {
        // 2021-01-03 is a Sunday still in week 53 of 2020
        assert_eq!(iso_week_of(NaiveDate::from_ymd_opt(2021, 1, 3).unwrap()), 53);
        assert_eq!(iso_week_of(NaiveDate::from_ymd_opt(2021, 1, 4).unwrap()), 1);
        // 2024-12-30 is a Monday belonging to week 1 of 2025
        assert_eq!(iso_week_of(NaiveDate::from_ymd_opt(2024, 12, 30).unwrap()), 1);
        assert_eq!(iso_week_of(NaiveDate::from_ymd_opt(2025, 6, 18).unwrap()), 25);
    }

    #[test]
    fn test_start_of_iso_week() {
        let wed = NaiveDate::from_ymd_opt(2025, 6, 18).unwrap();
        assert_eq!(
            start_of_iso_week(wed),
            NaiveDate::from_ymd_opt(2025, 6, 16).unwrap()
        );
        let sun = NaiveDate::from_ymd_opt(2025, 6, 22).unwrap();
        assert_eq!(
            start_of_iso_week(sun),
            NaiveDate::from_ymd_opt(2025, 6, 16).unwrap()
        );
    }

    #[test]
    fn test_timestamp_formats() {
        let ts = parse_timestamp("2025-03-01T10:30:00+02:00").unwrap();
        assert_eq!(format_timestamp(ts), "2025-03-01T08:30:00Z");

        let ts = parse_timestamp("2025-03-01 10:30:00").unwrap();
        assert_eq!(format_timestamp(ts), "2025-03-01T10:30:00Z");

        assert_eq!(
            normalize_timestamp("2025-03-01T10:30:00.123Z"),
            Some("2025-03-01T10:30:00Z".to_string())
        );
        assert!(parse_timestamp("yesterday").is_none());
    }
}
