//! Lenient date parsing for form input and spreadsheet cells. All values
//! without an offset are read as UTC.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};

const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d"];

/// Spreadsheet serial numbers outside this window are treated as plain numbers.
const SERIAL_MIN: f64 = 20000.0;
const SERIAL_MAX: f64 = 80000.0;

/// Accepts RFC 3339 timestamps, ISO dates with or without a time, and `M/D/YYYY`.
pub fn parse_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.with_timezone(&Utc));
    }

    for format in DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(value, format) {
            return date.and_hms_opt(0, 0, 0).map(|dt| Utc.from_utc_datetime(&dt));
        }
    }

    None
}

/// [`parse_date`] plus spreadsheet serial day numbers (days since 1899-12-30).
pub fn parse_sheet_date(value: &str) -> Option<DateTime<Utc>> {
    parse_date(value).or_else(|| {
        let serial: f64 = value.trim().parse().ok()?;
        if !(serial > SERIAL_MIN && serial < SERIAL_MAX) {
            return None;
        }
        let epoch = Utc.with_ymd_and_hms(1899, 12, 30, 0, 0, 0).single()?;
        let millis = (serial * 86_400_000.0).round() as i64;
        Some(epoch + Duration::milliseconds(millis))
    })
}

/// Calendar day in UTC, used to match meetings across importers.
pub fn day_key(date: DateTime<Utc>) -> String {
    date.format("%Y-%m-%d").to_string()
}
