//! Calendar helpers for the GATT Date Time layout.
//!
//! Validation, minute arithmetic (used to apply time offsets) and
//! ISO 8601 formatting/parsing of [`DateTime`] values.

use thiserror::Error;

use crate::model::DateTime;

const SECONDS_PER_MINUTE: i64 = 60;
const SECONDS_PER_DAY: i64 = 24 * 60 * 60;

/// Earliest year representable in a GATT Date Time.
pub const MIN_YEAR: u16 = 1582;
/// Latest year representable in a GATT Date Time.
pub const MAX_YEAR: u16 = 9999;

/// Error type for ISO 8601 parsing failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct DateTimeParseError {
    pub message: String,
}

impl DateTimeParseError {
    fn new(what: &str, input: &str) -> Self {
        Self {
            message: format!("Invalid {} in datetime: {}", what, input),
        }
    }
}

/// Returns true if the given year is a leap year.
fn is_leap_year(year: i64) -> bool {
    (year % 4 == 0 && year % 100 != 0) || (year % 400 == 0)
}

/// Returns the number of days in a given month (1-indexed).
fn days_in_month(year: i64, month: u8) -> u8 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 => {
            if is_leap_year(year) {
                29
            } else {
                28
            }
        }
        _ => 0,
    }
}

/// Days since Unix epoch for a civil date (Howard Hinnant's algorithm).
fn date_to_days(year: i64, month: u8, day: u8) -> i64 {
    let y = if month <= 2 { year - 1 } else { year };
    let m = if month <= 2 {
        month as i64 + 9
    } else {
        month as i64 - 3
    };

    let era = if y >= 0 { y } else { y - 399 } / 400;
    let yoe = y - era * 400;
    let doy = (153 * m + 2) / 5 + day as i64 - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;

    era * 146097 + doe - 719468
}

/// Converts days since Unix epoch to (year, month, day).
fn days_to_date(days: i64) -> (i64, u8, u8) {
    let z = days + 719468;
    let era = if z >= 0 { z } else { z - 146096 } / 146097;
    let doe = z - era * 146097;
    let yoe = (doe - doe / 1460 + doe / 36524 - doe / 146096) / 365;
    let y = yoe + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = (doy - (153 * mp + 2) / 5 + 1) as u8;
    let m = if mp < 10 { mp + 3 } else { mp - 9 } as u8;

    let year = if m <= 2 { y + 1 } else { y };
    (year, m, d)
}

/// Validates field ranges of a Date Time.
///
/// Unknown (zero) year, month or day are accepted; a known day is checked
/// against the month length only when year and month are known too.
pub fn validate_datetime(dt: &DateTime) -> Result<(), &'static str> {
    if dt.year != 0 && !(MIN_YEAR..=MAX_YEAR).contains(&dt.year) {
        return Err("DATETIME year outside range [1582, 9999]");
    }
    if dt.month > 12 {
        return Err("DATETIME month outside range [1, 12]");
    }
    if dt.day > 31 {
        return Err("DATETIME day outside range [1, 31]");
    }
    if dt.year != 0 && dt.month != 0 && dt.day > days_in_month(dt.year as i64, dt.month) {
        return Err("DATETIME day exceeds month length");
    }
    if dt.hours > 23 {
        return Err("DATETIME hours outside range [0, 23]");
    }
    if dt.minutes > 59 {
        return Err("DATETIME minutes outside range [0, 59]");
    }
    if dt.seconds > 59 {
        return Err("DATETIME seconds outside range [0, 59]");
    }
    Ok(())
}

/// Shifts a fully-known Date Time by a signed number of minutes.
///
/// Returns `None` if the date is not known or the result leaves the
/// representable year range.
pub fn add_minutes(dt: &DateTime, minutes: i64) -> Option<DateTime> {
    if !dt.is_date_known() || validate_datetime(dt).is_err() {
        return None;
    }

    let days = date_to_days(dt.year as i64, dt.month, dt.day);
    let secs = days * SECONDS_PER_DAY
        + dt.hours as i64 * 3600
        + dt.minutes as i64 * SECONDS_PER_MINUTE
        + dt.seconds as i64
        + minutes.checked_mul(SECONDS_PER_MINUTE)?;

    let (year, month, day) = days_to_date(secs.div_euclid(SECONDS_PER_DAY));
    if year < MIN_YEAR as i64 || year > MAX_YEAR as i64 {
        return None;
    }
    let rem = secs.rem_euclid(SECONDS_PER_DAY);

    Some(DateTime {
        year: year as u16,
        month,
        day,
        hours: (rem / 3600) as u8,
        minutes: ((rem % 3600) / 60) as u8,
        seconds: (rem % 60) as u8,
    })
}

/// Formats a Date Time as ISO 8601 (`YYYY-MM-DDTHH:MM:SS`).
///
/// Unknown fields are rendered as zeros, matching the wire encoding.
pub fn format_datetime_iso8601(dt: &DateTime) -> String {
    format!(
        "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}",
        dt.year, dt.month, dt.day, dt.hours, dt.minutes, dt.seconds
    )
}

/// Parses an ISO 8601 `YYYY-MM-DDTHH:MM:SS` string (space separator allowed).
pub fn parse_datetime_iso8601(s: &str) -> Result<DateTime, DateTimeParseError> {
    let bytes = s.as_bytes();
    if bytes.len() != 19 || !s.is_ascii() {
        return Err(DateTimeParseError::new("length", s));
    }
    if bytes[4] != b'-' || bytes[7] != b'-' || bytes[13] != b':' || bytes[16] != b':' {
        return Err(DateTimeParseError::new("separator", s));
    }
    if bytes[10] != b'T' && bytes[10] != b' ' {
        return Err(DateTimeParseError::new("separator", s));
    }

    let year: u16 = s[..4].parse().map_err(|_| DateTimeParseError::new("year", s))?;
    let month: u8 = s[5..7].parse().map_err(|_| DateTimeParseError::new("month", s))?;
    let day: u8 = s[8..10].parse().map_err(|_| DateTimeParseError::new("day", s))?;
    let hours: u8 = s[11..13].parse().map_err(|_| DateTimeParseError::new("hours", s))?;
    let minutes: u8 = s[14..16]
        .parse()
        .map_err(|_| DateTimeParseError::new("minutes", s))?;
    let seconds: u8 = s[17..19]
        .parse()
        .map_err(|_| DateTimeParseError::new("seconds", s))?;

    let dt = DateTime::new(year, month, day, hours, minutes, seconds);
    validate_datetime(&dt).map_err(|msg| DateTimeParseError {
        message: format!("{}: {}", msg, s),
    })?;
    Ok(dt)
}
