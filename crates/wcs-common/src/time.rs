//! Time position parsing and "units since epoch" conversion.
//!
//! WCS clients send ISO 8601 time positions of varying precision while DAP
//! time coordinates are numeric offsets described by CF style units strings
//! such as `"hours since 1900-01-01 00:00:0.0"`.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};

use crate::error::{WcsError, WcsResult};

const MS_PER_SECOND: i64 = 1000;
const MS_PER_MINUTE: i64 = 60 * MS_PER_SECOND;
const MS_PER_HOUR: i64 = 60 * MS_PER_MINUTE;
const MS_PER_DAY: i64 = 24 * MS_PER_HOUR;

/// Zone designators that are recognised and stripped. All are read as UTC.
const ZONE_SUFFIXES: &[&str] = &["UTC", "GMT", "UT", "Z", "z"];

fn invalid_time(value: &str, reason: &str) -> WcsError {
    WcsError::invalid(
        "TemporalSubset",
        format!("Unable to parse time position '{}': {}", value, reason),
    )
}

/// Remove a trailing zone designator. Every zone is interpreted as offset 0.
fn strip_zone(s: &str) -> &str {
    let s = s.trim();
    for zone in ZONE_SUFFIXES {
        if let Some(stripped) = s.strip_suffix(zone) {
            return stripped.trim_end();
        }
    }
    s
}

/// Parse a WCS time position.
///
/// Supports reduced precision forms:
/// - `2006` (year), `2006-09` (month), `2006-09-27` (day)
/// - `2006-09-27T10Z`, `2006-09-27T10:00Z`, `2006-09-27T10:00:00.5Z`
pub fn parse_time_position(s: &str) -> WcsResult<DateTime<Utc>> {
    let value = strip_zone(s);
    if value.is_empty() {
        return Err(invalid_time(s, "empty time position"));
    }

    let (date_part, time_part) = match value.split_once('T') {
        Some((date, time)) => (date, Some(time)),
        None => (value, None),
    };

    let date_fields: Vec<&str> = date_part.split('-').collect();
    if date_fields.len() > 3 {
        return Err(invalid_time(s, "too many date fields"));
    }
    if time_part.is_some() && date_fields.len() != 3 {
        return Err(invalid_time(s, "a time of day requires a complete date"));
    }
    let date = parse_date_fields(&date_fields).ok_or_else(|| invalid_time(s, "bad date"))?;

    let time = match time_part {
        Some(t) => {
            // Numeric offsets are accepted but, like named zones, read as UTC.
            let t = t.split(['+', '-']).next().unwrap_or(t);
            let time_fields: Vec<&str> = t.split(':').collect();
            if time_fields.len() > 3 {
                return Err(invalid_time(s, "too many time fields"));
            }
            parse_time_fields(&time_fields).ok_or_else(|| invalid_time(s, "bad time of day"))?
        }
        None => NaiveTime::MIN,
    };

    Ok(Utc.from_utc_datetime(&NaiveDateTime::new(date, time)))
}

fn parse_date_fields(fields: &[&str]) -> Option<NaiveDate> {
    let number = |i: usize| -> Option<u32> {
        match fields.get(i) {
            Some(f) => f.trim().parse().ok(),
            None => Some(1),
        }
    };
    let year: i32 = fields.first()?.trim().parse().ok()?;
    NaiveDate::from_ymd_opt(year, number(1)?, number(2)?)
}

fn parse_time_fields(fields: &[&str]) -> Option<NaiveTime> {
    let hour: u32 = fields.first()?.trim().parse().ok()?;
    let minute: u32 = match fields.get(1) {
        Some(m) => m.trim().parse().ok()?,
        None => 0,
    };
    let (second, nanos) = match fields.get(2) {
        Some(sec) => parse_seconds(sec.trim())?,
        None => (0, 0),
    };
    NaiveTime::from_hms_nano_opt(hour, minute, second, nanos)
}

/// Seconds with an optional fractional part, e.g. `"0.0"` or `"48.11"`.
fn parse_seconds(s: &str) -> Option<(u32, u32)> {
    let (whole, fraction) = match s.split_once('.') {
        Some((w, f)) => (w, f),
        None => (s, ""),
    };
    let second: u32 = whole.parse().ok()?;
    if fraction.is_empty() {
        return Some((second, 0));
    }
    if !fraction.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let digits: String = fraction.chars().chain("000000000".chars()).take(9).collect();
    Some((second, digits.parse().ok()?))
}

/// Parse a lenient epoch expression: `date time`, `date'T'time` or `date`.
fn parse_epoch(epoch: &str) -> Option<DateTime<Utc>> {
    let epoch = strip_zone(epoch);

    let (date_part, time_part) = match epoch.find([' ', 'T']) {
        Some(idx) => (&epoch[..idx], Some(epoch[idx + 1..].trim())),
        None => (epoch, None),
    };

    let date_fields: Vec<&str> = date_part.split('-').collect();
    if date_fields.len() != 3 {
        return None;
    }
    let date = parse_date_fields(&date_fields)?;

    // A time of day that does not parse falls back to midnight of the date.
    let time = time_part
        .filter(|t| !t.is_empty())
        .and_then(|t| {
            let fields: Vec<&str> = t.split(':').collect();
            if fields.len() > 3 {
                None
            } else {
                parse_time_fields(&fields)
            }
        })
        .unwrap_or(NaiveTime::MIN);

    Some(Utc.from_utc_datetime(&NaiveDateTime::new(date, time)))
}

/// Extract the epoch from a units string such as `"days since 1970-01-01"`.
///
/// Never fails: a units string without `since`, or with an epoch that cannot
/// be read, yields the Unix epoch.
pub fn epoch_from_units(units: &str) -> DateTime<Utc> {
    units
        .rfind("since")
        .and_then(|idx| parse_epoch(units[idx + "since".len()..].trim()))
        .unwrap_or_else(|| {
            tracing::debug!(units, "No readable epoch in units string, using Unix epoch");
            DateTime::<Utc>::UNIX_EPOCH
        })
}

/// Milliseconds per unit for the leading unit word of a units string.
fn unit_millis(units: &str) -> i64 {
    let units = units.trim_start_matches([' ', '\t']);
    if units.starts_with("second") {
        MS_PER_SECOND
    } else if units.starts_with("minute") {
        MS_PER_MINUTE
    } else if units.starts_with("hour") {
        MS_PER_HOUR
    } else if units.starts_with("day") {
        MS_PER_DAY
    } else {
        // Unrecognised unit words (weeks, months, ...) stay in milliseconds.
        1
    }
}

/// Express an instant as an integral count of `units` since the units' epoch.
pub fn format_as_units(instant: DateTime<Utc>, units: &str) -> String {
    let elapsed = (instant - epoch_from_units(units)).num_milliseconds();
    (elapsed / unit_millis(units)).to_string()
}

/// Inverse of [`format_as_units`] for numeric coordinate values. `None` when
/// the value is not finite or lands outside the representable range.
pub fn instant_from_units(value: f64, units: &str) -> Option<DateTime<Utc>> {
    let millis = value * unit_millis(units) as f64;
    if !millis.is_finite() || millis.abs() >= i64::MAX as f64 {
        return None;
    }
    epoch_from_units(units).checked_add_signed(Duration::try_milliseconds(millis as i64)?)
}

/// Format an instant as a GML time position.
pub fn format_gml_time(instant: DateTime<Utc>) -> String {
    instant.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}
