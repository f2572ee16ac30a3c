//! Timestamp utilities
//!
//! Rehearsals are keyed by calendar day: every incoming date is converted to
//! UTC and truncated to midnight before it is stored or used in a lookup.

use chrono::{DateTime, Duration, NaiveDate, SecondsFormat, TimeZone, Utc};

use crate::{Error, Result};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Truncate a timestamp to midnight UTC of the same UTC calendar day
pub fn normalize_date(date: DateTime<Utc>) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.date_naive().and_time(chrono::NaiveTime::MIN))
}

/// Half-open window `[start, start + 1 day)` for a normalized date
pub fn day_window(normalized: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    (normalized, normalized + Duration::days(1))
}

/// Parse a client-supplied date
///
/// Accepts RFC 3339 timestamps with any offset, or a bare `YYYY-MM-DD`
/// (interpreted as midnight UTC).
pub fn parse_date(input: &str) -> Result<DateTime<Utc>> {
    let input = input.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(day) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        return Ok(Utc.from_utc_datetime(&day.and_time(chrono::NaiveTime::MIN)));
    }
    Err(Error::Validation(format!("Invalid date: {}", input)))
}

/// Fixed-width storage form; lexical order equals chronological order
pub fn to_db_string(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse a timestamp column written by [`to_db_string`]
pub fn from_db_string(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Internal(format!("Failed to parse stored timestamp '{}': {}", s, e)))
}

/// Serde adapter writing timestamps in the storage form
pub mod serde_millis {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(dt: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&super::to_db_string(*dt))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(d)?;
        super::parse_date(&raw).map_err(serde::de::Error::custom)
    }
}
