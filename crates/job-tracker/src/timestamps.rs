//! Timestamp parsing shared by storage, CSV intake, the CLI and HTTP handlers.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer};

/// Format used for every timestamp written to SQLite.
pub const STORAGE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const ACCEPTED_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
];

/// Parse RFC 3339, `YYYY-MM-DD[ T]HH:MM:SS[.fff]`, `YYYY-MM-DD` or `MM/DD/YYYY`.
/// Date-only values resolve to midnight.
pub fn parse_timestamp(raw: &str) -> Result<NaiveDateTime, String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err("timestamp is empty".to_string());
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.naive_utc());
    }

    for format in ACCEPTED_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(dt);
        }
    }

    ["%Y-%m-%d", "%m/%d/%Y"]
        .into_iter()
        .find_map(|format| NaiveDate::parse_from_str(trimmed, format).ok())
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .ok_or_else(|| format!("failed to parse '{raw}' as a date or timestamp"))
}

pub fn format_timestamp(value: NaiveDateTime) -> String {
    value.format(STORAGE_FORMAT).to_string()
}

pub fn deserialize_optional_timestamp<'de, D>(
    deserializer: D,
) -> Result<Option<NaiveDateTime>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    opt.filter(|value| !value.trim().is_empty())
        .map(|value| parse_timestamp(&value).map_err(serde::de::Error::custom))
        .transpose()
}
