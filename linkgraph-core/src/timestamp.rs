//! Observation-time normalization.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};

use crate::error::{CoreError, Result};
use crate::types::SourceFields;

/// Layouts accepted for timestamps that carry no offset; these are read as UTC.
const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Normalize a timestamp to whole-second precision with a `Z` designator.
///
/// `2021-05-01T10:00:00.123Z` becomes `2021-05-01T10:00:00Z`. The fraction is
/// truncated, never rounded. Offsets other than UTC are converted.
pub fn normalize(value: &str) -> Result<String> {
    let parsed = parse(value).ok_or_else(|| CoreError::InvalidTimestamp {
        value: value.to_string(),
    })?;
    Ok(parsed.to_rfc3339_opts(SecondsFormat::Secs, true))
}

fn parse(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Best available observation time: `last-seen`, then `first-seen`, else none.
pub fn seen_at(fields: &SourceFields) -> Result<Option<String>> {
    [&fields.last_seen, &fields.first_seen]
        .into_iter()
        .flatten()
        .find(|value| !value.is_empty())
        .map(|value| normalize(value))
        .transpose()
}
