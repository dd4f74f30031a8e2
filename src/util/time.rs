//! Timezone-aware date helpers
//!
//! The timezone comes from `StacConfig::tz()`; nothing here reads the
//! environment.

use crate::error::{Result, StacError};
use chrono::{DateTime, FixedOffset, LocalResult, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d", "%B %d, %Y", "%b %d, %Y"];

/// Parse a date or datetime, applying `tz` when the input has no offset
pub fn parse_date_for_tz(value: &str, tz: Tz) -> Result<DateTime<FixedOffset>> {
    let value = value.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt);
    }
    if let Ok(dt) = DateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%z") {
        return Ok(dt);
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(value) {
        return Ok(dt);
    }

    let naive = DATETIME_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(value, f).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|f| NaiveDate::parse_from_str(value, f).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
        .ok_or_else(|| StacError::Parse(format!("Unrecognized date '{}'", value)))?;

    localize(naive, tz)
        .map(|dt| dt.fixed_offset())
        .ok_or_else(|| StacError::Parse(format!("'{}' does not exist in {}", value, tz)))
}

/// Midnight today in `tz`
pub fn today_tz(tz: Tz) -> DateTime<Tz> {
    let now = now_tz(tz);
    now.date_naive()
        .and_hms_opt(0, 0, 0)
        .and_then(|midnight| localize(midnight, tz))
        .unwrap_or(now)
}

/// The current time in `tz`
pub fn now_tz(tz: Tz) -> DateTime<Tz> {
    Utc::now().with_timezone(&tz)
}

fn localize(naive: NaiveDateTime, tz: Tz) -> Option<DateTime<Tz>> {
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => Some(dt),
        LocalResult::Ambiguous(earliest, _) => Some(earliest),
        LocalResult::None => None,
    }
}
