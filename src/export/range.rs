use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use thiserror::Error;

/// Accepted layouts for `--start` / `--stop`, all read as UTC.
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"];
const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RangeError {
    #[error("invalid date '{0}': expected YYYY-MM-DD, YYYY-MM-DDTHH:MM:SS or 'YYYY-MM-DD HH:MM:SS'")]
    BadFormat(String),

    #[error("date '{0}' is in the future")]
    InFuture(String),

    #[error("lookback {lookback} reaches before the earliest supported date (stop {stop})")]
    LookbackTooLarge {
        lookback: Duration,
        stop: DateTime<Utc>,
    },

    #[error("start {start} must be before stop {stop}")]
    Empty {
        start: DateTime<Utc>,
        stop: DateTime<Utc>,
    },
}

/// Requested export bounds as given by the operator; either may be omitted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportRange {
    pub start: Option<String>,
    pub stop: Option<String>,
}

impl ExportRange {
    pub fn new(start: Option<String>, stop: Option<String>) -> Self {
        Self { start, stop }
    }
}

pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, RangeError> {
    let value = value.trim();

    for format in DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| RangeError::BadFormat(value.to_string()))
}

/// Turn the operator's bounds into a concrete `[start, stop)`.
///
/// A missing stop means `now`; a missing start means `stop - lookback`.
/// Supplied dates may not lie after `now`.
pub fn resolve_range(
    range: &ExportRange,
    lookback: Duration,
    now: DateTime<Utc>,
) -> Result<(DateTime<Utc>, DateTime<Utc>), RangeError> {
    let parse_past = |value: &str| -> Result<DateTime<Utc>, RangeError> {
        let parsed = parse_timestamp(value)?;
        if parsed > now {
            return Err(RangeError::InFuture(value.to_string()));
        }
        Ok(parsed)
    };

    let stop = match &range.stop {
        Some(value) => parse_past(value)?,
        None => now,
    };
    let start = match &range.start {
        Some(value) => parse_past(value)?,
        None => stop
            .checked_sub_signed(lookback)
            .ok_or(RangeError::LookbackTooLarge { lookback, stop })?,
    };

    if start >= stop {
        return Err(RangeError::Empty { start, stop });
    }

    Ok((start, stop))
}
