use chrono::{DateTime, Duration, Utc};
use std::fmt;
use thiserror::Error;

/// Timestamp layout used for the remote query bounds and for artifact keys.
pub const WINDOW_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WindowError {
    #[error("invalid range: start {start} is not before stop {stop}")]
    InvalidRange {
        start: DateTime<Utc>,
        stop: DateTime<Utc>,
    },

    #[error("window increment must be positive")]
    InvalidIncrement,
}

/// Half-open time interval `[start, stop)` queried as one remote job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimeWindow {
    start: DateTime<Utc>,
    stop: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, stop: DateTime<Utc>) -> Result<Self, WindowError> {
        if start >= stop {
            return Err(WindowError::InvalidRange { start, stop });
        }
        Ok(Self { start, stop })
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn stop(&self) -> DateTime<Utc> {
        self.stop
    }

    pub fn duration(&self) -> Duration {
        self.stop - self.start
    }

    /// Start bound formatted for the remote API (no zone suffix).
    pub fn start_param(&self) -> String {
        self.start.format(WINDOW_TIME_FORMAT).to_string()
    }

    /// Stop bound formatted for the remote API (no zone suffix).
    pub fn stop_param(&self) -> String {
        self.stop.format(WINDOW_TIME_FORMAT).to_string()
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start_param(), self.stop_param())
    }
}

/// Split `[start, stop)` into contiguous windows of `increment`.
///
/// The last window is clipped at `stop`, so it may be shorter than the others.
pub fn partition(
    start: DateTime<Utc>,
    stop: DateTime<Utc>,
    increment: Duration,
) -> Result<Vec<TimeWindow>, WindowError> {
    if start >= stop {
        return Err(WindowError::InvalidRange { start, stop });
    }
    if increment <= Duration::zero() {
        return Err(WindowError::InvalidIncrement);
    }

    let mut windows = Vec::new();
    let mut cursor = start;
    while cursor < stop {
        // An increment reaching past chrono's range still ends at `stop`
        let next = cursor
            .checked_add_signed(increment)
            .map_or(stop, |next| next.min(stop));
        windows.push(TimeWindow {
            start: cursor,
            stop: next,
        });
        cursor = next;
    }

    Ok(windows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2020, 1, 1, h, m, s).unwrap()
    }

    #[test]
    fn test_ten_minutes_by_five_gives_two_windows() {
        let windows = partition(ts(0, 0, 0), ts(0, 10, 0), Duration::minutes(5)).unwrap();

        assert_eq!(windows.len(), 2);
        assert_eq!(windows[0].start(), ts(0, 0, 0));
        assert_eq!(windows[0].stop(), ts(0, 5, 0));
        assert_eq!(windows[1].start(), ts(0, 5, 0));
        assert_eq!(windows[1].stop(), ts(0, 10, 0));
    }

    #[test]
    fn test_last_window_is_clipped() {
        let windows = partition(ts(0, 0, 0), ts(0, 12, 30), Duration::minutes(5)).unwrap();

        assert_eq!(windows.len(), 3);
        assert_eq!(windows[2].start(), ts(0, 10, 0));
        assert_eq!(windows[2].stop(), ts(0, 12, 30));
        assert_eq!(windows[2].duration(), Duration::seconds(150));
    }

    #[test]
    fn test_windows_cover_range_without_gaps() {
        let start = ts(1, 0, 0);
        let stop = ts(9, 17, 43);
        let increment = Duration::minutes(7);
        let windows = partition(start, stop, increment).unwrap();

        let span = (stop - start).num_seconds();
        let step = increment.num_seconds();
        let expected = (span + step - 1) / step;
        assert_eq!(windows.len() as i64, expected);

        assert_eq!(windows.first().unwrap().start(), start);
        assert_eq!(windows.last().unwrap().stop(), stop);
        for pair in windows.windows(2) {
            assert_eq!(pair[0].stop(), pair[1].start());
        }
        for window in &windows[..windows.len() - 1] {
            assert_eq!(window.duration(), increment);
        }
    }

    #[test]
    fn test_increment_larger_than_range() {
        let windows = partition(ts(0, 0, 0), ts(0, 1, 0), Duration::hours(1)).unwrap();
        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].stop(), ts(0, 1, 0));
    }

    #[test]
    fn test_huge_increment_yields_single_window() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let stop = start + Duration::hours(1);

        let windows = partition(start, stop, Duration::days(100_000_000)).unwrap();
        assert_eq!(windows, vec![TimeWindow::new(start, stop).unwrap()]);
    }

    #[test]
    fn test_start_not_before_stop_is_rejected() {
        let err = partition(ts(0, 10, 0), ts(0, 10, 0), Duration::minutes(5)).unwrap_err();
        assert!(matches!(err, WindowError::InvalidRange { .. }));

        let err = partition(ts(0, 10, 0), ts(0, 5, 0), Duration::minutes(5)).unwrap_err();
        assert!(matches!(err, WindowError::InvalidRange { .. }));
    }

    #[test]
    fn test_zero_increment_is_rejected() {
        let err = partition(ts(0, 0, 0), ts(0, 5, 0), Duration::zero()).unwrap_err();
        assert_eq!(err, WindowError::InvalidIncrement);
    }

    #[test]
    fn test_query_params_have_no_zone_suffix() {
        let window = TimeWindow::new(ts(0, 0, 0), ts(0, 5, 0)).unwrap();
        assert_eq!(window.start_param(), "2020-01-01T00:00:00");
        assert_eq!(window.stop_param(), "2020-01-01T00:05:00");
        assert_eq!(window.to_string(), "[2020-01-01T00:00:00, 2020-01-01T00:05:00)");
    }
}
