//! Date-window generation for incremental extraction
//!
//! The extraction API bounds how much time a single query may cover, so a
//! replication range is split into successive windows of at most
//! `max_fetch_interval_hours` each. Windows are contiguous, never overlap,
//! and never extend past the run's fixed cutoff; the final window is
//! truncated so its end lands exactly on the cutoff.

use crate::error::{Error, Result};
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};

// ============================================================================
// Date Window
// ============================================================================

/// One half-open time range `[start, end)` fetched in a single
/// fetch-and-paginate cycle.
///
/// Ephemeral: derived fresh each run from state + config, never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    /// Inclusive lower bound
    pub start: DateTime<Utc>,
    /// Exclusive upper bound
    pub end: DateTime<Utc>,
}

impl DateWindow {
    /// Length of the window
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}

// ============================================================================
// Window Generator
// ============================================================================

/// Iterator over the windows covering `[start, cutoff)`.
///
/// The cursor advances to each window's end as it is produced; iteration
/// stops once the cursor reaches the cutoff. A range that is already
/// exhausted (`start >= cutoff`) yields no windows at all.
#[derive(Debug, Clone)]
pub struct DateWindows {
    cursor: DateTime<Utc>,
    cutoff: DateTime<Utc>,
    step: Duration,
}

impl DateWindows {
    /// Create a generator over `[start, cutoff)` stepping by
    /// `window_size_hours`.
    ///
    /// Rejects zero, negative, and non-finite window sizes with a
    /// configuration error: such a step would never advance the cursor and
    /// the loop would not terminate.
    pub fn new(
        start: DateTime<Utc>,
        cutoff: DateTime<Utc>,
        window_size_hours: f64,
    ) -> Result<Self> {
        let step = step_from_hours(window_size_hours)?;
        Ok(Self {
            cursor: start,
            cutoff,
            step,
        })
    }

    /// The fixed upper bound no window extends past
    pub fn cutoff(&self) -> DateTime<Utc> {
        self.cutoff
    }
}

impl Iterator for DateWindows {
    type Item = DateWindow;

    fn next(&mut self) -> Option<DateWindow> {
        if self.cursor >= self.cutoff {
            return None;
        }

        let next = self.cursor + self.step;
        let end = if next > self.cutoff { self.cutoff } else { next };

        let window = DateWindow {
            start: self.cursor,
            end,
        };
        self.cursor = end;

        Some(window)
    }
}

/// Convert a window size in (possibly fractional) hours into a step duration.
///
/// Sub-millisecond sizes round to a zero step and are rejected along with
/// zero, negative, and non-finite values.
pub fn step_from_hours(hours: f64) -> Result<Duration> {
    if !hours.is_finite() || hours <= 0.0 {
        return Err(Error::invalid_value(
            "max_fetch_interval_hours",
            format!("must be a positive number of hours, got {hours}"),
        ));
    }

    let millis = (hours * 3_600_000.0).round() as i64;
    let step = Duration::milliseconds(millis);
    if step <= Duration::zero() {
        return Err(Error::invalid_value(
            "max_fetch_interval_hours",
            format!("{hours} hours rounds below one millisecond"),
        ));
    }

    Ok(step)
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Parse a datetime string into UTC DateTime
///
/// Accepts RFC 3339 (with any offset) plus the common date and date-time
/// layouts configs tend to carry.
pub fn parse_datetime(s: &str) -> Result<DateTime<Utc>> {
    // Try RFC 3339 first
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    // Try common formats
    let formats = [
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d",
        "%Y/%m/%d",
    ];

    for fmt in formats {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(DateTime::from_naive_utc_and_offset(ndt, Utc));
        }
        if let Ok(nd) = NaiveDate::parse_from_str(s, fmt) {
            let ndt = nd.and_hms_opt(0, 0, 0).unwrap();
            return Ok(DateTime::from_naive_utc_and_offset(ndt, Utc));
        }
    }

    Err(Error::config(format!("Invalid datetime format: {s}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn dt(s: &str) -> DateTime<Utc> {
        parse_datetime(s).unwrap()
    }

    #[test_case(1.0, 24 ; "one hour windows")]
    #[test_case(0.5, 48 ; "half hour windows")]
    #[test_case(6.0, 4 ; "six hour windows")]
    #[test_case(5.0, 5 ; "five hour windows with truncated tail")]
    #[test_case(24.0, 1 ; "single window covering range")]
    #[test_case(48.0, 1 ; "oversized window truncated to range")]
    fn test_window_count_over_one_day(hours: f64, expected: usize) {
        let start = dt("2022-03-15T00:00:00Z");
        let cutoff = dt("2022-03-16T00:00:00Z");
        let windows: Vec<_> = DateWindows::new(start, cutoff, hours).unwrap().collect();
        assert_eq!(windows.len(), expected);
        assert_eq!(windows[0].start, start);
        assert_eq!(windows[windows.len() - 1].end, cutoff);
    }

    #[test]
    fn test_windows_are_contiguous_and_cover_range() {
        let start = dt("2022-03-15T00:00:02+00:00");
        let cutoff = dt("2022-03-16T00:00:02+00:00");
        let windows: Vec<_> = DateWindows::new(start, cutoff, 1.0).unwrap().collect();

        assert_eq!(windows.len(), 24);
        for window in &windows {
            assert_eq!(window.duration(), Duration::hours(1));
        }
        for pair in windows.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
        }
        assert_eq!(windows[0].start, start);
        assert_eq!(windows[23].end, cutoff);
    }

    #[test]
    fn test_final_window_truncated_to_cutoff() {
        let start = dt("2022-03-15T00:00:00Z");
        let cutoff = dt("2022-03-15T01:30:00Z");
        let windows: Vec<_> = DateWindows::new(start, cutoff, 1.0).unwrap().collect();

        assert_eq!(windows.len(), 2);
        assert_eq!(windows[0].duration(), Duration::hours(1));
        assert_eq!(windows[1].duration(), Duration::minutes(30));
        assert_eq!(windows[1].end, cutoff);
    }

    #[test]
    fn test_exhausted_range_yields_no_windows() {
        let t = dt("2022-03-15T00:00:00Z");
        assert_eq!(DateWindows::new(t, t, 1.0).unwrap().count(), 0);

        let later = dt("2022-03-16T00:00:00Z");
        assert_eq!(DateWindows::new(later, t, 1.0).unwrap().count(), 0);
    }

    #[test_case(0.0 ; "zero")]
    #[test_case(-1.0 ; "negative")]
    #[test_case(f64::NAN ; "nan")]
    #[test_case(f64::INFINITY ; "infinite")]
    #[test_case(1e-9 ; "rounds below a millisecond")]
    fn test_invalid_window_size_rejected(hours: f64) {
        let start = dt("2022-03-15T00:00:00Z");
        let cutoff = dt("2022-03-16T00:00:00Z");
        let err = DateWindows::new(start, cutoff, hours).unwrap_err();
        assert!(matches!(err, Error::InvalidConfigValue { .. }));
    }

    #[test]
    fn test_resume_from_committed_cursor_skips_earlier_windows() {
        let start = dt("2022-03-15T00:00:00Z");
        let cutoff = dt("2022-03-16T00:00:00Z");
        let all: Vec<_> = DateWindows::new(start, cutoff, 1.0).unwrap().collect();

        // Re-running from the end of window 9 must reproduce only the tail.
        let committed = all[9].end;
        let resumed: Vec<_> = DateWindows::new(committed, cutoff, 1.0).unwrap().collect();
        assert_eq!(resumed.as_slice(), &all[10..]);
    }

    #[test]
    fn test_fractional_hours_step() {
        let start = dt("2022-03-15T00:00:00Z");
        let cutoff = dt("2022-03-15T01:00:00Z");
        let windows: Vec<_> = DateWindows::new(start, cutoff, 0.25).unwrap().collect();

        assert_eq!(windows.len(), 4);
        assert_eq!(windows[0].duration(), Duration::minutes(15));
    }

    #[test]
    fn test_parse_datetime_formats() {
        assert_eq!(
            parse_datetime("2022-03-15T12:30:00+02:00").unwrap(),
            dt("2022-03-15T10:30:00Z")
        );
        assert_eq!(
            parse_datetime("2022-03-15T12:30:00Z").unwrap(),
            dt("2022-03-15T12:30:00+00:00")
        );
        assert_eq!(
            parse_datetime("2022-03-15").unwrap(),
            dt("2022-03-15T00:00:00Z")
        );
        assert_eq!(
            parse_datetime("2022-03-15 06:00:00").unwrap(),
            dt("2022-03-15T06:00:00Z")
        );
        assert!(parse_datetime("not a date").is_err());
        assert!(parse_datetime("").is_err());
    }
}
