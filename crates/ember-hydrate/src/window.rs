//! The delta windower — computes the effective time range a run fetches.
//!
//! Full runs look back one year with no lower bound. Delta runs keep the
//! same cutoff and add the handle's high-water mark as a lower bound; they
//! also exclude the current day's records before persisting (the day is
//! still in progress) and reset the high-water mark to start-of-day on
//! success, so the next delta run re-fetches and re-dedupes today.

use chrono::{DateTime, Duration, NaiveTime, Utc};

/// One year, the fixed lookback limit for the heatmap.
pub const LOOKBACK_DAYS: i64 = 365;

/// The time range passed to the record fetcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchWindow {
  /// Oldest instant to include. A record older than this halts pagination
  /// for its collection entirely.
  pub cutoff:      DateTime<Utc>,
  /// Earliest instant to include on delta runs. Older records are excluded
  /// from the result but do not halt pagination.
  pub lower_bound: Option<DateTime<Utc>>,
}

impl FetchWindow {
  /// Compute the window for a run starting at `now`.
  ///
  /// `high_water` is the handle's `updated_at` mark; it is only consulted
  /// for delta runs.
  pub fn compute(now: DateTime<Utc>, high_water: DateTime<Utc>, delta: bool) -> Self {
    Self {
      cutoff:      now - Duration::days(LOOKBACK_DAYS),
      lower_bound: delta.then_some(high_water),
    }
  }
}

/// Midnight UTC of the day containing `now`.
pub fn start_of_day(now: DateTime<Utc>) -> DateTime<Utc> {
  now.date_naive().and_time(NaiveTime::MIN).and_utc()
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::TimeZone;

  fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
  }

  #[test]
  fn full_run_has_no_lower_bound() {
    let now = at(2026, 6, 15, 10);
    let w = FetchWindow::compute(now, at(2026, 6, 1, 0), false);
    assert_eq!(w.cutoff, now - Duration::days(365));
    assert!(w.lower_bound.is_none());
  }

  #[test]
  fn delta_run_bounds_at_high_water() {
    let now = at(2026, 6, 15, 10);
    let mark = at(2026, 6, 1, 0);
    let w = FetchWindow::compute(now, mark, true);
    assert_eq!(w.cutoff, now - Duration::days(365));
    assert_eq!(w.lower_bound, Some(mark));
  }

  #[test]
  fn start_of_day_is_midnight_utc() {
    assert_eq!(start_of_day(at(2026, 6, 15, 23)), at(2026, 6, 15, 0));
    assert_eq!(start_of_day(at(2026, 6, 15, 0)), at(2026, 6, 15, 0));
  }
}
