//! Next traffic-reset calculation.
//!
//! Panels reset counters on calendar boundaries in their own local time, so
//! the arithmetic runs on wall-clock time in a caller-supplied zone.

use chrono::{DateTime, Datelike, LocalResult, NaiveDate, NaiveDateTime, TimeDelta, TimeZone, Utc};

use panelsync_panel::ResetInterval;

/// Next reset instant after `last_reset_ms` (ms since epoch).
///
/// `None` for [`ResetInterval::Never`] or when no reset has happened yet
/// (`last_reset_ms == 0`). Monthly resets keep the day of month, clamped to
/// the last day of the target month.
pub fn next_reset<Tz: TimeZone>(
    last_reset_ms: i64,
    interval: ResetInterval,
    tz: &Tz,
) -> Option<DateTime<Utc>> {
    if last_reset_ms <= 0 {
        return None;
    }
    let last = tz.timestamp_millis_opt(last_reset_ms).single()?.naive_local();
    let next = match interval {
        ResetInterval::Never => return None,
        ResetInterval::Daily => last + TimeDelta::days(1),
        ResetInterval::Weekly => last + TimeDelta::days(7),
        ResetInterval::Monthly => add_month(last)?,
    };
    Some(resolve_local(tz, next)?.with_timezone(&Utc))
}

fn add_month(at: NaiveDateTime) -> Option<NaiveDateTime> {
    let (year, month) = if at.month() == 12 {
        (at.year() + 1, 1)
    } else {
        (at.year(), at.month() + 1)
    };
    let day = at.day().min(days_in_month(year, month));
    Some(NaiveDate::from_ymd_opt(year, month, day)?.and_time(at.time()))
}

fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|d| d.pred_opt())
        .map_or(28, |d| d.day())
}

/// Map wall-clock time back to an instant; times skipped by a DST jump
/// move forward by the size of the gap.
fn resolve_local<Tz: TimeZone>(tz: &Tz, local: NaiveDateTime) -> Option<DateTime<Tz>> {
    match tz.from_local_datetime(&local) {
        LocalResult::Single(t) => Some(t),
        LocalResult::Ambiguous(earliest, _) => Some(earliest),
        LocalResult::None => tz.from_local_datetime(&(local + TimeDelta::hours(1))).earliest(),
    }
}
