//! Time-grid helpers shared by slot generation, merging, and reports.

use chrono::{DateTime, Duration, NaiveDate, Timelike, Utc};

use crate::constants::SLOT_INTERVAL_MINUTES;

/// Strip sub-second precision, keeping UTC.
pub fn strip_subseconds(ts: DateTime<Utc>) -> DateTime<Utc> {
    ts.with_nanosecond(0).unwrap_or(ts)
}

/// Snap a timestamp backward to the enclosing 10-minute grid cell.
///
/// `09:03:27.5` becomes `09:00:00`.
pub fn floor_to_slot(ts: DateTime<Utc>) -> DateTime<Utc> {
    let ts = strip_subseconds(ts);
    let excess_minutes = ts.minute() % SLOT_INTERVAL_MINUTES;
    let excess = Duration::minutes(i64::from(excess_minutes)) + Duration::seconds(i64::from(ts.second()));
    ts - excess
}

/// Every calendar day in `[start, end]` (UTC dates), capped to
/// `max_days` entries so chart consumers get a bounded axis.
pub fn days_between(start: DateTime<Utc>, end: DateTime<Utc>, max_days: i64) -> Vec<NaiveDate> {
    let mut days = Vec::new();
    if end < start || max_days <= 0 {
        return days;
    }

    let mut day = start.date_naive();
    let last = end.date_naive();
    while day <= last && (days.len() as i64) < max_days {
        days.push(day);
        day = match day.succ_opt() {
            Some(next) => next,
            None => break,
        };
    }
    days
}
