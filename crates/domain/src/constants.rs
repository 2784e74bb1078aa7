//! Domain constants shared across the engine

/// Length of one accounting slot on the time grid, in minutes.
pub const SLOT_INTERVAL_MINUTES: u32 = 10;

/// Length of one accounting slot on the time grid, in seconds.
pub const SLOT_INTERVAL_SECONDS: i64 = 600;

/// Maximum duration a single slot row may carry after consolidation.
///
/// A 10-minute grid cell cannot account for more than 600 seconds of
/// work, regardless of how many observations landed in it.
pub const MAX_SLOT_DURATION_SECONDS: i64 = 600;

/// Upper bound on the date axis produced for daily report charts.
pub const MAX_REPORT_WINDOW_DAYS: i64 = 31;

/// Date axis length for weekly report views.
pub const WEEKLY_REPORT_WINDOW_DAYS: i64 = 7;

/// Rejection message for manual entries with an invalid or disallowed
/// date range. Kept user-facing and specific since this is the most
/// common validation failure.
pub const INVALID_DATE_RANGE_MESSAGE: &str =
    "Please select a valid date, start time and end time";
