//! SQLite persistence layer
//!
//! Repositories run all rusqlite work on the tokio blocking pool and
//! convert storage errors into domain errors at the boundary.

mod activity_repository;
mod employee_repository;
mod manager;
mod time_log_repository;
mod time_slot_repository;

pub use activity_repository::SqliteActivityRepository;
pub use employee_repository::SqliteEmployeeRepository;
pub use manager::DbManager;
pub use time_log_repository::SqliteTimeLogRepository;
pub use time_slot_repository::SqliteTimeSlotRepository;

use chrono::{DateTime, Utc};
use timeforge_domain::TimeForgeError;

use crate::errors::InfraError;

pub(crate) fn map_sql_error(err: rusqlite::Error) -> TimeForgeError {
    TimeForgeError::from(InfraError::from(err))
}

pub(crate) fn map_join_error(err: tokio::task::JoinError) -> TimeForgeError {
    TimeForgeError::Internal(format!("blocking database task failed: {err}"))
}

/// Read a unix-seconds column back into a UTC timestamp.
pub(crate) fn datetime_from_unix(index: usize, value: i64) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::from_timestamp(value, 0).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            index,
            rusqlite::types::Type::Integer,
            format!("timestamp {value} out of range").into(),
        )
    })
}

/// Comma-separated `?` placeholders for an IN clause of `len` values.
pub(crate) fn sql_placeholders(len: usize) -> String {
    let mut placeholders = String::new();
    for i in 0..len {
        if i > 0 {
            placeholders.push(',');
        }
        placeholders.push('?');
    }
    placeholders
}
