//! Conversions from external infrastructure errors into domain errors.

use r2d2::Error as PoolError;
use rusqlite::Error as SqlError;
use timeforge_domain::TimeForgeError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub TimeForgeError);

impl From<InfraError> for TimeForgeError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<TimeForgeError> for InfraError {
    fn from(value: TimeForgeError) -> Self {
        InfraError(value)
    }
}

/// Extension trait to make the conversion logic explicit in tests and within
/// this module.
trait IntoTimeForgeError {
    fn into_timeforge(self) -> TimeForgeError;
}

/* -------------------------------------------------------------------------- */
/* rusqlite::Error → TimeForgeError */
/* -------------------------------------------------------------------------- */

impl IntoTimeForgeError for SqlError {
    fn into_timeforge(self) -> TimeForgeError {
        use rusqlite::ffi::ErrorCode;
        use rusqlite::Error as RE;

        match self {
            RE::SqliteFailure(err, maybe_message) => {
                let message = maybe_message.unwrap_or_default();
                match (err.code, err.extended_code) {
                    (ErrorCode::DatabaseBusy, _) => {
                        TimeForgeError::Database("database is busy".into())
                    }
                    (ErrorCode::DatabaseLocked, _) => {
                        TimeForgeError::Database("database is locked".into())
                    }
                    (ErrorCode::ConstraintViolation, 2067) => {
                        TimeForgeError::Database("unique constraint violation".into())
                    }
                    (ErrorCode::ConstraintViolation, 787) => {
                        TimeForgeError::Database("foreign key constraint violation".into())
                    }
                    _ => TimeForgeError::Database(format!(
                        "sqlite failure {:?} (code {}): {}",
                        err.code, err.extended_code, message
                    )),
                }
            }
            RE::QueryReturnedNoRows => TimeForgeError::NotFound("no rows returned by query".into()),
            RE::FromSqlConversionFailure(_, _, cause) => {
                TimeForgeError::Database(format!("failed to convert sqlite value: {cause}"))
            }
            RE::InvalidColumnType(_, _, ty) => {
                TimeForgeError::Database(format!("invalid column type: {ty}"))
            }
            RE::Utf8Error(_) => {
                TimeForgeError::Database("invalid UTF-8 returned from sqlite".into())
            }
            RE::InvalidParameterName(parameter_name) => {
                TimeForgeError::Database(format!("invalid parameter name: {parameter_name}"))
            }
            RE::InvalidPath(path) => TimeForgeError::Database(format!(
                "invalid database path: {}",
                path.to_string_lossy()
            )),
            RE::InvalidQuery => TimeForgeError::Database("invalid SQL query".into()),
            other => TimeForgeError::Database(other.to_string()),
        }
    }
}

impl From<SqlError> for InfraError {
    fn from(value: SqlError) -> Self {
        InfraError(value.into_timeforge())
    }
}

/* -------------------------------------------------------------------------- */
/* r2d2::Error → TimeForgeError */
/* -------------------------------------------------------------------------- */

impl IntoTimeForgeError for PoolError {
    fn into_timeforge(self) -> TimeForgeError {
        TimeForgeError::Database(format!("connection pool error: {self}"))
    }
}

impl From<PoolError> for InfraError {
    fn from(value: PoolError) -> Self {
        InfraError(value.into_timeforge())
    }
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */
