//! Time log repository implementation using SQLite
//!
//! Conflict adjustments are applied together with the triggering write
//! in one IMMEDIATE transaction, so a crash mid-resolution never leaves
//! a partially adjusted timeline.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Row, Transaction, TransactionBehavior};
use timeforge_core::timelog::ports::TimeLogRepository as TimeLogRepositoryPort;
use timeforge_core::ConflictAdjustment;
use timeforge_domain::{
    ReportFilter, Result as DomainResult, TimeLog, TimeLogSource, TimeLogType, TimeSpan,
};
use tokio::task;

use super::manager::DbManager;
use super::{datetime_from_unix, map_join_error, map_sql_error, sql_placeholders};

const TIME_LOG_COLUMNS: &str = "id, employee_id, organization_id, tenant_id, started_at, \
     stopped_at, duration_seconds, log_type, source, project_id, task_id, \
     organization_contact_id, description, is_billable, is_running, deleted_at, edited_at";

/// SQLite-backed implementation of `TimeLogRepository`
pub struct SqliteTimeLogRepository {
    db: Arc<DbManager>,
}

impl SqliteTimeLogRepository {
    /// Create a new repository instance
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl TimeLogRepositoryPort for SqliteTimeLogRepository {
    async fn find_by_id(&self, id: &str) -> DomainResult<TimeLog> {
        let db = Arc::clone(&self.db);
        let id = id.to_string();

        task::spawn_blocking(move || -> DomainResult<TimeLog> {
            let conn = db.get_connection()?;
            conn.query_row(
                &format!("SELECT {TIME_LOG_COLUMNS} FROM time_logs WHERE id = ?1"),
                params![&id],
                map_time_log_row,
            )
            .map_err(map_sql_error)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn find_conflicting(
        &self,
        employee_id: &str,
        span: TimeSpan,
        exclude_id: Option<&str>,
    ) -> DomainResult<Vec<TimeLog>> {
        let db = Arc::clone(&self.db);
        let employee_id = employee_id.to_string();
        let exclude_id = exclude_id.map(str::to_string);

        task::spawn_blocking(move || -> DomainResult<Vec<TimeLog>> {
            let conn = db.get_connection()?;
            let mut stmt = conn
                .prepare(&format!(
                    "SELECT {TIME_LOG_COLUMNS} FROM time_logs
                     WHERE employee_id = ?1
                       AND deleted_at IS NULL
                       AND stopped_at IS NOT NULL
                       AND started_at < ?2
                       AND stopped_at > ?3
                       AND (?4 IS NULL OR id <> ?4)
                     ORDER BY started_at"
                ))
                .map_err(map_sql_error)?;

            let rows = stmt
                .query_map(
                    params![
                        &employee_id,
                        span.end.timestamp(),
                        span.start.timestamp(),
                        &exclude_id
                    ],
                    map_time_log_row,
                )
                .map_err(map_sql_error)?;

            rows.collect::<rusqlite::Result<Vec<_>>>().map_err(map_sql_error)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn find_running(&self, employee_id: &str) -> DomainResult<Option<TimeLog>> {
        let db = Arc::clone(&self.db);
        let employee_id = employee_id.to_string();

        task::spawn_blocking(move || -> DomainResult<Option<TimeLog>> {
            let conn = db.get_connection()?;
            let result = conn.query_row(
                &format!(
                    "SELECT {TIME_LOG_COLUMNS} FROM time_logs
                     WHERE employee_id = ?1 AND is_running = 1 AND deleted_at IS NULL
                     ORDER BY started_at DESC LIMIT 1"
                ),
                params![&employee_id],
                map_time_log_row,
            );

            match result {
                Ok(log) => Ok(Some(log)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(err) => Err(map_sql_error(err)),
            }
        })
        .await
        .map_err(map_join_error)?
    }

    async fn find_for_report(&self, filter: &ReportFilter) -> DomainResult<Vec<TimeLog>> {
        let db = Arc::clone(&self.db);
        let (sql, params) = build_report_query(filter);

        task::spawn_blocking(move || -> DomainResult<Vec<TimeLog>> {
            let conn = db.get_connection()?;
            let mut stmt = conn.prepare(&sql).map_err(map_sql_error)?;
            let rows =
                stmt.query_map(params_from_iter(params), map_time_log_row).map_err(map_sql_error)?;
            rows.collect::<rusqlite::Result<Vec<_>>>().map_err(map_sql_error)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn insert_resolved(
        &self,
        log: &TimeLog,
        adjustments: &[ConflictAdjustment],
    ) -> DomainResult<()> {
        let db = Arc::clone(&self.db);
        let log = log.clone();
        let adjustments = adjustments.to_vec();

        task::spawn_blocking(move || -> DomainResult<()> {
            let mut conn = db.get_connection()?;
            let tx = conn
                .transaction_with_behavior(TransactionBehavior::Immediate)
                .map_err(map_sql_error)?;
            insert_time_log(&tx, &log).map_err(map_sql_error)?;
            apply_adjustments(&tx, &adjustments).map_err(map_sql_error)?;
            tx.commit().map_err(map_sql_error)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn update_resolved(
        &self,
        log: &TimeLog,
        adjustments: &[ConflictAdjustment],
    ) -> DomainResult<()> {
        let db = Arc::clone(&self.db);
        let log = log.clone();
        let adjustments = adjustments.to_vec();

        task::spawn_blocking(move || -> DomainResult<()> {
            let mut conn = db.get_connection()?;
            let tx = conn
                .transaction_with_behavior(TransactionBehavior::Immediate)
                .map_err(map_sql_error)?;
            update_time_log(&tx, &log).map_err(map_sql_error)?;
            apply_adjustments(&tx, &adjustments).map_err(map_sql_error)?;
            tx.commit().map_err(map_sql_error)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn delete(&self, ids: &[String], force: bool) -> DomainResult<usize> {
        if ids.is_empty() {
            return Ok(0);
        }

        let db = Arc::clone(&self.db);
        let ids = ids.to_vec();

        task::spawn_blocking(move || -> DomainResult<usize> {
            let conn = db.get_connection()?;
            let placeholders = sql_placeholders(ids.len());

            let affected = if force {
                conn.execute(
                    &format!("DELETE FROM time_logs WHERE id IN ({placeholders})"),
                    params_from_iter(ids.iter()),
                )
                .map_err(map_sql_error)?
            } else {
                let now = Utc::now().timestamp();
                let mut params: Vec<Value> = vec![Value::Integer(now)];
                params.extend(ids.iter().map(|id| Value::Text(id.clone())));
                conn.execute(
                    &format!(
                        "UPDATE time_logs SET deleted_at = ?1
                         WHERE deleted_at IS NULL AND id IN ({placeholders})"
                    ),
                    params_from_iter(params),
                )
                .map_err(map_sql_error)?
            };

            Ok(affected)
        })
        .await
        .map_err(map_join_error)?
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Map a row to a TimeLog
fn map_time_log_row(row: &Row) -> rusqlite::Result<TimeLog> {
    let log_type: String = row.get(7)?;
    let source: String = row.get(8)?;

    Ok(TimeLog {
        id: row.get(0)?,
        employee_id: row.get(1)?,
        organization_id: row.get(2)?,
        tenant_id: row.get(3)?,
        started_at: datetime_from_unix(4, row.get(4)?)?,
        stopped_at: row
            .get::<_, Option<i64>>(5)?
            .map(|v| datetime_from_unix(5, v))
            .transpose()?,
        duration_seconds: row.get(6)?,
        log_type: TimeLogType::parse(&log_type).map_err(|err| text_conversion(7, &err))?,
        source: TimeLogSource::parse(&source).map_err(|err| text_conversion(8, &err))?,
        project_id: row.get(9)?,
        task_id: row.get(10)?,
        organization_contact_id: row.get(11)?,
        description: row.get(12)?,
        is_billable: row.get(13)?,
        is_running: row.get(14)?,
        deleted_at: row
            .get::<_, Option<i64>>(15)?
            .map(|v| datetime_from_unix(15, v))
            .transpose()?,
        edited_at: row
            .get::<_, Option<i64>>(16)?
            .map(|v| datetime_from_unix(16, v))
            .transpose()?,
    })
}

fn text_conversion(index: usize, err: &timeforge_domain::TimeForgeError) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        index,
        rusqlite::types::Type::Text,
        err.to_string().into(),
    )
}

fn insert_time_log(tx: &Transaction<'_>, log: &TimeLog) -> rusqlite::Result<()> {
    tx.execute(
        &format!(
            "INSERT INTO time_logs ({TIME_LOG_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)"
        ),
        params![
            &log.id,
            &log.employee_id,
            &log.organization_id,
            &log.tenant_id,
            log.started_at.timestamp(),
            log.stopped_at.map(|ts| ts.timestamp()),
            log.duration_seconds,
            log.log_type.as_str(),
            log.source.as_str(),
            &log.project_id,
            &log.task_id,
            &log.organization_contact_id,
            &log.description,
            log.is_billable,
            log.is_running,
            log.deleted_at.map(|ts| ts.timestamp()),
            log.edited_at.map(|ts| ts.timestamp()),
        ],
    )?;
    Ok(())
}

fn update_time_log(tx: &Transaction<'_>, log: &TimeLog) -> rusqlite::Result<()> {
    tx.execute(
        "UPDATE time_logs SET
            started_at = ?2, stopped_at = ?3, duration_seconds = ?4, log_type = ?5,
            source = ?6, project_id = ?7, task_id = ?8, organization_contact_id = ?9,
            description = ?10, is_billable = ?11, is_running = ?12, edited_at = ?13
         WHERE id = ?1",
        params![
            &log.id,
            log.started_at.timestamp(),
            log.stopped_at.map(|ts| ts.timestamp()),
            log.duration_seconds,
            log.log_type.as_str(),
            log.source.as_str(),
            &log.project_id,
            &log.task_id,
            &log.organization_contact_id,
            &log.description,
            log.is_billable,
            log.is_running,
            log.edited_at.map(|ts| ts.timestamp()),
        ],
    )?;
    Ok(())
}

fn apply_adjustments(
    tx: &Transaction<'_>,
    adjustments: &[ConflictAdjustment],
) -> rusqlite::Result<()> {
    for adjustment in adjustments {
        match adjustment {
            ConflictAdjustment::SoftDelete { log_id } => {
                tx.execute(
                    "UPDATE time_logs SET deleted_at = ?2 WHERE id = ?1",
                    params![log_id, Utc::now().timestamp()],
                )?;
            }
            ConflictAdjustment::TrimStop { log_id, stopped_at, duration_seconds } => {
                tx.execute(
                    "UPDATE time_logs SET stopped_at = ?2, duration_seconds = ?3 WHERE id = ?1",
                    params![log_id, stopped_at.timestamp(), duration_seconds],
                )?;
            }
            ConflictAdjustment::TrimStart { log_id, started_at, duration_seconds } => {
                tx.execute(
                    "UPDATE time_logs SET started_at = ?2, duration_seconds = ?3 WHERE id = ?1",
                    params![log_id, started_at.timestamp(), duration_seconds],
                )?;
            }
            ConflictAdjustment::Split { log_id, stopped_at, duration_seconds, remainder } => {
                tx.execute(
                    "UPDATE time_logs SET stopped_at = ?2, duration_seconds = ?3 WHERE id = ?1",
                    params![log_id, stopped_at.timestamp(), duration_seconds],
                )?;
                insert_time_log(tx, remainder)?;
            }
        }
    }
    Ok(())
}

/// Build the dynamic report query and its positional parameters.
fn build_report_query(filter: &ReportFilter) -> (String, Vec<Value>) {
    let mut sql = format!(
        "SELECT {TIME_LOG_COLUMNS} FROM time_logs
         WHERE tenant_id = ? AND organization_id = ?
           AND deleted_at IS NULL AND is_running = 0 AND stopped_at IS NOT NULL
           AND started_at >= ? AND started_at < ?"
    );
    let mut params: Vec<Value> = vec![
        Value::Text(filter.tenant_id.clone()),
        Value::Text(filter.organization_id.clone()),
        Value::Integer(filter.start_date.timestamp()),
        Value::Integer(filter.end_date.timestamp()),
    ];

    if !filter.employee_ids.is_empty() {
        sql.push_str(&format!(
            " AND employee_id IN ({})",
            sql_placeholders(filter.employee_ids.len())
        ));
        params.extend(filter.employee_ids.iter().map(|id| Value::Text(id.clone())));
    }
    if !filter.project_ids.is_empty() {
        sql.push_str(&format!(
            " AND project_id IN ({})",
            sql_placeholders(filter.project_ids.len())
        ));
        params.extend(filter.project_ids.iter().map(|id| Value::Text(id.clone())));
    }
    if !filter.log_types.is_empty() {
        sql.push_str(&format!(" AND log_type IN ({})", sql_placeholders(filter.log_types.len())));
        params.extend(filter.log_types.iter().map(|t| Value::Text(t.as_str().to_string())));
    }
    if !filter.sources.is_empty() {
        sql.push_str(&format!(" AND source IN ({})", sql_placeholders(filter.sources.len())));
        params.extend(filter.sources.iter().map(|s| Value::Text(s.as_str().to_string())));
    }

    sql.push_str(" ORDER BY started_at");
    (sql, params)
}
