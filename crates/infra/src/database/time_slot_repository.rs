//! Time slot repository implementation using SQLite
//!
//! Slot rows are unique per `(employee_id, started_at)`; time-log
//! references live in a join table so the reference set survives
//! repeated merges of the same slot.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row, TransactionBehavior};
use timeforge_core::slots::ports::TimeSlotRepository as TimeSlotRepositoryPort;
use timeforge_domain::{ActivityCounters, Result as DomainResult, TimeSlot};
use tokio::task;

use super::manager::DbManager;
use super::{datetime_from_unix, map_join_error, map_sql_error, sql_placeholders};

const TIME_SLOT_COLUMNS: &str =
    "id, employee_id, organization_id, tenant_id, started_at, duration_seconds, \
     keyboard, mouse, overall";

/// SQLite-backed implementation of `TimeSlotRepository`
pub struct SqliteTimeSlotRepository {
    db: Arc<DbManager>,
}

impl SqliteTimeSlotRepository {
    /// Create a new repository instance
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl TimeSlotRepositoryPort for SqliteTimeSlotRepository {
    async fn find_by_start_times(
        &self,
        employee_id: &str,
        starts: &[DateTime<Utc>],
    ) -> DomainResult<Vec<TimeSlot>> {
        if starts.is_empty() {
            return Ok(Vec::new());
        }

        let db = Arc::clone(&self.db);
        let employee_id = employee_id.to_string();
        let starts: Vec<i64> = starts.iter().map(DateTime::timestamp).collect();

        task::spawn_blocking(move || -> DomainResult<Vec<TimeSlot>> {
            let conn = db.get_connection()?;
            let placeholders = sql_placeholders(starts.len());
            let mut params: Vec<Value> = vec![Value::Text(employee_id)];
            params.extend(starts.into_iter().map(Value::Integer));

            let slots = query_slots(
                &conn,
                &format!(
                    "SELECT {TIME_SLOT_COLUMNS} FROM time_slots
                     WHERE employee_id = ? AND started_at IN ({placeholders})
                     ORDER BY started_at"
                ),
                params,
            )
            .map_err(map_sql_error)?;
            Ok(slots)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn find_in_range(
        &self,
        employee_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DomainResult<Vec<TimeSlot>> {
        let db = Arc::clone(&self.db);
        let employee_id = employee_id.to_string();
        let (start, end) = (start.timestamp(), end.timestamp());

        task::spawn_blocking(move || -> DomainResult<Vec<TimeSlot>> {
            let conn = db.get_connection()?;
            let params = vec![
                Value::Text(employee_id),
                Value::Integer(start),
                Value::Integer(end),
            ];

            let slots = query_slots(
                &conn,
                &format!(
                    "SELECT {TIME_SLOT_COLUMNS} FROM time_slots
                     WHERE employee_id = ? AND started_at >= ? AND started_at < ?
                     ORDER BY started_at"
                ),
                params,
            )
            .map_err(map_sql_error)?;
            Ok(slots)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn save_batch(&self, slots: &[TimeSlot]) -> DomainResult<()> {
        if slots.is_empty() {
            return Ok(());
        }

        let db = Arc::clone(&self.db);
        let slots = slots.to_vec();

        task::spawn_blocking(move || -> DomainResult<()> {
            let mut conn = db.get_connection()?;
            let tx = conn
                .transaction_with_behavior(TransactionBehavior::Immediate)
                .map_err(map_sql_error)?;

            for slot in &slots {
                // A row at the same grid position but with another id is
                // about to be replaced; drop its references first.
                tx.execute(
                    "DELETE FROM time_slot_time_logs WHERE time_slot_id IN (
                        SELECT id FROM time_slots
                        WHERE employee_id = ?1 AND started_at = ?2 AND id <> ?3
                     )",
                    params![&slot.employee_id, slot.started_at.timestamp(), &slot.id],
                )
                .map_err(map_sql_error)?;

                tx.execute(
                    &format!(
                        "INSERT OR REPLACE INTO time_slots ({TIME_SLOT_COLUMNS})
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"
                    ),
                    params![
                        &slot.id,
                        &slot.employee_id,
                        &slot.organization_id,
                        &slot.tenant_id,
                        slot.started_at.timestamp(),
                        slot.duration_seconds,
                        slot.counters.keyboard,
                        slot.counters.mouse,
                        slot.counters.overall,
                    ],
                )
                .map_err(map_sql_error)?;

                tx.execute(
                    "DELETE FROM time_slot_time_logs WHERE time_slot_id = ?1",
                    params![&slot.id],
                )
                .map_err(map_sql_error)?;
                for log_id in &slot.time_log_ids {
                    tx.execute(
                        "INSERT OR IGNORE INTO time_slot_time_logs (time_slot_id, time_log_id)
                         VALUES (?1, ?2)",
                        params![&slot.id, log_id],
                    )
                    .map_err(map_sql_error)?;
                }
            }

            tx.commit().map_err(map_sql_error)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn delete_by_ids(&self, ids: &[String]) -> DomainResult<usize> {
        if ids.is_empty() {
            return Ok(0);
        }

        let db = Arc::clone(&self.db);
        let ids = ids.to_vec();

        task::spawn_blocking(move || -> DomainResult<usize> {
            let mut conn = db.get_connection()?;
            let tx = conn
                .transaction_with_behavior(TransactionBehavior::Immediate)
                .map_err(map_sql_error)?;
            let placeholders = sql_placeholders(ids.len());

            tx.execute(
                &format!(
                    "DELETE FROM time_slot_time_logs WHERE time_slot_id IN ({placeholders})"
                ),
                params_from_iter(ids.iter()),
            )
            .map_err(map_sql_error)?;
            let deleted = tx
                .execute(
                    &format!("DELETE FROM time_slots WHERE id IN ({placeholders})"),
                    params_from_iter(ids.iter()),
                )
                .map_err(map_sql_error)?;

            tx.commit().map_err(map_sql_error)?;
            Ok(deleted)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn delete_for_time_logs(&self, time_log_ids: &[String]) -> DomainResult<usize> {
        if time_log_ids.is_empty() {
            return Ok(0);
        }

        let db = Arc::clone(&self.db);
        let time_log_ids = time_log_ids.to_vec();

        task::spawn_blocking(move || -> DomainResult<usize> {
            let mut conn = db.get_connection()?;
            let tx = conn
                .transaction_with_behavior(TransactionBehavior::Immediate)
                .map_err(map_sql_error)?;
            let placeholders = sql_placeholders(time_log_ids.len());

            let slot_ids: Vec<String> = {
                let mut stmt = tx
                    .prepare(&format!(
                        "SELECT DISTINCT time_slot_id FROM time_slot_time_logs
                         WHERE time_log_id IN ({placeholders})"
                    ))
                    .map_err(map_sql_error)?;
                let rows = stmt
                    .query_map(params_from_iter(time_log_ids.iter()), |row| row.get(0))
                    .map_err(map_sql_error)?;
                rows.collect::<rusqlite::Result<Vec<_>>>().map_err(map_sql_error)?
            };

            if slot_ids.is_empty() {
                tx.commit().map_err(map_sql_error)?;
                return Ok(0);
            }

            let slot_placeholders = sql_placeholders(slot_ids.len());
            tx.execute(
                &format!(
                    "DELETE FROM time_slot_time_logs WHERE time_slot_id IN ({slot_placeholders})"
                ),
                params_from_iter(slot_ids.iter()),
            )
            .map_err(map_sql_error)?;
            let deleted = tx
                .execute(
                    &format!("DELETE FROM time_slots WHERE id IN ({slot_placeholders})"),
                    params_from_iter(slot_ids.iter()),
                )
                .map_err(map_sql_error)?;

            tx.commit().map_err(map_sql_error)?;
            Ok(deleted)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn try_record_batch_token(&self, token: &str) -> DomainResult<bool> {
        let db = Arc::clone(&self.db);
        let token = token.to_string();

        task::spawn_blocking(move || -> DomainResult<bool> {
            let conn = db.get_connection()?;
            let inserted = conn
                .execute(
                    "INSERT OR IGNORE INTO slot_batch_tokens (token, recorded_at)
                     VALUES (?1, ?2)",
                    params![&token, chrono::Utc::now().timestamp()],
                )
                .map_err(map_sql_error)?;
            Ok(inserted == 1)
        })
        .await
        .map_err(map_join_error)?
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Map a row to a TimeSlot (references filled in separately)
fn map_time_slot_row(row: &Row) -> rusqlite::Result<TimeSlot> {
    Ok(TimeSlot {
        id: row.get(0)?,
        employee_id: row.get(1)?,
        organization_id: row.get(2)?,
        tenant_id: row.get(3)?,
        started_at: datetime_from_unix(4, row.get(4)?)?,
        duration_seconds: row.get(5)?,
        counters: ActivityCounters::new(row.get(6)?, row.get(7)?, row.get(8)?),
        time_log_ids: Vec::new(),
    })
}

/// Run a slot query and attach each slot's time-log references.
fn query_slots(
    conn: &Connection,
    sql: &str,
    params: Vec<Value>,
) -> rusqlite::Result<Vec<TimeSlot>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params_from_iter(params), map_time_slot_row)?;
    let mut slots = rows.collect::<rusqlite::Result<Vec<_>>>()?;

    let mut ref_stmt = conn.prepare(
        "SELECT time_log_id FROM time_slot_time_logs WHERE time_slot_id = ?1 ORDER BY rowid",
    )?;
    for slot in &mut slots {
        let refs = ref_stmt.query_map(params![&slot.id], |row| row.get(0))?;
        slot.time_log_ids = refs.collect::<rusqlite::Result<Vec<_>>>()?;
    }
    Ok(slots)
}
