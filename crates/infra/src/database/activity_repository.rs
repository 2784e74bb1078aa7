//! Activity repository implementation using SQLite

use std::sync::Arc;

use async_trait::async_trait;
use rusqlite::{params, Transaction, TransactionBehavior};
use timeforge_core::slots::ports::ActivityRepository as ActivityRepositoryPort;
use timeforge_domain::{Activity, Result as DomainResult};
use tokio::task;

use super::manager::DbManager;
use super::{map_join_error, map_sql_error};

/// SQLite-backed implementation of `ActivityRepository`
pub struct SqliteActivityRepository {
    db: Arc<DbManager>,
}

impl SqliteActivityRepository {
    /// Create a new repository instance
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ActivityRepositoryPort for SqliteActivityRepository {
    async fn bulk_insert(&self, activities: &[Activity]) -> DomainResult<usize> {
        if activities.is_empty() {
            return Ok(0);
        }

        let db = Arc::clone(&self.db);
        let activities = activities.to_vec();

        task::spawn_blocking(move || -> DomainResult<usize> {
            let mut conn = db.get_connection()?;
            let tx = conn
                .transaction_with_behavior(TransactionBehavior::Immediate)
                .map_err(map_sql_error)?;

            for activity in &activities {
                insert_activity(&tx, activity).map_err(map_sql_error)?;
            }

            tx.commit().map_err(map_sql_error)?;
            Ok(activities.len())
        })
        .await
        .map_err(map_join_error)?
    }
}

fn insert_activity(tx: &Transaction<'_>, activity: &Activity) -> rusqlite::Result<()> {
    tx.execute(
        "INSERT INTO activities (
            id, employee_id, time_slot_id, project_id, task_id, title,
            date, time, duration_seconds, kind
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            &activity.id,
            &activity.employee_id,
            &activity.time_slot_id,
            &activity.project_id,
            &activity.task_id,
            &activity.title,
            activity.date.to_string(),
            activity.time.to_string(),
            activity.duration_seconds,
            activity.kind.as_str(),
        ],
    )?;
    Ok(())
}
