//! Port interfaces for slot and activity persistence

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use timeforge_domain::{Activity, Result, TimeSlot};

/// Trait for persisting and querying time slots
///
/// The storage layer must provide row-level atomicity for
/// [`save_batch`](Self::save_batch); the engine does not lock.
#[async_trait]
pub trait TimeSlotRepository: Send + Sync {
    /// Slots of the employee whose start equals any of `starts`.
    async fn find_by_start_times(
        &self,
        employee_id: &str,
        starts: &[DateTime<Utc>],
    ) -> Result<Vec<TimeSlot>>;

    /// Slots of the employee with `start <= started_at < end`.
    async fn find_in_range(
        &self,
        employee_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<TimeSlot>>;

    /// Persist the batch in one write, replacing rows that share an id
    /// or an `(employee_id, started_at)` key.
    async fn save_batch(&self, slots: &[TimeSlot]) -> Result<()>;

    /// Remove slot rows (and their time-log references) by id.
    async fn delete_by_ids(&self, ids: &[String]) -> Result<usize>;

    /// Remove slots referencing any of the given time logs.
    async fn delete_for_time_logs(&self, time_log_ids: &[String]) -> Result<usize>;

    /// Record an idempotency token. Returns `false` when the token has
    /// been seen before.
    async fn try_record_batch_token(&self, token: &str) -> Result<bool>;
}

/// Trait for appending observed activity events
#[async_trait]
pub trait ActivityRepository: Send + Sync {
    /// Bulk insert activities. Append-only; activities are never merged.
    async fn bulk_insert(&self, activities: &[Activity]) -> Result<usize>;
}
