//! Port interfaces for time log persistence
//!
//! These traits define the boundaries between core business logic
//! and infrastructure implementations.

use async_trait::async_trait;
use timeforge_domain::{Employee, OrganizationPolicy, ReportFilter, Result, TimeLog, TimeSpan};

use super::conflicts::ConflictAdjustment;

/// Trait for persisting and querying time logs
#[async_trait]
pub trait TimeLogRepository: Send + Sync {
    /// Fetch one log by id; not-found is an error.
    async fn find_by_id(&self, id: &str) -> Result<TimeLog>;

    /// Non-deleted logs of the employee overlapping `span`, ordered by
    /// start time. `exclude_id` skips the log being edited.
    async fn find_conflicting(
        &self,
        employee_id: &str,
        span: TimeSpan,
        exclude_id: Option<&str>,
    ) -> Result<Vec<TimeLog>>;

    /// The employee's currently running log, if any.
    async fn find_running(&self, employee_id: &str) -> Result<Option<TimeLog>>;

    /// Non-deleted, stopped logs matching the report filter, ordered by
    /// start time.
    async fn find_for_report(&self, filter: &ReportFilter) -> Result<Vec<TimeLog>>;

    /// Insert `log` and apply `adjustments` in one storage transaction.
    async fn insert_resolved(
        &self,
        log: &TimeLog,
        adjustments: &[ConflictAdjustment],
    ) -> Result<()>;

    /// Update `log` and apply `adjustments` in one storage transaction.
    async fn update_resolved(
        &self,
        log: &TimeLog,
        adjustments: &[ConflictAdjustment],
    ) -> Result<()>;

    /// Soft delete (default) or hard delete the given logs.
    async fn delete(&self, ids: &[String], force: bool) -> Result<usize>;
}

/// Trait for reading employee records and organization policy
#[async_trait]
pub trait EmployeeRepository: Send + Sync {
    /// Fetch one employee by id; not-found is an error.
    async fn find_by_id(&self, id: &str) -> Result<Employee>;

    /// Fetch the employees whose ids are listed; missing ids are skipped.
    async fn find_many(&self, ids: &[String]) -> Result<Vec<Employee>>;

    /// Manual-entry policy for the organization. Organizations without
    /// an explicit policy row get the default.
    async fn policy_for_organization(&self, organization_id: &str) -> Result<OrganizationPolicy>;
}
