//! Time log service - manual entries, timers, and conflict resolution

use std::sync::Arc;

use chrono::{DateTime, Utc};
use timeforge_domain::constants::INVALID_DATE_RANGE_MESSAGE;
use timeforge_domain::utils::time::strip_subseconds;
use timeforge_domain::{
    ManualTimeInput, Result, StartTimerInput, TimeForgeError, TimeLog, TimeLogType, TimeSpan,
};
use tracing::info;
use uuid::Uuid;

use super::conflicts::{resolve_all, ConflictAdjustment};
use super::ports::{EmployeeRepository, TimeLogRepository};

/// Time log service
///
/// Validation failures are raised before any mutation; conflict
/// adjustments plus the triggering insert/update are applied in a single
/// storage transaction by the repository.
pub struct TimeLogService {
    time_logs: Arc<dyn TimeLogRepository>,
    employees: Arc<dyn EmployeeRepository>,
}

impl TimeLogService {
    /// Create a new time log service
    pub fn new(time_logs: Arc<dyn TimeLogRepository>, employees: Arc<dyn EmployeeRepository>) -> Self {
        Self { time_logs, employees }
    }

    /// Existing non-deleted logs of the employee overlapping `span`.
    pub async fn find_conflicts(
        &self,
        employee_id: &str,
        span: TimeSpan,
        exclude_id: Option<&str>,
    ) -> Result<Vec<TimeLog>> {
        if !span.is_valid() {
            return Err(TimeForgeError::Validation(INVALID_DATE_RANGE_MESSAGE.into()));
        }
        self.time_logs.find_conflicting(employee_id, span, exclude_id).await
    }

    /// Add a manual time entry, trimming or removing whatever it overlaps.
    pub async fn add_manual_time(&self, input: ManualTimeInput) -> Result<TimeLog> {
        let span = TimeSpan::new(input.started_at, input.stopped_at);
        self.validate_manual_span(&input.organization_id, span).await?;

        // Surfaces not-found before any mutation
        let employee = self.employees.find_by_id(&input.employee_id).await?;

        let conflicts = self.time_logs.find_conflicting(&employee.id, span, None).await?;
        let adjustments = resolve_all(span, &conflicts);

        let log = input.into_time_log();
        self.time_logs.insert_resolved(&log, &adjustments).await?;

        info!(
            log_id = %log.id,
            employee_id = %log.employee_id,
            conflicts = adjustments.len(),
            "manual time entry added"
        );
        Ok(log)
    }

    /// Edit an existing manual entry. The edited interval is the newly
    /// authoritative one; the log being edited is excluded from conflict
    /// search.
    pub async fn update_manual_time(&self, id: &str, input: ManualTimeInput) -> Result<TimeLog> {
        let span = TimeSpan::new(input.started_at, input.stopped_at);
        self.validate_manual_span(&input.organization_id, span).await?;

        let mut log = self.time_logs.find_by_id(id).await?;

        let conflicts = self.time_logs.find_conflicting(&log.employee_id, span, Some(id)).await?;
        let adjustments = resolve_all(span, &conflicts);

        log.started_at = input.started_at;
        log.stopped_at = Some(input.stopped_at);
        log.duration_seconds = span.duration_seconds();
        log.project_id = input.project_id;
        log.task_id = input.task_id;
        log.organization_contact_id = input.organization_contact_id;
        log.description = input.description;
        log.is_billable = input.is_billable;
        log.edited_at = Some(Utc::now());

        self.time_logs.update_resolved(&log, &adjustments).await?;

        info!(log_id = %log.id, conflicts = adjustments.len(), "manual time entry updated");
        Ok(log)
    }

    /// Start a tracked timer. A timer already running for the employee
    /// is stopped at the new start time first.
    pub async fn start_timer(&self, input: StartTimerInput) -> Result<TimeLog> {
        let employee = self.employees.find_by_id(&input.employee_id).await?;
        let started_at = strip_subseconds(input.started_at.unwrap_or_else(Utc::now));

        if let Some(running) = self.time_logs.find_running(&employee.id).await? {
            self.close_running(running, started_at).await?;
        }

        let log = TimeLog {
            id: Uuid::new_v4().to_string(),
            employee_id: input.employee_id,
            organization_id: input.organization_id,
            tenant_id: input.tenant_id,
            started_at,
            stopped_at: None,
            duration_seconds: 0,
            log_type: TimeLogType::Tracked,
            source: input.source,
            project_id: input.project_id,
            task_id: input.task_id,
            organization_contact_id: input.organization_contact_id,
            description: input.description,
            is_billable: input.is_billable,
            is_running: true,
            deleted_at: None,
            edited_at: None,
        };
        self.time_logs.insert_resolved(&log, &[]).await?;

        info!(log_id = %log.id, employee_id = %log.employee_id, "timer started");
        Ok(log)
    }

    /// Stop the employee's running timer, resolving any overlap the
    /// closed interval created.
    pub async fn stop_timer(
        &self,
        employee_id: &str,
        stopped_at: Option<DateTime<Utc>>,
    ) -> Result<TimeLog> {
        let running = self
            .time_logs
            .find_running(employee_id)
            .await?
            .ok_or_else(|| TimeForgeError::NotFound(format!("no running timer for employee {employee_id}")))?;

        let stopped_at = strip_subseconds(stopped_at.unwrap_or_else(Utc::now));
        self.close_running(running, stopped_at).await
    }

    /// Soft delete (default) or hard delete time logs.
    pub async fn delete_time_logs(&self, ids: &[String], force: bool) -> Result<usize> {
        if ids.is_empty() {
            return Err(TimeForgeError::Validation(
                "cannot delete time logs without ids".into(),
            ));
        }
        let deleted = self.time_logs.delete(ids, force).await?;
        info!(count = deleted, force, "time logs deleted");
        Ok(deleted)
    }

    async fn close_running(&self, mut log: TimeLog, stopped_at: DateTime<Utc>) -> Result<TimeLog> {
        let stopped_at = stopped_at.max(log.started_at);
        let span = TimeSpan::new(log.started_at, stopped_at);

        log.stopped_at = Some(stopped_at);
        log.duration_seconds = span.duration_seconds();
        log.is_running = false;

        let adjustments: Vec<ConflictAdjustment> = if span.is_valid() {
            let conflicts =
                self.time_logs.find_conflicting(&log.employee_id, span, Some(&log.id)).await?;
            resolve_all(span, &conflicts)
        } else {
            Vec::new()
        };

        self.time_logs.update_resolved(&log, &adjustments).await?;

        info!(
            log_id = %log.id,
            duration_seconds = log.duration_seconds,
            conflicts = adjustments.len(),
            "timer stopped"
        );
        Ok(log)
    }

    /// Reject invalid or disallowed manual spans before any conflict
    /// search runs. This is a validation failure, not a conflict.
    async fn validate_manual_span(&self, organization_id: &str, span: TimeSpan) -> Result<()> {
        if !span.is_valid() {
            return Err(TimeForgeError::Validation(INVALID_DATE_RANGE_MESSAGE.into()));
        }

        let policy = self.employees.policy_for_organization(organization_id).await?;
        if !policy.allow_future_dates && span.end > Utc::now() {
            return Err(TimeForgeError::Validation(INVALID_DATE_RANGE_MESSAGE.into()));
        }
        Ok(())
    }
}
