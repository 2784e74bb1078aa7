//! Report filter and aggregate types
//!
//! Report aggregates are derived on read; nothing here is persisted.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::time_log::{TimeLogSource, TimeLogType};

/// Grouping dimension for report trees.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportGroupBy {
    #[default]
    Date,
    Employee,
    Project,
    Client,
}

/// Who the caller is allowed to report on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PermissionScope {
    /// No elevated permission: restricted to the caller's own records.
    SelfOnly(String),
    /// "Can see all employees' time" capability.
    AllEmployees,
}

/// Filter applied when fetching time logs for a report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportFilter {
    pub tenant_id: String,
    pub organization_id: String,
    /// Empty means all employees the scope permits.
    pub employee_ids: Vec<String>,
    /// Empty means all projects.
    pub project_ids: Vec<String>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    /// Empty means all log types.
    pub log_types: Vec<TimeLogType>,
    /// Empty means all sources.
    pub sources: Vec<TimeLogSource>,
    pub scope: PermissionScope,
}

/// Payable amount for a duration at an employee's billing rate.
///
/// A missing rate is surfaced explicitly; consumers must not treat it as
/// "no charge".
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value")]
pub enum OwedAmount {
    Amount(f64),
    UnknownRate,
}

/// Key identifying one group in a report tree.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ReportKey {
    Date(NaiveDate),
    Employee(String),
    /// `None` groups logs with no project attribution.
    Project(Option<String>),
    /// `None` groups logs with no client attribution.
    Client(Option<String>),
}

/// One node of a grouped report tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportGroup {
    pub key: ReportKey,
    /// Total logged seconds under this group.
    pub sum_seconds: i64,
    /// Share of the parent group's total, in percent, one decimal.
    pub percentage: f64,
    /// Present on employee-keyed groups only.
    pub owed_amount: Option<OwedAmount>,
    pub children: Vec<ReportGroup>,
}

/// A full report: the requested dimension plus the grouped tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportTree {
    pub group_by: ReportGroupBy,
    pub total_seconds: i64,
    pub groups: Vec<ReportGroup>,
}

/// Per-day duration split for chart consumers, in hours to one decimal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DailyChartValue {
    pub tracked: f64,
    pub manual: f64,
    pub idle: f64,
    pub resumed: f64,
}

/// One entry of the fixed-length, zero-filled date axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyChartEntry {
    pub date: NaiveDate,
    pub value: DailyChartValue,
}

/// Per-employee weekly rollup: a sum plus one cell per axis day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyReportRow {
    pub employee_id: String,
    pub sum_seconds: i64,
    /// One entry per day of the capped axis, zero-filled.
    pub dates: Vec<(NaiveDate, i64)>,
}

/// One employee's owed amount for a single date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmountOwedEntry {
    pub employee_id: String,
    pub duration_seconds: i64,
    pub amount: OwedAmount,
}

/// Owed amounts grouped by date, then employee.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmountOwedRow {
    pub date: NaiveDate,
    pub employees: Vec<AmountOwedEntry>,
}

/// Daily owed-amount totals for the chart axis.
///
/// Employees with an unknown rate are excluded from the total rather
/// than counted as zero; `has_unknown_rate` flags that exclusion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmountOwedChartEntry {
    pub date: NaiveDate,
    pub value: f64,
    pub has_unknown_rate: bool,
}
