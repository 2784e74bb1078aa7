//! Report service - scope enforcement plus read-time aggregation.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::NaiveDate;
use timeforge_domain::constants::{MAX_REPORT_WINDOW_DAYS, WEEKLY_REPORT_WINDOW_DAYS};
use timeforge_domain::utils::time::days_between;
use timeforge_domain::{
    AmountOwedChartEntry, AmountOwedEntry, AmountOwedRow, DailyChartEntry, DailyChartValue,
    OwedAmount, PermissionScope, ReportFilter, ReportGroupBy, ReportTree, Result, TimeLog,
    TimeLogType, WeeklyReportRow,
};
use tracing::debug;

use super::grouping::{build_tree, owed_for, round1};
use crate::timelog::ports::{EmployeeRepository, TimeLogRepository};

/// Report aggregation service
pub struct ReportService {
    time_logs: Arc<dyn TimeLogRepository>,
    employees: Arc<dyn EmployeeRepository>,
}

impl ReportService {
    /// Create a new report service
    pub fn new(time_logs: Arc<dyn TimeLogRepository>, employees: Arc<dyn EmployeeRepository>) -> Self {
        Self { time_logs, employees }
    }

    /// Narrow the filter to what the caller's scope permits. A caller
    /// without the all-employees capability only ever sees their own
    /// records, whatever employee ids the request names.
    fn scoped(filter: &ReportFilter) -> ReportFilter {
        let mut scoped = filter.clone();
        if let PermissionScope::SelfOnly(employee_id) = &filter.scope {
            scoped.employee_ids = vec![employee_id.clone()];
        }
        scoped
    }

    async fn fetch(&self, filter: &ReportFilter) -> Result<Vec<TimeLog>> {
        let scoped = Self::scoped(filter);
        let logs = self.time_logs.find_for_report(&scoped).await?;
        debug!(count = logs.len(), "time logs fetched for report");
        Ok(logs)
    }

    async fn bill_rates(&self, logs: &[TimeLog]) -> Result<HashMap<String, Option<f64>>> {
        let mut ids: Vec<String> = logs.iter().map(|l| l.employee_id.clone()).collect();
        ids.sort_unstable();
        ids.dedup();

        let employees = self.employees.find_many(&ids).await?;
        Ok(employees.into_iter().map(|e| (e.id, e.bill_rate)).collect())
    }

    /// Grouped report tree along the requested dimension.
    pub async fn build_report(
        &self,
        filter: &ReportFilter,
        group_by: ReportGroupBy,
    ) -> Result<ReportTree> {
        let logs = self.fetch(filter).await?;
        let rates = self.bill_rates(&logs).await?;
        Ok(build_tree(&logs, group_by, &rates))
    }

    /// Per-day hours split by log type, over a zero-filled axis capped
    /// at 31 days.
    pub async fn daily_chart(&self, filter: &ReportFilter) -> Result<Vec<DailyChartEntry>> {
        let logs = self.fetch(filter).await?;
        let axis = days_between(filter.start_date, filter.end_date, MAX_REPORT_WINDOW_DAYS);

        let mut per_day: BTreeMap<NaiveDate, [i64; 4]> =
            axis.iter().map(|d| (*d, [0; 4])).collect();
        for log in &logs {
            if let Some(cell) = per_day.get_mut(&log.started_at.date_naive()) {
                let idx = match log.log_type {
                    TimeLogType::Tracked => 0,
                    TimeLogType::Manual => 1,
                    TimeLogType::Idle => 2,
                    TimeLogType::Resumed => 3,
                };
                cell[idx] += log.duration_seconds;
            }
        }

        Ok(axis
            .into_iter()
            .map(|date| {
                let seconds = per_day.get(&date).copied().unwrap_or_default();
                DailyChartEntry {
                    date,
                    value: DailyChartValue {
                        tracked: round1(seconds[0] as f64 / 3600.0),
                        manual: round1(seconds[1] as f64 / 3600.0),
                        idle: round1(seconds[2] as f64 / 3600.0),
                        resumed: round1(seconds[3] as f64 / 3600.0),
                    },
                }
            })
            .collect())
    }

    /// Per-employee weekly rollup over a zero-filled 7-day axis.
    pub async fn weekly_report(&self, filter: &ReportFilter) -> Result<Vec<WeeklyReportRow>> {
        let logs = self.fetch(filter).await?;
        let axis = days_between(filter.start_date, filter.end_date, WEEKLY_REPORT_WINDOW_DAYS);

        let mut per_employee: BTreeMap<String, BTreeMap<NaiveDate, i64>> = BTreeMap::new();
        for log in &logs {
            let date = log.started_at.date_naive();
            if !axis.contains(&date) {
                continue;
            }
            *per_employee
                .entry(log.employee_id.clone())
                .or_default()
                .entry(date)
                .or_default() += log.duration_seconds;
        }

        Ok(per_employee
            .into_iter()
            .map(|(employee_id, days)| {
                let dates: Vec<(NaiveDate, i64)> = axis
                    .iter()
                    .map(|date| (*date, days.get(date).copied().unwrap_or(0)))
                    .collect();
                let sum_seconds = dates.iter().map(|(_, s)| s).sum();
                WeeklyReportRow { employee_id, sum_seconds, dates }
            })
            .collect())
    }

    /// Amounts owed per employee, grouped by date. Only dates with
    /// logged work appear.
    pub async fn owed_amount_report(&self, filter: &ReportFilter) -> Result<Vec<AmountOwedRow>> {
        let logs = self.fetch(filter).await?;
        let rates = self.bill_rates(&logs).await?;

        let mut per_date: BTreeMap<NaiveDate, BTreeMap<String, i64>> = BTreeMap::new();
        for log in &logs {
            *per_date
                .entry(log.started_at.date_naive())
                .or_default()
                .entry(log.employee_id.clone())
                .or_default() += log.duration_seconds;
        }

        Ok(per_date
            .into_iter()
            .map(|(date, employees)| AmountOwedRow {
                date,
                employees: employees
                    .into_iter()
                    .map(|(employee_id, duration_seconds)| AmountOwedEntry {
                        amount: owed_for(
                            rates.get(&employee_id).copied().flatten(),
                            duration_seconds,
                        ),
                        employee_id,
                        duration_seconds,
                    })
                    .collect(),
            })
            .collect())
    }

    /// Daily owed-amount totals over a zero-filled axis. Employees with
    /// an unknown rate are excluded from the total and flagged, never
    /// silently counted as zero.
    pub async fn owed_amount_chart(
        &self,
        filter: &ReportFilter,
    ) -> Result<Vec<AmountOwedChartEntry>> {
        let rows = self.owed_amount_report(filter).await?;
        let axis = days_between(filter.start_date, filter.end_date, MAX_REPORT_WINDOW_DAYS);

        let by_date: BTreeMap<NaiveDate, &AmountOwedRow> =
            rows.iter().map(|row| (row.date, row)).collect();

        Ok(axis
            .into_iter()
            .map(|date| {
                let mut value = 0.0;
                let mut has_unknown_rate = false;
                if let Some(row) = by_date.get(&date) {
                    for entry in &row.employees {
                        match entry.amount {
                            OwedAmount::Amount(amount) => value += amount,
                            OwedAmount::UnknownRate => has_unknown_rate = true,
                        }
                    }
                }
                AmountOwedChartEntry { date, value: round1(value), has_unknown_rate }
            })
            .collect())
    }
}
