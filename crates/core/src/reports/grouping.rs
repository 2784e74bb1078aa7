//! Pure grouping over fetched time logs.

use std::collections::{BTreeMap, HashMap};

use timeforge_domain::{
    OwedAmount, ReportGroup, ReportGroupBy, ReportKey, ReportTree, TimeLog,
};

/// Secondary dimensions nested under each primary grouping.
///
/// Date-rooted trees break down by employee then project; every other
/// root breaks down by date then a complementary dimension.
pub fn dimension_chain(group_by: ReportGroupBy) -> [ReportGroupBy; 3] {
    match group_by {
        ReportGroupBy::Date => [ReportGroupBy::Date, ReportGroupBy::Employee, ReportGroupBy::Project],
        ReportGroupBy::Employee => [ReportGroupBy::Employee, ReportGroupBy::Date, ReportGroupBy::Project],
        ReportGroupBy::Project => [ReportGroupBy::Project, ReportGroupBy::Date, ReportGroupBy::Employee],
        ReportGroupBy::Client => [ReportGroupBy::Client, ReportGroupBy::Date, ReportGroupBy::Employee],
    }
}

fn key_for(log: &TimeLog, dimension: ReportGroupBy) -> ReportKey {
    match dimension {
        ReportGroupBy::Date => ReportKey::Date(log.started_at.date_naive()),
        ReportGroupBy::Employee => ReportKey::Employee(log.employee_id.clone()),
        ReportGroupBy::Project => ReportKey::Project(log.project_id.clone()),
        ReportGroupBy::Client => ReportKey::Client(log.organization_contact_id.clone()),
    }
}

/// Round to one decimal place.
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Amount owed for `seconds` of work at an hourly `bill_rate`.
pub fn owed_for(bill_rate: Option<f64>, seconds: i64) -> OwedAmount {
    match bill_rate {
        Some(rate) => OwedAmount::Amount(round1(rate * (seconds as f64 / 3600.0))),
        None => OwedAmount::UnknownRate,
    }
}

/// Group the logs into a tree along the dimension chain for `group_by`.
///
/// `bill_rates` maps employee id to an optional hourly rate; it is only
/// consulted for employee-keyed groups. Group order is deterministic
/// (sorted by key) regardless of input order.
pub fn build_tree(
    logs: &[TimeLog],
    group_by: ReportGroupBy,
    bill_rates: &HashMap<String, Option<f64>>,
) -> ReportTree {
    let chain = dimension_chain(group_by);
    let total_seconds: i64 = logs.iter().map(|l| l.duration_seconds).sum();
    let refs: Vec<&TimeLog> = logs.iter().collect();
    let groups = group_level(&refs, &chain, 0, total_seconds, bill_rates);
    ReportTree { group_by, total_seconds, groups }
}

fn group_level(
    logs: &[&TimeLog],
    chain: &[ReportGroupBy; 3],
    depth: usize,
    parent_seconds: i64,
    bill_rates: &HashMap<String, Option<f64>>,
) -> Vec<ReportGroup> {
    let Some(&dimension) = chain.get(depth) else {
        return Vec::new();
    };

    let mut buckets: BTreeMap<ReportKey, Vec<&TimeLog>> = BTreeMap::new();
    for log in logs {
        buckets.entry(key_for(log, dimension)).or_default().push(log);
    }

    buckets
        .into_iter()
        .map(|(key, members)| {
            let sum_seconds: i64 = members.iter().map(|l| l.duration_seconds).sum();
            let percentage = if parent_seconds > 0 {
                round1(sum_seconds as f64 / parent_seconds as f64 * 100.0)
            } else {
                0.0
            };
            let owed_amount = match &key {
                ReportKey::Employee(id) => {
                    Some(owed_for(bill_rates.get(id).copied().flatten(), sum_seconds))
                }
                _ => None,
            };
            let children = group_level(&members, chain, depth + 1, sum_seconds, bill_rates);
            ReportGroup { key, sum_seconds, percentage, owed_amount, children }
        })
        .collect()
}
