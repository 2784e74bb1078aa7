//! End-to-end persistence tests: core services wired to real SQLite
//! repositories.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use tempfile::TempDir;
use timeforge_core::{ReportService, SlotService, TimeLogService};
use timeforge_domain::{
    ActivityCounters, Employee, ManualTimeInput, OrganizationPolicy, OwedAmount, PermissionScope,
    ReportFilter, ReportGroupBy, ReportKey, TimeLogSource, TimeSlotCandidate,
};
use timeforge_infra::{
    DbManager, SqliteActivityRepository, SqliteEmployeeRepository, SqliteTimeLogRepository,
    SqliteTimeSlotRepository,
};

struct Harness {
    _temp_dir: TempDir,
    time_logs: TimeLogService,
    slots: SlotService,
    reports: ReportService,
    slot_repo: Arc<SqliteTimeSlotRepository>,
}

async fn setup() -> Harness {
    let temp_dir = TempDir::new().expect("temp dir created");
    let manager =
        Arc::new(DbManager::new(temp_dir.path().join("test.db"), 4).expect("manager created"));
    manager.run_migrations().expect("migrations run");

    let employees = Arc::new(SqliteEmployeeRepository::new(
        Arc::clone(&manager),
        OrganizationPolicy::default(),
    ));
    employees
        .upsert(&Employee {
            id: "alice".into(),
            organization_id: "org-1".into(),
            tenant_id: "tenant-1".into(),
            full_name: "Alice".into(),
            bill_rate: Some(20.0),
        })
        .await
        .expect("alice seeded");
    employees
        .upsert(&Employee {
            id: "bob".into(),
            organization_id: "org-1".into(),
            tenant_id: "tenant-1".into(),
            full_name: "Bob".into(),
            bill_rate: None,
        })
        .await
        .expect("bob seeded");

    let time_log_repo = Arc::new(SqliteTimeLogRepository::new(Arc::clone(&manager)));
    let slot_repo = Arc::new(SqliteTimeSlotRepository::new(Arc::clone(&manager)));
    let activity_repo = Arc::new(SqliteActivityRepository::new(Arc::clone(&manager)));

    Harness {
        _temp_dir: temp_dir,
        time_logs: TimeLogService::new(time_log_repo.clone(), employees.clone()),
        slots: SlotService::new(slot_repo.clone(), activity_repo, employees.clone()),
        reports: ReportService::new(time_log_repo, employees),
        slot_repo,
    }
}

fn utc(d: u32, h: u32, mi: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, d, h, mi, 0).single().unwrap()
}

fn manual(employee: &str, start: DateTime<Utc>, stop: DateTime<Utc>) -> ManualTimeInput {
    ManualTimeInput {
        employee_id: employee.to_string(),
        organization_id: "org-1".into(),
        tenant_id: "tenant-1".into(),
        started_at: start,
        stopped_at: stop,
        project_id: Some("project-1".into()),
        task_id: None,
        organization_contact_id: None,
        description: None,
        is_billable: true,
        source: TimeLogSource::Browser,
    }
}

fn report_filter(start: DateTime<Utc>, end: DateTime<Utc>) -> ReportFilter {
    ReportFilter {
        tenant_id: "tenant-1".into(),
        organization_id: "org-1".into(),
        employee_ids: Vec::new(),
        project_ids: Vec::new(),
        start_date: start,
        end_date: end,
        log_types: Vec::new(),
        sources: Vec::new(),
        scope: PermissionScope::AllEmployees,
    }
}

#[tokio::test]
async fn overlapping_manual_entries_resolve_and_report_consistently() {
    let harness = setup().await;

    // 09:45-11:00 first, then an authoritative 10:00-10:30 inside it
    harness.time_logs.add_manual_time(manual("alice", utc(4, 9, 45), utc(4, 11, 0))).await.unwrap();
    harness.time_logs.add_manual_time(manual("alice", utc(4, 10, 0), utc(4, 10, 30))).await.unwrap();

    let tree = harness
        .reports
        .build_report(&report_filter(utc(4, 0, 0), utc(5, 0, 0)), ReportGroupBy::Date)
        .await
        .unwrap();

    // 09:45-10:00 + 10:00-10:30 + 10:30-11:00 still totals 75 minutes
    assert_eq!(tree.total_seconds, 4500);
    assert_eq!(tree.groups.len(), 1);
    assert_eq!(tree.groups[0].key, ReportKey::Date("2024-03-04".parse().unwrap()));
}

#[tokio::test]
async fn slot_upsert_merges_and_consolidates_across_batches() {
    let harness = setup().await;

    let candidate = |start: DateTime<Utc>, overall: i64| TimeSlotCandidate {
        employee_id: "alice".into(),
        organization_id: None,
        tenant_id: None,
        started_at: start,
        duration_seconds: 120,
        counters: ActivityCounters::new(overall, 0, overall),
        time_log_id: None,
    };

    harness.slots.upsert(vec![candidate(utc(4, 9, 2), 5)], Some("batch-1")).await.unwrap();
    harness.slots.upsert(vec![candidate(utc(4, 9, 7), 3)], Some("batch-2")).await.unwrap();
    // Re-sent first batch must not double count
    harness.slots.upsert(vec![candidate(utc(4, 9, 2), 5)], Some("batch-1")).await.unwrap();

    let merged = harness
        .slots
        .range_merge("alice", utc(4, 9, 0), utc(4, 9, 0))
        .await
        .unwrap();

    assert_eq!(merged.len(), 1);
    assert_eq!(merged[0].started_at, utc(4, 9, 0));
    assert_eq!(merged[0].counters.overall, 8);
    assert_eq!(merged[0].duration_seconds, 240);
    // Stamped from the employee record
    assert_eq!(merged[0].organization_id, "org-1");
    assert_eq!(merged[0].tenant_id, "tenant-1");
}

#[tokio::test]
async fn owed_amounts_flow_from_stored_logs() {
    let harness = setup().await;

    harness.time_logs.add_manual_time(manual("alice", utc(4, 9, 0), utc(4, 10, 30))).await.unwrap();
    harness.time_logs.add_manual_time(manual("bob", utc(4, 9, 0), utc(4, 10, 0))).await.unwrap();

    let rows = harness
        .reports
        .owed_amount_report(&report_filter(utc(4, 0, 0), utc(5, 0, 0)))
        .await
        .unwrap();

    assert_eq!(rows.len(), 1);
    let entries = &rows[0].employees;
    assert_eq!(entries[0].employee_id, "alice");
    assert_eq!(entries[0].amount, OwedAmount::Amount(30.0));
    assert_eq!(entries[1].employee_id, "bob");
    assert_eq!(entries[1].amount, OwedAmount::UnknownRate);

    let chart = harness
        .reports
        .owed_amount_chart(&report_filter(utc(4, 0, 0), utc(5, 0, 0)))
        .await
        .unwrap();
    assert_eq!(chart[0].value, 30.0);
    assert!(chart[0].has_unknown_rate);
}

#[tokio::test]
async fn deleting_logs_cleans_up_their_slots() {
    let harness = setup().await;

    let log =
        harness.time_logs.add_manual_time(manual("alice", utc(4, 9, 0), utc(4, 9, 10))).await.unwrap();

    harness
        .slots
        .upsert(
            vec![TimeSlotCandidate {
                employee_id: "alice".into(),
                organization_id: None,
                tenant_id: None,
                started_at: utc(4, 9, 0),
                duration_seconds: 600,
                counters: ActivityCounters::new(1, 1, 2),
                time_log_id: Some(log.id.clone()),
            }],
            None,
        )
        .await
        .unwrap();

    harness.time_logs.delete_time_logs(&[log.id.clone()], false).await.unwrap();
    let removed = harness.slots.delete_slots_for_time_logs(&[log.id]).await.unwrap();
    assert_eq!(removed, 1);

    use timeforge_core::TimeSlotRepository as _;
    let remaining =
        harness.slot_repo.find_in_range("alice", utc(4, 0, 0), utc(5, 0, 0)).await.unwrap();
    assert!(remaining.is_empty());
}
