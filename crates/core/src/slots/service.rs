//! Slot aggregation service - idempotent merge-upsert over the grid
//!
//! Merging is additive per `(employee_id, started_at)` key: counters are
//! summed and time-log reference sets unioned, so intra-batch ordering
//! does not affect the result. After every batch a window recompute
//! consolidates whatever the batch touched, which lets late-arriving
//! slots retroactively correct aggregates for that window.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use timeforge_domain::constants::{MAX_SLOT_DURATION_SECONDS, SLOT_INTERVAL_SECONDS};
use timeforge_domain::utils::time::{floor_to_slot, strip_subseconds};
use timeforge_domain::{Activity, Result, TimeSlot, TimeSlotCandidate};
use tracing::{debug, info};

use super::ports::{ActivityRepository, TimeSlotRepository};
use crate::timelog::ports::EmployeeRepository;

/// Slot aggregation service
pub struct SlotService {
    slots: Arc<dyn TimeSlotRepository>,
    activities: Arc<dyn ActivityRepository>,
    employees: Arc<dyn EmployeeRepository>,
}

impl SlotService {
    /// Create a new slot aggregation service
    pub fn new(
        slots: Arc<dyn TimeSlotRepository>,
        activities: Arc<dyn ActivityRepository>,
        employees: Arc<dyn EmployeeRepository>,
    ) -> Self {
        Self { slots, activities, employees }
    }

    /// Merge a candidate batch into the stored slots and persist the
    /// result in one write, then recompute the affected window.
    ///
    /// When `idempotency_token` is given and was seen before, the whole
    /// batch is a no-op: re-sent observations must not double-count.
    pub async fn upsert(
        &self,
        batch: Vec<TimeSlotCandidate>,
        idempotency_token: Option<&str>,
    ) -> Result<Vec<TimeSlot>> {
        if batch.is_empty() {
            return Ok(Vec::new());
        }

        if let Some(token) = idempotency_token {
            if !self.slots.try_record_batch_token(token).await? {
                info!(token, "slot batch token already seen, skipping");
                return Ok(Vec::new());
            }
        }

        // Candidates are merged per employee so org/tenant stamping and
        // the window recompute stay scoped to one timeline at a time.
        let mut by_employee: BTreeMap<String, Vec<TimeSlotCandidate>> = BTreeMap::new();
        for candidate in batch {
            by_employee.entry(candidate.employee_id.clone()).or_default().push(candidate);
        }

        let mut merged_batch = Vec::new();
        for (employee_id, candidates) in by_employee {
            let merged = self.upsert_for_employee(&employee_id, candidates).await?;
            merged_batch.extend(merged);
        }
        Ok(merged_batch)
    }

    async fn upsert_for_employee(
        &self,
        employee_id: &str,
        candidates: Vec<TimeSlotCandidate>,
    ) -> Result<Vec<TimeSlot>> {
        let employee = self.employees.find_by_id(employee_id).await?;

        let starts: Vec<DateTime<Utc>> = {
            let mut starts: Vec<DateTime<Utc>> =
                candidates.iter().map(|c| strip_subseconds(c.started_at)).collect();
            starts.sort_unstable();
            starts.dedup();
            starts
        };

        let existing = self.slots.find_by_start_times(employee_id, &starts).await?;
        let mut by_start: BTreeMap<DateTime<Utc>, TimeSlot> =
            existing.into_iter().map(|slot| (slot.started_at, slot)).collect();

        for candidate in candidates {
            let started_at = strip_subseconds(candidate.started_at);
            if let Some(slot) = by_start.get_mut(&started_at) {
                slot.duration_seconds += candidate.duration_seconds;
                slot.counters.merge(&candidate.counters);
                if let Some(log_id) = candidate.time_log_id {
                    slot.merge_time_log_ids(&[log_id]);
                }
            } else {
                let organization_id = candidate
                    .organization_id
                    .clone()
                    .unwrap_or_else(|| employee.organization_id.clone());
                let tenant_id =
                    candidate.tenant_id.clone().unwrap_or_else(|| employee.tenant_id.clone());
                let mut slot = candidate.into_time_slot(organization_id, tenant_id);
                slot.started_at = started_at;
                by_start.insert(started_at, slot);
            }
        }

        let merged: Vec<TimeSlot> = by_start.into_values().collect();
        self.slots.save_batch(&merged).await?;
        debug!(employee_id, slots = merged.len(), "slot batch merged");

        if let (Some(first), Some(last)) = (starts.first(), starts.last()) {
            self.range_merge(employee_id, *first, *last).await?;
        }

        Ok(merged)
    }

    /// Re-derive the canonical slot rows for the window `[min, max]`
    /// (rounded outward to the grid).
    ///
    /// Out-of-order delivery can leave several rows in one grid cell,
    /// or rows whose start never got aligned. Each cell collapses to a
    /// single row: counters summed, references unioned, duration capped
    /// to the 600 seconds a cell can account for.
    pub async fn range_merge(
        &self,
        employee_id: &str,
        min: DateTime<Utc>,
        max: DateTime<Utc>,
    ) -> Result<Vec<TimeSlot>> {
        let window_start = floor_to_slot(min);
        let window_end = floor_to_slot(max) + Duration::seconds(SLOT_INTERVAL_SECONDS);

        let rows = self.slots.find_in_range(employee_id, window_start, window_end).await?;

        let mut cells: BTreeMap<DateTime<Utc>, Vec<TimeSlot>> = BTreeMap::new();
        for row in rows {
            cells.entry(floor_to_slot(row.started_at)).or_default().push(row);
        }

        let mut canonical_rows = Vec::new();
        let mut changed = Vec::new();
        let mut subsumed_ids = Vec::new();

        for (cell_start, mut group) in cells {
            let already_canonical = group.len() == 1
                && group[0].started_at == cell_start
                && group[0].duration_seconds <= MAX_SLOT_DURATION_SECONDS;
            if already_canonical {
                canonical_rows.extend(group);
                continue;
            }

            // Prefer a row already sitting on the cell boundary so ids
            // stay stable across recomputes.
            let canonical_index =
                group.iter().position(|slot| slot.started_at == cell_start).unwrap_or(0);
            let mut canonical = group.swap_remove(canonical_index);
            canonical.started_at = cell_start;

            for other in group {
                canonical.duration_seconds += other.duration_seconds;
                canonical.counters.merge(&other.counters);
                let ids = other.time_log_ids.clone();
                canonical.merge_time_log_ids(&ids);
                subsumed_ids.push(other.id);
            }
            canonical.duration_seconds =
                canonical.duration_seconds.min(MAX_SLOT_DURATION_SECONDS);

            changed.push(canonical);
        }

        if !subsumed_ids.is_empty() {
            self.slots.delete_by_ids(&subsumed_ids).await?;
        }
        if !changed.is_empty() {
            self.slots.save_batch(&changed).await?;
            info!(
                employee_id,
                cells = changed.len(),
                subsumed = subsumed_ids.len(),
                "slot window recomputed"
            );
        }

        canonical_rows.extend(changed);
        canonical_rows.sort_by_key(|slot| slot.started_at);
        Ok(canonical_rows)
    }

    /// Append observed activity events. Never merged, only inserted.
    pub async fn bulk_save_activities(&self, activities: &[Activity]) -> Result<usize> {
        if activities.is_empty() {
            return Ok(0);
        }
        let inserted = self.activities.bulk_insert(activities).await?;
        debug!(count = inserted, "activities appended");
        Ok(inserted)
    }

    /// Drop slots owned by the given time logs, after those logs were
    /// deleted. Cleanup of dependent screenshot/activity artifacts is
    /// the caller's responsibility.
    pub async fn delete_slots_for_time_logs(&self, time_log_ids: &[String]) -> Result<usize> {
        if time_log_ids.is_empty() {
            return Ok(0);
        }
        let deleted = self.slots.delete_for_time_logs(time_log_ids).await?;
        info!(count = deleted, "slots deleted for removed time logs");
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::TimeZone;
    use timeforge_domain::{
        ActivityCounters, Employee, OrganizationPolicy, TimeForgeError,
    };

    use super::*;

    #[derive(Default)]
    struct InMemorySlots {
        slots: Mutex<Vec<TimeSlot>>,
        tokens: Mutex<Vec<String>>,
    }

    impl InMemorySlots {
        fn snapshot(&self) -> Vec<TimeSlot> {
            self.slots.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl TimeSlotRepository for InMemorySlots {
        async fn find_by_start_times(
            &self,
            employee_id: &str,
            starts: &[DateTime<Utc>],
        ) -> Result<Vec<TimeSlot>> {
            Ok(self
                .slots
                .lock()
                .unwrap()
                .iter()
                .filter(|s| s.employee_id == employee_id && starts.contains(&s.started_at))
                .cloned()
                .collect())
        }

        async fn find_in_range(
            &self,
            employee_id: &str,
            start: DateTime<Utc>,
            end: DateTime<Utc>,
        ) -> Result<Vec<TimeSlot>> {
            Ok(self
                .slots
                .lock()
                .unwrap()
                .iter()
                .filter(|s| {
                    s.employee_id == employee_id && s.started_at >= start && s.started_at < end
                })
                .cloned()
                .collect())
        }

        async fn save_batch(&self, batch: &[TimeSlot]) -> Result<()> {
            let mut slots = self.slots.lock().unwrap();
            for slot in batch {
                slots.retain(|s| {
                    s.id != slot.id
                        && !(s.employee_id == slot.employee_id && s.started_at == slot.started_at)
                });
                slots.push(slot.clone());
            }
            Ok(())
        }

        async fn delete_by_ids(&self, ids: &[String]) -> Result<usize> {
            let mut slots = self.slots.lock().unwrap();
            let before = slots.len();
            slots.retain(|s| !ids.contains(&s.id));
            Ok(before - slots.len())
        }

        async fn delete_for_time_logs(&self, time_log_ids: &[String]) -> Result<usize> {
            let mut slots = self.slots.lock().unwrap();
            let before = slots.len();
            slots.retain(|s| !s.time_log_ids.iter().any(|id| time_log_ids.contains(id)));
            Ok(before - slots.len())
        }

        async fn try_record_batch_token(&self, token: &str) -> Result<bool> {
            let mut tokens = self.tokens.lock().unwrap();
            if tokens.iter().any(|t| t == token) {
                return Ok(false);
            }
            tokens.push(token.to_string());
            Ok(true)
        }
    }

    #[derive(Default)]
    struct InMemoryActivities {
        activities: Mutex<Vec<Activity>>,
    }

    #[async_trait]
    impl ActivityRepository for InMemoryActivities {
        async fn bulk_insert(&self, activities: &[Activity]) -> Result<usize> {
            let mut stored = self.activities.lock().unwrap();
            stored.extend_from_slice(activities);
            Ok(activities.len())
        }
    }

    struct StaticEmployees;

    #[async_trait]
    impl EmployeeRepository for StaticEmployees {
        async fn find_by_id(&self, id: &str) -> Result<Employee> {
            if id == "missing" {
                return Err(TimeForgeError::NotFound(format!("employee {id}")));
            }
            Ok(Employee {
                id: id.to_string(),
                organization_id: "org-1".into(),
                tenant_id: "tenant-1".into(),
                full_name: "Test Employee".into(),
                bill_rate: None,
            })
        }

        async fn find_many(&self, ids: &[String]) -> Result<Vec<Employee>> {
            let mut employees = Vec::new();
            for id in ids {
                employees.push(self.find_by_id(id).await?);
            }
            Ok(employees)
        }

        async fn policy_for_organization(&self, _organization_id: &str) -> Result<OrganizationPolicy> {
            Ok(OrganizationPolicy::default())
        }
    }

    fn service() -> (SlotService, Arc<InMemorySlots>) {
        let slots = Arc::new(InMemorySlots::default());
        let activities = Arc::new(InMemoryActivities::default());
        (SlotService::new(slots.clone(), activities, Arc::new(StaticEmployees)), slots)
    }

    fn utc(h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, h, mi, s).single().unwrap()
    }

    fn candidate(start: DateTime<Utc>, overall: i64) -> TimeSlotCandidate {
        TimeSlotCandidate {
            employee_id: "emp-1".into(),
            organization_id: None,
            tenant_id: None,
            started_at: start,
            duration_seconds: 60,
            counters: ActivityCounters::new(0, 0, overall),
            time_log_id: None,
        }
    }

    #[tokio::test]
    async fn merge_is_additive_for_shared_keys() {
        let (service, repo) = service();
        let start = utc(9, 0, 0);

        service.upsert(vec![candidate(start, 5)], None).await.unwrap();
        service.upsert(vec![candidate(start, 3)], None).await.unwrap();

        let slots = repo.snapshot();
        assert_eq!(slots.len(), 1);
        assert_eq!(slots[0].counters.overall, 8);
        assert_eq!(slots[0].duration_seconds, 120);
    }

    #[tokio::test]
    async fn merge_result_is_order_independent() {
        let start = utc(9, 0, 0);
        let a = candidate(start, 5);
        let b = candidate(start, 3);
        let c = candidate(start, 7);

        let (first, first_repo) = service();
        first.upsert(vec![a.clone(), b.clone()], None).await.unwrap();
        first.upsert(vec![c.clone()], None).await.unwrap();

        let (second, second_repo) = service();
        second.upsert(vec![c, a], None).await.unwrap();
        second.upsert(vec![b], None).await.unwrap();

        let lhs = first_repo.snapshot();
        let rhs = second_repo.snapshot();
        assert_eq!(lhs.len(), 1);
        assert_eq!(rhs.len(), 1);
        assert_eq!(lhs[0].counters, rhs[0].counters);
        assert_eq!(lhs[0].duration_seconds, rhs[0].duration_seconds);
    }

    #[tokio::test]
    async fn org_and_tenant_are_stamped_from_the_employee() {
        let (service, repo) = service();

        service.upsert(vec![candidate(utc(9, 0, 0), 1)], None).await.unwrap();

        let slots = repo.snapshot();
        assert_eq!(slots[0].organization_id, "org-1");
        assert_eq!(slots[0].tenant_id, "tenant-1");
    }

    #[tokio::test]
    async fn time_log_references_are_unioned_without_duplicates() {
        let (service, repo) = service();
        let start = utc(9, 0, 0);

        let mut first = candidate(start, 1);
        first.time_log_id = Some("log-a".into());
        let mut second = candidate(start, 1);
        second.time_log_id = Some("log-a".into());
        let mut third = candidate(start, 1);
        third.time_log_id = Some("log-b".into());

        service.upsert(vec![first, second, third], None).await.unwrap();

        let slots = repo.snapshot();
        assert_eq!(slots.len(), 1);
        assert_eq!(slots[0].time_log_ids, vec!["log-a".to_string(), "log-b".to_string()]);
    }

    #[tokio::test]
    async fn duplicate_idempotency_token_is_a_no_op() {
        let (service, repo) = service();
        let start = utc(9, 0, 0);

        service.upsert(vec![candidate(start, 5)], Some("batch-1")).await.unwrap();
        let second = service.upsert(vec![candidate(start, 5)], Some("batch-1")).await.unwrap();

        assert!(second.is_empty());
        assert_eq!(repo.snapshot()[0].counters.overall, 5);
    }

    #[tokio::test]
    async fn sub_second_precision_is_stripped_on_upsert() {
        let (service, repo) = service();
        let start = utc(9, 10, 0) + Duration::milliseconds(250);

        service.upsert(vec![candidate(start, 1)], None).await.unwrap();

        assert_eq!(repo.snapshot()[0].started_at, utc(9, 10, 0));
    }

    #[tokio::test]
    async fn range_merge_collapses_misaligned_rows_into_cells() {
        let (service, repo) = service();

        // Two observations landing in the same 10-minute cell with
        // misaligned starts
        service.upsert(vec![candidate(utc(9, 2, 0), 5)], None).await.unwrap();
        service.upsert(vec![candidate(utc(9, 7, 0), 3)], None).await.unwrap();

        let slots = repo.snapshot();
        assert_eq!(slots.len(), 1);
        assert_eq!(slots[0].started_at, utc(9, 0, 0));
        assert_eq!(slots[0].counters.overall, 8);
    }

    #[tokio::test]
    async fn range_merge_caps_cell_duration() {
        let (service, repo) = service();
        let start = utc(9, 0, 0);

        let mut oversized = candidate(start, 1);
        oversized.duration_seconds = 500;
        let mut second = candidate(utc(9, 4, 0), 1);
        second.duration_seconds = 400;

        service.upsert(vec![oversized, second], None).await.unwrap();

        let slots = repo.snapshot();
        assert_eq!(slots.len(), 1);
        assert_eq!(slots[0].duration_seconds, MAX_SLOT_DURATION_SECONDS);
    }

    #[tokio::test]
    async fn missing_employee_fails_the_batch() {
        let (service, repo) = service();
        let mut bad = candidate(utc(9, 0, 0), 1);
        bad.employee_id = "missing".into();

        let err = service.upsert(vec![bad], None).await.unwrap_err();
        assert!(matches!(err, TimeForgeError::NotFound(_)));
        assert!(repo.snapshot().is_empty());
    }
}
