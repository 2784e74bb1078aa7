//! Time slot entities - grid-aligned accounting buckets

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Activity proxy metrics carried by a slot. Merges are additive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityCounters {
    pub keyboard: i64,
    pub mouse: i64,
    pub overall: i64,
}

impl ActivityCounters {
    pub const fn new(keyboard: i64, mouse: i64, overall: i64) -> Self {
        Self { keyboard, mouse, overall }
    }

    /// Field-by-field additive merge. Never overwrites.
    pub fn merge(&mut self, other: &Self) {
        self.keyboard += other.keyboard;
        self.mouse += other.mouse;
        self.overall += other.overall;
    }
}

/// A 10-minute accounting bucket for one employee.
///
/// Unique per `(employee_id, started_at)`; `started_at` is grid-aligned
/// UTC with sub-second precision stripped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeSlot {
    pub id: String,
    pub employee_id: String,
    pub organization_id: String,
    pub tenant_id: String,
    pub started_at: DateTime<Utc>,
    pub duration_seconds: i64,
    pub counters: ActivityCounters,
    /// Associated time log ids, deduplicated.
    pub time_log_ids: Vec<String>,
}

impl TimeSlot {
    /// Union `ids` into the reference set, preserving insertion order.
    pub fn merge_time_log_ids(&mut self, ids: &[String]) {
        for id in ids {
            if !self.time_log_ids.contains(id) {
                self.time_log_ids.push(id.clone());
            }
        }
    }
}

/// One observation delivered by the capture layer, before merging.
///
/// Organization and tenant context may be absent; the aggregator stamps
/// them from the employee record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeSlotCandidate {
    pub employee_id: String,
    pub organization_id: Option<String>,
    pub tenant_id: Option<String>,
    pub started_at: DateTime<Utc>,
    pub duration_seconds: i64,
    pub counters: ActivityCounters,
    pub time_log_id: Option<String>,
}

impl TimeSlotCandidate {
    /// Promote this candidate to a fresh slot row.
    pub fn into_time_slot(self, organization_id: String, tenant_id: String) -> TimeSlot {
        TimeSlot {
            id: Uuid::new_v4().to_string(),
            employee_id: self.employee_id,
            organization_id,
            tenant_id,
            started_at: self.started_at,
            duration_seconds: self.duration_seconds,
            counters: self.counters,
            time_log_ids: self.time_log_id.into_iter().collect(),
        }
    }
}
