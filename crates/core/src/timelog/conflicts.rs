//! Conflict resolution - trims, splits, or removes overlapping logs
//!
//! The candidate interval is always the newly authoritative entry: the
//! conflicting log gives way. Resolution never rejects; it only adjusts
//! existing rows, so submitting an overlapping entry is a successful
//! operation with side effects.

use chrono::{DateTime, Utc};
use timeforge_domain::{TimeLog, TimeSpan};
use uuid::Uuid;

/// Adjustment to apply to one conflicting time log.
#[derive(Debug, Clone, PartialEq)]
pub enum ConflictAdjustment {
    /// The candidate covers the whole log; nothing remains.
    SoftDelete { log_id: String },
    /// A span remains before the candidate; the log's stop time shrinks.
    TrimStop { log_id: String, stopped_at: DateTime<Utc>, duration_seconds: i64 },
    /// A span remains after the candidate; the log's start time grows.
    TrimStart { log_id: String, started_at: DateTime<Utc>, duration_seconds: i64 },
    /// Spans remain on both sides; the log is split into two rows.
    Split {
        log_id: String,
        stopped_at: DateTime<Utc>,
        duration_seconds: i64,
        /// New row for the later remainder, carrying the same
        /// employee/project/task/billing attributes.
        remainder: TimeLog,
    },
}

impl ConflictAdjustment {
    /// Id of the existing log this adjustment mutates.
    pub fn log_id(&self) -> &str {
        match self {
            Self::SoftDelete { log_id }
            | Self::TrimStop { log_id, .. }
            | Self::TrimStart { log_id, .. }
            | Self::Split { log_id, .. } => log_id,
        }
    }
}

/// Compute the adjustment that removes the overlap between `candidate`
/// and `conflicting`. Returns `None` when the intervals do not actually
/// overlap (including still-running logs, which have no stop time yet).
pub fn resolve(candidate: TimeSpan, conflicting: &TimeLog) -> Option<ConflictAdjustment> {
    let span = conflicting.span()?;
    if !span.overlaps(&candidate) {
        return None;
    }

    let head_remains = span.start < candidate.start;
    let tail_remains = span.end > candidate.end;

    let adjustment = match (head_remains, tail_remains) {
        (false, false) => ConflictAdjustment::SoftDelete { log_id: conflicting.id.clone() },
        (true, false) => ConflictAdjustment::TrimStop {
            log_id: conflicting.id.clone(),
            stopped_at: candidate.start,
            duration_seconds: TimeSpan::new(span.start, candidate.start).duration_seconds(),
        },
        (false, true) => ConflictAdjustment::TrimStart {
            log_id: conflicting.id.clone(),
            started_at: candidate.end,
            duration_seconds: TimeSpan::new(candidate.end, span.end).duration_seconds(),
        },
        (true, true) => {
            let mut remainder = conflicting.clone();
            remainder.id = Uuid::new_v4().to_string();
            remainder.started_at = candidate.end;
            remainder.stopped_at = Some(span.end);
            remainder.duration_seconds = TimeSpan::new(candidate.end, span.end).duration_seconds();
            remainder.edited_at = None;

            ConflictAdjustment::Split {
                log_id: conflicting.id.clone(),
                stopped_at: candidate.start,
                duration_seconds: TimeSpan::new(span.start, candidate.start).duration_seconds(),
                remainder,
            }
        }
    };

    Some(adjustment)
}

/// Resolve every conflicting log against the candidate, in order.
pub fn resolve_all(candidate: TimeSpan, conflicts: &[TimeLog]) -> Vec<ConflictAdjustment> {
    conflicts.iter().filter_map(|log| resolve(candidate, log)).collect()
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use timeforge_domain::{TimeLogSource, TimeLogType};

    use super::*;

    fn utc(h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 4, h, mi, 0).single().unwrap()
    }

    fn log(id: &str, start: DateTime<Utc>, stop: DateTime<Utc>) -> TimeLog {
        TimeLog {
            id: id.to_string(),
            employee_id: "emp-1".into(),
            organization_id: "org-1".into(),
            tenant_id: "tenant-1".into(),
            started_at: start,
            stopped_at: Some(stop),
            duration_seconds: (stop - start).num_seconds(),
            log_type: TimeLogType::Manual,
            source: TimeLogSource::Browser,
            project_id: Some("project-1".into()),
            task_id: Some("task-1".into()),
            organization_contact_id: None,
            description: None,
            is_billable: true,
            is_running: false,
            deleted_at: None,
            edited_at: None,
        }
    }

    /// Apply adjustments to an in-memory timeline the way the storage
    /// layer would.
    fn apply(timeline: &mut Vec<TimeLog>, adjustments: &[ConflictAdjustment]) {
        for adjustment in adjustments {
            match adjustment {
                ConflictAdjustment::SoftDelete { log_id } => {
                    if let Some(log) = timeline.iter_mut().find(|l| &l.id == log_id) {
                        log.deleted_at = Some(Utc::now());
                    }
                }
                ConflictAdjustment::TrimStop { log_id, stopped_at, duration_seconds } => {
                    if let Some(log) = timeline.iter_mut().find(|l| &l.id == log_id) {
                        log.stopped_at = Some(*stopped_at);
                        log.duration_seconds = *duration_seconds;
                    }
                }
                ConflictAdjustment::TrimStart { log_id, started_at, duration_seconds } => {
                    if let Some(log) = timeline.iter_mut().find(|l| &l.id == log_id) {
                        log.started_at = *started_at;
                        log.duration_seconds = *duration_seconds;
                    }
                }
                ConflictAdjustment::Split { log_id, stopped_at, duration_seconds, remainder } => {
                    if let Some(log) = timeline.iter_mut().find(|l| &l.id == log_id) {
                        log.stopped_at = Some(*stopped_at);
                        log.duration_seconds = *duration_seconds;
                    }
                    timeline.push(remainder.clone());
                }
            }
        }
    }

    fn assert_no_overlap(timeline: &[TimeLog]) {
        let mut spans: Vec<TimeSpan> =
            timeline.iter().filter(|l| !l.is_deleted()).filter_map(TimeLog::span).collect();
        spans.sort_by_key(|s| s.start);
        for pair in spans.windows(2) {
            assert!(!pair[0].overlaps(&pair[1]), "{pair:?} overlap");
        }
    }

    #[test]
    fn fully_contained_log_is_soft_deleted() {
        // Manual entry 10:00-11:00 over existing 10:30-10:45
        let existing = log("b", utc(10, 30), utc(10, 45));
        let candidate = TimeSpan::new(utc(10, 0), utc(11, 0));

        let adjustment = resolve(candidate, &existing).unwrap();
        assert_eq!(adjustment, ConflictAdjustment::SoftDelete { log_id: "b".into() });
    }

    #[test]
    fn head_remainder_trims_stop_time() {
        let existing = log("b", utc(9, 45), utc(10, 30));
        let candidate = TimeSpan::new(utc(10, 0), utc(11, 0));

        match resolve(candidate, &existing).unwrap() {
            ConflictAdjustment::TrimStop { log_id, stopped_at, duration_seconds } => {
                assert_eq!(log_id, "b");
                assert_eq!(stopped_at, utc(10, 0));
                assert_eq!(duration_seconds, 900);
            }
            other => panic!("expected TrimStop, got {other:?}"),
        }
    }

    #[test]
    fn tail_remainder_trims_start_time() {
        let existing = log("b", utc(10, 30), utc(11, 30));
        let candidate = TimeSpan::new(utc(10, 0), utc(11, 0));

        match resolve(candidate, &existing).unwrap() {
            ConflictAdjustment::TrimStart { log_id, started_at, duration_seconds } => {
                assert_eq!(log_id, "b");
                assert_eq!(started_at, utc(11, 0));
                assert_eq!(duration_seconds, 1800);
            }
            other => panic!("expected TrimStart, got {other:?}"),
        }
    }

    #[test]
    fn strictly_containing_log_is_split() {
        // Manual entry 10:00-10:30 inside existing 09:45-11:00
        let existing = log("b", utc(9, 45), utc(11, 0));
        let candidate = TimeSpan::new(utc(10, 0), utc(10, 30));

        match resolve(candidate, &existing).unwrap() {
            ConflictAdjustment::Split { log_id, stopped_at, duration_seconds, remainder } => {
                assert_eq!(log_id, "b");
                assert_eq!(stopped_at, utc(10, 0));
                assert_eq!(duration_seconds, 900);
                assert_eq!(remainder.started_at, utc(10, 30));
                assert_eq!(remainder.stopped_at, Some(utc(11, 0)));
                assert_eq!(remainder.duration_seconds, 1800);
                assert_ne!(remainder.id, "b");
                assert_eq!(remainder.project_id.as_deref(), Some("project-1"));
                assert_eq!(remainder.employee_id, "emp-1");
                assert!(remainder.is_billable);
            }
            other => panic!("expected Split, got {other:?}"),
        }
    }

    #[test]
    fn non_overlapping_and_running_logs_yield_nothing() {
        let candidate = TimeSpan::new(utc(10, 0), utc(11, 0));

        let adjacent = log("b", utc(11, 0), utc(12, 0));
        assert!(resolve(candidate, &adjacent).is_none());

        let mut running = log("c", utc(10, 15), utc(10, 45));
        running.stopped_at = None;
        running.is_running = true;
        assert!(resolve(candidate, &running).is_none());
    }

    #[test]
    fn timeline_has_no_overlap_after_resolution() {
        let candidate = TimeSpan::new(utc(10, 0), utc(11, 0));
        let mut timeline = vec![
            log("a", utc(8, 0), utc(9, 0)),
            log("b", utc(9, 30), utc(10, 15)),
            log("c", utc(10, 20), utc(10, 40)),
            log("d", utc(10, 50), utc(11, 45)),
        ];

        let conflicts: Vec<TimeLog> = timeline
            .iter()
            .filter(|l| l.span().is_some_and(|s| s.overlaps(&candidate)))
            .cloned()
            .collect();
        let adjustments = resolve_all(candidate, &conflicts);
        apply(&mut timeline, &adjustments);

        // The candidate itself joins the timeline
        timeline.push(log("candidate", candidate.start, candidate.end));
        assert_no_overlap(&timeline);
    }
}
