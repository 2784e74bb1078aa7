//! Slot generator - partitions raw intervals into grid-aligned buckets
//!
//! Downstream storage buckets time at a fixed 10-minute grid regardless
//! of when tracking actually started or stopped, so two overlapping
//! observations landing in the same grid cell can be merged by key
//! equality instead of interval math.

use chrono::{DateTime, Duration, Utc};
use timeforge_domain::constants::SLOT_INTERVAL_MINUTES;
use timeforge_domain::utils::time::{floor_to_slot, strip_subseconds};

/// One grid-aligned sub-interval emitted by [`generate_slots`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeneratedSlot {
    pub slot_start: DateTime<Utc>,
    pub slot_end: DateTime<Utc>,
    pub duration_seconds: i64,
}

/// Partition `[start, end)` into 10-minute grid slots.
///
/// The walk snaps the cursor backward to the enclosing grid cell for the
/// emitted slot's start, but each slot's duration is clipped to the time
/// actually covered: `min(next_boundary, end) - cursor` with the
/// pre-snap cursor. Durations therefore always sum to `end - start`.
///
/// A zero-length or inverted input yields an empty sequence.
pub fn generate_slots(start: DateTime<Utc>, end: DateTime<Utc>) -> Vec<GeneratedSlot> {
    let start = strip_subseconds(start);
    let end = strip_subseconds(end);

    let mut slots = Vec::new();
    let mut cursor = start;

    while cursor < end {
        let slot_start = floor_to_slot(cursor);
        let boundary = slot_start + Duration::minutes(i64::from(SLOT_INTERVAL_MINUTES));

        let slot_end = boundary.min(end);
        let duration_seconds = (slot_end - cursor).num_seconds().max(0);

        slots.push(GeneratedSlot { slot_start, slot_end, duration_seconds });
        cursor = boundary;
    }

    slots
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Timelike};

    use super::*;

    fn utc(h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, h, mi, s).single().unwrap()
    }

    #[test]
    fn snap_then_clip_example() {
        // 09:03-09:11 covers two grid cells
        let slots = generate_slots(utc(9, 3, 0), utc(9, 11, 0));

        assert_eq!(slots.len(), 2);
        assert_eq!(slots[0].slot_start, utc(9, 0, 0));
        assert_eq!(slots[0].slot_end, utc(9, 10, 0));
        assert_eq!(slots[0].duration_seconds, 420);
        assert_eq!(slots[1].slot_start, utc(9, 10, 0));
        assert_eq!(slots[1].slot_end, utc(9, 11, 0));
        assert_eq!(slots[1].duration_seconds, 60);
    }

    #[test]
    fn aligned_start_walks_whole_cells() {
        let slots = generate_slots(utc(9, 0, 0), utc(9, 30, 0));

        assert_eq!(slots.len(), 3);
        for (i, slot) in slots.iter().enumerate() {
            assert_eq!(slot.slot_start, utc(9, (i as u32) * 10, 0));
            assert_eq!(slot.duration_seconds, 600);
        }
    }

    #[test]
    fn durations_sum_to_covered_time() {
        let cases = [
            (utc(9, 3, 0), utc(9, 11, 0)),
            (utc(9, 0, 0), utc(9, 10, 0)),
            (utc(9, 9, 59), utc(9, 10, 1)),
            (utc(8, 57, 30), utc(11, 4, 15)),
            (utc(23, 55, 0), utc(23, 59, 59)),
        ];

        for (start, end) in cases {
            let slots = generate_slots(start, end);
            let total: i64 = slots.iter().map(|s| s.duration_seconds).sum();
            assert_eq!(total, (end - start).num_seconds(), "coverage for {start}..{end}");
        }
    }

    #[test]
    fn slot_starts_are_grid_aligned() {
        let slots = generate_slots(utc(8, 57, 30), utc(11, 4, 15));
        assert!(!slots.is_empty());
        for slot in &slots {
            assert_eq!(slot.slot_start.minute() % 10, 0, "misaligned start {}", slot.slot_start);
        }
    }

    #[test]
    fn boundaries_are_contiguous() {
        let slots = generate_slots(utc(9, 3, 0), utc(10, 42, 0));
        for pair in slots.windows(2) {
            assert_eq!(pair[0].slot_end, pair[1].slot_start);
        }
    }

    #[test]
    fn inverted_or_empty_input_yields_nothing() {
        assert!(generate_slots(utc(9, 0, 0), utc(9, 0, 0)).is_empty());
        assert!(generate_slots(utc(9, 10, 0), utc(9, 0, 0)).is_empty());
    }
}
