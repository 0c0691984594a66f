//! Slot derivation.
//!
//! A scan block is a contiguous run of `total_slots` equal-duration
//! appointment windows starting at the block's start time. Slots are a
//! derived value: they are recomputed from the block parameters on every
//! request and never stored, so there is no cache to invalidate.

use serde::Serialize;

use crate::error::{Error, Result};
use crate::time::{TimeOfDay, MINUTES_PER_DAY};

/// One bookable unit of time within a scan block, identified by a 1-based
/// slot number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Slot {
    pub number: u32,
    pub start: TimeOfDay,
    pub end: TimeOfDay,
}

/// Derive the full ordered slot sequence for a block.
///
/// Slot `i` spans `start + (i-1)*duration .. start + i*duration`, so the
/// windows are contiguous and non-overlapping by construction: each slot's
/// end equals the next slot's start. Clock values wrap past midnight (see
/// [`fits_within_day`] for the validation callers apply at block creation).
pub fn derive_slots(start: TimeOfDay, duration_minutes: u32, total_slots: u32) -> Result<Vec<Slot>> {
    if duration_minutes == 0 {
        return Err(Error::ZeroDuration);
    }
    if total_slots == 0 {
        return Err(Error::ZeroSlotCount);
    }

    let mut slots = Vec::with_capacity(total_slots as usize);
    let mut cursor = start;
    for number in 1..=total_slots {
        let end = cursor.wrapping_add(u64::from(duration_minutes));
        slots.push(Slot {
            number,
            start: cursor,
            end,
        });
        cursor = end;
    }
    Ok(slots)
}

/// The window of a single slot, without materialising the whole sequence.
pub fn slot_window(
    start: TimeOfDay,
    duration_minutes: u32,
    slot_number: u32,
    total_slots: u32,
) -> Result<(TimeOfDay, TimeOfDay)> {
    if duration_minutes == 0 {
        return Err(Error::ZeroDuration);
    }
    if slot_number == 0 || slot_number > total_slots {
        return Err(Error::SlotNumberOutOfRange {
            number: slot_number,
            total: total_slots,
        });
    }
    let offset = u64::from(slot_number - 1) * u64::from(duration_minutes);
    let slot_start = start.wrapping_add(offset);
    Ok((slot_start, slot_start.wrapping_add(u64::from(duration_minutes))))
}

/// Whether every derived slot ends strictly before midnight.
///
/// Blocks that would spill past midnight are rejected at creation time; the
/// deriver itself stays total and wraps, so any block that slipped into
/// storage still yields well-defined clock values.
pub fn fits_within_day(start: TimeOfDay, duration_minutes: u32, total_slots: u32) -> bool {
    u64::from(start.minutes()) + u64::from(duration_minutes) * u64::from(total_slots)
        < u64::from(MINUTES_PER_DAY)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(s: &str) -> TimeOfDay {
        s.parse().unwrap()
    }

    #[test]
    fn derives_the_documented_xray_schedule() {
        // 09:00 start, 15-minute slots, four of them.
        let slots = derive_slots(t("09:00"), 15, 4).unwrap();
        let rendered: Vec<(u32, String, String)> = slots
            .iter()
            .map(|s| (s.number, s.start.to_string(), s.end.to_string()))
            .collect();
        assert_eq!(
            rendered,
            vec![
                (1, "09:00".into(), "09:15".into()),
                (2, "09:15".into(), "09:30".into()),
                (3, "09:30".into(), "09:45".into()),
                (4, "09:45".into(), "10:00".into()),
            ]
        );
    }

    #[test]
    fn slot_count_and_first_start_match_inputs() {
        let slots = derive_slots(t("13:20"), 25, 7).unwrap();
        assert_eq!(slots.len(), 7);
        assert_eq!(slots[0].start, t("13:20"));
    }

    #[test]
    fn windows_are_contiguous() {
        let slots = derive_slots(t("08:00"), 45, 9).unwrap();
        for pair in slots.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
        }
    }

    #[test]
    fn slot_window_matches_full_derivation() {
        let slots = derive_slots(t("10:00"), 30, 6).unwrap();
        for slot in &slots {
            let (start, end) = slot_window(t("10:00"), 30, slot.number, 6).unwrap();
            assert_eq!((start, end), (slot.start, slot.end));
        }
    }

    #[test]
    fn slot_window_rejects_out_of_range_numbers() {
        assert!(matches!(
            slot_window(t("10:00"), 30, 0, 6),
            Err(Error::SlotNumberOutOfRange { .. })
        ));
        assert!(matches!(
            slot_window(t("10:00"), 30, 7, 6),
            Err(Error::SlotNumberOutOfRange { .. })
        ));
    }

    #[test]
    fn zero_inputs_are_rejected() {
        assert_eq!(derive_slots(t("10:00"), 0, 4), Err(Error::ZeroDuration));
        assert_eq!(derive_slots(t("10:00"), 15, 0), Err(Error::ZeroSlotCount));
    }

    #[test]
    fn late_blocks_spill_past_midnight() {
        assert!(fits_within_day(t("09:00"), 15, 4));
        // 23:00 + 3 * 60min runs to 02:00 the next day.
        assert!(!fits_within_day(t("23:00"), 60, 3));
        // Ending exactly at midnight is also out: 24:00 is not a clock value.
        assert!(!fits_within_day(t("23:00"), 60, 1));

        // The deriver still wraps rather than failing.
        let slots = derive_slots(t("23:00"), 60, 3).unwrap();
        assert_eq!(slots[2].start.to_string(), "01:00");
        assert_eq!(slots[2].end.to_string(), "02:00");
    }
}
